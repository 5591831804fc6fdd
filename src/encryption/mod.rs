//! PDF encryption support.
//!
//! This module implements the standard security handler (ISO 32000-1:2008,
//! Section 7.6; ISO 32000-2:2020, Section 7.6.4). It supports:
//!
//! - RC4 encryption (40-bit and 128-bit), V=1/R=2 and V=2/R=3
//! - AES-128 through the `/AESV2` crypt filter, V=4/R=4
//! - AES-256 through the `/AESV3` crypt filter, V=5/R=6 (R=5 for reading only)
//! - User and owner password authentication
//!
//! Reading goes through [`EncryptionHandler`], which authenticates a password
//! and decrypts objects in place. Writing goes through
//! [`EncryptionWriteHandler`], which derives fresh keys, produces the
//! `/Encrypt` dictionary, and encrypts objects before serialization.
//!
//! # Security Considerations
//!
//! - RC4-40 is cryptographically weak and should only be used for legacy documents
//! - Password validation uses constant-time comparison
//! - Key derivation is fixed-cost (MD5 for R2-R4, SHA-2 for R5/R6)
//!
//! # References
//!
//! - PDF Spec Section 7.6.2: General Encryption Algorithm
//! - PDF Spec Section 7.6.3: Standard Security Handler
//! - PDF Spec Section 7.6.5: Crypt Filters

use crate::error::{Error, Result};
use crate::object::{Dict, Object};

mod aes;
pub(crate) mod algorithms;
mod handler;
mod rc4;
mod write_handler;

pub use handler::EncryptionHandler;
pub use write_handler::EncryptionWriteHandler;

/// Encryption algorithm a document is protected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[allow(non_camel_case_types)]
pub enum Algorithm {
    /// RC4 with 40-bit key (V=1, R=2)
    Rc4_40,
    /// RC4 with 128-bit key (V=2, R=3)
    Rc4_128,
    /// AES-128 in CBC mode (V=4, R=4, `/AESV2`)
    Aes128,
    /// AES-256 in CBC mode (V=5, R=6, `/AESV3`)
    Aes256,
}

impl Algorithm {
    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        match self {
            Algorithm::Rc4_40 => 5,
            Algorithm::Rc4_128 | Algorithm::Aes128 => 16,
            Algorithm::Aes256 => 32,
        }
    }

    /// Check if this is an AES algorithm.
    pub fn is_aes(&self) -> bool {
        matches!(self, Algorithm::Aes128 | Algorithm::Aes256)
    }

    /// `/V` and `/R` written for this algorithm.
    pub fn version_revision(&self) -> (u32, u32) {
        match self {
            Algorithm::Rc4_40 => (1, 2),
            Algorithm::Rc4_128 => (2, 3),
            Algorithm::Aes128 => (4, 4),
            Algorithm::Aes256 => (5, 6),
        }
    }

    /// Short identifier, also accepted by [`str::parse`].
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Rc4_40 => "rc4-40",
            Algorithm::Rc4_128 => "rc4-128",
            Algorithm::Aes128 => "aes-128",
            Algorithm::Aes256 => "aes-256",
        }
    }

    /// Cipher applied to strings and streams.
    pub(crate) fn cipher_method(&self) -> CipherMethod {
        match self {
            Algorithm::Rc4_40 | Algorithm::Rc4_128 => CipherMethod::Rc4,
            Algorithm::Aes128 => CipherMethod::AesV2,
            Algorithm::Aes256 => CipherMethod::AesV3,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rc4-40" | "rc4_40" => Ok(Algorithm::Rc4_40),
            "rc4-128" | "rc4_128" | "rc4" => Ok(Algorithm::Rc4_128),
            "aes-128" | "aes128" | "aes" => Ok(Algorithm::Aes128),
            "aes-256" | "aes256" => Ok(Algorithm::Aes256),
            other => Err(format!("unknown encryption algorithm '{}'", other)),
        }
    }
}

/// Cipher used by a crypt filter.
///
/// PDF Spec: Table 25 - /CFM values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMethod {
    /// Data is stored in the clear (`/Identity` or `/CFM /None`)
    Identity,
    /// RC4 (`/CFM /V2`)
    Rc4,
    /// AES-128-CBC (`/CFM /AESV2`)
    AesV2,
    /// AES-256-CBC (`/CFM /AESV3`)
    AesV3,
}

impl CipherMethod {
    /// True for the AES methods.
    pub fn is_aes(&self) -> bool {
        matches!(self, CipherMethod::AesV2 | CipherMethod::AesV3)
    }
}

bitflags::bitflags! {
    /// User access permissions (`/P`).
    ///
    /// Bits 1-2 (values 1 and 2) are reserved as zero; setting them through
    /// [`Permissions::from_bits_retain`] makes protection fail with
    /// `InvalidPermissions`.
    ///
    /// PDF Spec: Table 22 - User access permissions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Print the document
        const PRINT = 1 << 2;
        /// Modify contents
        const MODIFY = 1 << 3;
        /// Copy or extract text and graphics
        const COPY = 1 << 4;
        /// Add or modify annotations, fill forms
        const ANNOTATE = 1 << 5;
        /// Fill existing form fields (R>=3)
        const FILL_FORMS = 1 << 8;
        /// Extract for accessibility (R>=3)
        const ACCESSIBILITY = 1 << 9;
        /// Assemble: insert, rotate, delete pages (R>=3)
        const ASSEMBLE = 1 << 10;
        /// Faithful high-resolution printing (R>=3)
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

/// Bits the caller may never set.
const RESERVED_ZERO: u32 = 0b11;

impl Permissions {
    /// Permissions decoded from a `/P` value.
    pub fn from_p(p: i32) -> Self {
        Self::from_bits_truncate(p as u32)
    }

    /// Encode as a `/P` value for `revision`, setting the reserved-as-one bits.
    ///
    /// # Errors
    ///
    /// `InvalidPermissions` if a reserved-as-zero bit is set.
    pub fn to_p(&self, revision: u32) -> Result<i32> {
        let bits = self.bits();
        if bits & RESERVED_ZERO != 0 {
            return Err(Error::InvalidPermissions(format!(
                "permission bits 1-2 must be zero, got mask {:#x}",
                bits
            )));
        }
        let reserved_one = if revision >= 3 { 0xFFFF_F0C0 } else { 0xFFFF_FFC0 };
        Ok((bits | reserved_one) as i32)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::PRINT | Permissions::PRINT_HIGH_QUALITY
    }
}

/// PDF encryption dictionary (/Encrypt entry in trailer).
///
/// PDF Spec: Section 7.6.1 - General
#[derive(Debug, Clone)]
pub struct EncryptDict {
    /// Algorithm version (V)
    pub version: u32,
    /// Key length in bits (Length)
    pub length: Option<u32>,
    /// Revision number (R)
    pub revision: u32,
    /// Owner password hash (O): 32 or 48 bytes
    pub owner_password: Vec<u8>,
    /// User password hash (U): 32 or 48 bytes
    pub user_password: Vec<u8>,
    /// User permissions (P)
    pub permissions: i32,
    /// EncryptMetadata, true by default
    pub encrypt_metadata: bool,
    /// OE (R5/R6)
    pub owner_encryption: Option<Vec<u8>>,
    /// UE (R5/R6)
    pub user_encryption: Option<Vec<u8>>,
    /// Perms (R5/R6)
    pub perms: Option<Vec<u8>>,
    /// Cipher for streams (StmF)
    pub stream_method: CipherMethod,
    /// Cipher for strings (StrF)
    pub string_method: CipherMethod,
}

impl EncryptDict {
    /// Parse an encryption dictionary from a PDF object.
    ///
    /// # Errors
    ///
    /// `UnsupportedRevision` for a non-standard security handler or a V/R
    /// pair outside R2-R6; `InvalidPdf` if required entries are missing.
    pub fn from_object(obj: &Object) -> Result<Self> {
        let dict = obj
            .as_dict()
            .ok_or_else(|| Error::InvalidPdf("Encrypt entry is not a dictionary".to_string()))?;

        let int = |key: &str| dict.get(key).and_then(Object::as_integer);
        let bytes = |key: &str| dict.get(key).and_then(Object::as_string).map(<[u8]>::to_vec);

        let version = int("V").unwrap_or(0).max(0) as u32;
        let revision = int("R")
            .ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /R".to_string()))?
            .max(0) as u32;

        let filter = dict.get("Filter").and_then(Object::as_name).unwrap_or("");
        if filter != "Standard" {
            log::warn!("Unsupported security handler /{}", filter);
            return Err(Error::UnsupportedRevision(revision));
        }

        let supported = matches!((version, revision), (1 | 2, 2 | 3) | (4, 4) | (5, 5 | 6));
        if !supported {
            return Err(Error::UnsupportedRevision(revision));
        }

        let owner_password =
            bytes("O").ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /O".to_string()))?;
        let user_password =
            bytes("U").ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /U".to_string()))?;
        let permissions = int("P").ok_or_else(|| Error::InvalidPdf("Encrypt dictionary missing /P".to_string()))?
            as i32;

        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(Object::as_bool)
            .unwrap_or(true);

        let (stream_method, string_method) = match version {
            1 | 2 => (CipherMethod::Rc4, CipherMethod::Rc4),
            5 => (
                crypt_filter_method(dict, "StmF", CipherMethod::AesV3),
                crypt_filter_method(dict, "StrF", CipherMethod::AesV3),
            ),
            _ => (
                crypt_filter_method(dict, "StmF", CipherMethod::AesV2),
                crypt_filter_method(dict, "StrF", CipherMethod::AesV2),
            ),
        };

        Ok(EncryptDict {
            version,
            length: int("Length").map(|l| l.max(0) as u32),
            revision,
            owner_password,
            user_password,
            permissions,
            encrypt_metadata,
            owner_encryption: bytes("OE"),
            user_encryption: bytes("UE"),
            perms: bytes("Perms"),
            stream_method,
            string_method,
        })
    }

    /// Algorithm the document is protected with.
    pub fn algorithm(&self) -> Algorithm {
        match self.version {
            5 => Algorithm::Aes256,
            4 if self.stream_method == CipherMethod::Rc4 => Algorithm::Rc4_128,
            4 => Algorithm::Aes128,
            _ if self.key_length_bytes() <= 5 => Algorithm::Rc4_40,
            _ => Algorithm::Rc4_128,
        }
    }

    /// Effective file key length in bytes.
    pub fn key_length_bytes(&self) -> usize {
        match self.version {
            1 => 5,
            5 => 32,
            _ => self
                .length
                .map(|bits| (bits as usize / 8).clamp(5, 16))
                .unwrap_or(16),
        }
    }
}

/// Resolve `/StmF` or `/StrF` through the `/CF` dictionary.
fn crypt_filter_method(dict: &Dict, key: &str, default: CipherMethod) -> CipherMethod {
    let name = dict.get(key).and_then(Object::as_name).unwrap_or("Identity");
    if name == "Identity" {
        return CipherMethod::Identity;
    }

    let cfm = dict
        .get("CF")
        .and_then(Object::as_dict)
        .and_then(|cf| cf.get(name))
        .and_then(Object::as_dict)
        .and_then(|filter| filter.get("CFM"))
        .and_then(Object::as_name);

    match cfm {
        Some("V2") => CipherMethod::Rc4,
        Some("AESV2") => CipherMethod::AesV2,
        Some("AESV3") => CipherMethod::AesV3,
        Some("None") => CipherMethod::Identity,
        Some(other) => {
            log::warn!("Unknown crypt filter method /{}, assuming {:?}", other, default);
            default
        },
        None => default,
    }
}
