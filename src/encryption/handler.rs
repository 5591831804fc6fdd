//! Encryption handler for reading PDF documents.
//!
//! Authenticates a password against the `/Encrypt` dictionary and decrypts
//! strings and streams in place.

use super::aes::{aes_cbc_decrypt, aes_cbc_decrypt_raw};
use super::algorithms::{self, LegacyParams};
use super::rc4::rc4_crypt;
use super::{Algorithm, CipherMethod, EncryptDict, Permissions};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};

/// Decryption state for one document.
///
/// The file key is only available after a successful [`authenticate`](Self::authenticate).
#[derive(Debug, Clone)]
pub struct EncryptionHandler {
    /// Encryption dictionary
    dict: EncryptDict,
    /// First element of the trailer /ID array
    file_id: Vec<u8>,
    /// File encryption key
    key: Option<Vec<u8>>,
    /// True when the owner password was supplied
    owner: bool,
}

impl EncryptionHandler {
    /// Create a handler from the `/Encrypt` dictionary and the first `/ID` string.
    pub fn new(encrypt_obj: &Object, file_id: Vec<u8>) -> Result<Self> {
        let dict = EncryptDict::from_object(encrypt_obj)?;

        log::info!(
            "PDF is encrypted with {} (V={}, R={})",
            dict.algorithm(),
            dict.version,
            dict.revision
        );

        Ok(Self {
            dict,
            file_id,
            key: None,
            owner: false,
        })
    }

    /// Authenticate as user, then as owner.
    ///
    /// # Errors
    ///
    /// `WrongPassword` if neither succeeds.
    pub fn authenticate(&mut self, password: &str) -> Result<()> {
        let (key, owner) = if self.dict.revision >= 5 {
            self.authenticate_r5_r6(password)?
        } else {
            self.authenticate_legacy(password)
        }
        .ok_or(Error::WrongPassword)?;

        log::debug!("Authenticated as {}", if owner { "owner" } else { "user" });
        self.key = Some(key);
        self.owner = owner;
        Ok(())
    }

    fn authenticate_legacy(&self, password: &str) -> Option<(Vec<u8>, bool)> {
        let params = LegacyParams {
            owner_key: &self.dict.owner_password,
            user_key: &self.dict.user_password,
            permissions: self.dict.permissions,
            file_id: &self.file_id,
            revision: self.dict.revision,
            key_length: self.dict.key_length_bytes(),
            encrypt_metadata: self.dict.encrypt_metadata,
        };

        let mut candidates = vec![algorithms::encode_password_legacy(password)];
        let utf8 = password.as_bytes().to_vec();
        if candidates[0] != utf8 {
            candidates.push(utf8);
        }

        candidates.iter().find_map(|pw| {
            algorithms::authenticate_user_legacy(pw, &params)
                .map(|key| (key, false))
                .or_else(|| algorithms::authenticate_owner_legacy(pw, &params).map(|key| (key, true)))
        })
    }

    fn authenticate_r5_r6(&self, password: &str) -> Result<Option<(Vec<u8>, bool)>> {
        let pw = algorithms::encode_password_utf8(password);
        let revision = self.dict.revision;
        let empty = Vec::new();
        let ue = self.dict.user_encryption.as_ref().unwrap_or(&empty);
        let oe = self.dict.owner_encryption.as_ref().unwrap_or(&empty);

        let found = match algorithms::authenticate_user_r6(&pw, &self.dict.user_password, ue, revision)? {
            Some(key) => Some((key, false)),
            None => algorithms::authenticate_owner_r6(
                &pw,
                &self.dict.owner_password,
                oe,
                &self.dict.user_password,
                revision,
            )?
            .map(|key| (key, true)),
        };

        if let (Some((key, _)), Some(perms)) = (&found, &self.dict.perms) {
            if !algorithms::verify_perms(key, perms, self.dict.permissions) {
                log::warn!("/Perms does not match /P; the permissions may have been tampered with");
            }
        }
        Ok(found)
    }

    /// True once a password has been accepted.
    pub fn is_authenticated(&self) -> bool {
        self.key.is_some()
    }

    /// True if the accepted password was the owner password.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Algorithm the document is protected with.
    pub fn algorithm(&self) -> Algorithm {
        self.dict.algorithm()
    }

    /// The parsed encryption dictionary.
    pub fn encrypt_dict(&self) -> &EncryptDict {
        &self.dict
    }

    /// Permissions granted to the user.
    pub fn permissions(&self) -> Permissions {
        Permissions::from_p(self.dict.permissions)
    }

    /// Decrypt every string and stream in `obj`, which was stored as `id`.
    ///
    /// Cross-reference streams are never encrypted, and metadata streams are
    /// left alone when `/EncryptMetadata` is false.
    pub fn decrypt_object(&self, obj: &mut Object, id: ObjectRef) -> Result<()> {
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| Error::Encryption("document has not been authenticated".to_string()))?;

        match obj {
            Object::String(bytes) => {
                *bytes = self.decrypt_bytes(key, bytes, self.dict.string_method, id)?;
            },
            Object::Array(items) => {
                for item in items {
                    self.decrypt_object(item, id)?;
                }
            },
            Object::Dictionary(dict) => {
                for value in dict.values_mut() {
                    self.decrypt_object(value, id)?;
                }
            },
            Object::Stream { dict, data } => {
                for value in dict.values_mut() {
                    self.decrypt_object(value, id)?;
                }
                if self.stream_is_encrypted(dict) {
                    *data = self.decrypt_bytes(key, data, self.dict.stream_method, id)?.into();
                }
            },
            _ => {},
        }
        Ok(())
    }

    fn stream_is_encrypted(&self, dict: &crate::object::Dict) -> bool {
        match dict.get("Type").and_then(Object::as_name) {
            Some("XRef") => false,
            Some("Metadata") => self.dict.encrypt_metadata,
            _ => true,
        }
    }

    fn decrypt_bytes(&self, key: &[u8], data: &[u8], method: CipherMethod, id: ObjectRef) -> Result<Vec<u8>> {
        let object_key = algorithms::compute_object_key(key, id.id, id.gen, method.is_aes());

        match method {
            CipherMethod::Identity => Ok(data.to_vec()),
            CipherMethod::Rc4 => Ok(rc4_crypt(&object_key, data)),
            CipherMethod::AesV2 | CipherMethod::AesV3 => {
                if data.len() < 16 {
                    log::warn!("Encrypted data in {} is shorter than an AES IV, leaving as is", id);
                    return Ok(data.to_vec());
                }
                let (iv, body) = data.split_at(16);
                let body = &body[..body.len() - body.len() % 16];
                if body.is_empty() {
                    return Ok(Vec::new());
                }
                match aes_cbc_decrypt(&object_key, iv, body) {
                    Ok(plain) => Ok(plain),
                    Err(_) => {
                        log::warn!("Invalid AES padding in {}, keeping unpadded data", id);
                        aes_cbc_decrypt_raw(&object_key, iv, body)
                    },
                }
            },
        }
    }
}
