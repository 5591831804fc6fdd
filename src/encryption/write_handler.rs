//! Encryption handler for writing encrypted PDFs.
//!
//! [`EncryptionWriteHandler::new`] derives the file key from the protection
//! options, returns the matching `/Encrypt` dictionary, and then encrypts
//! every string and stream handed to it while the document is serialized.

use super::aes::aes_cbc_encrypt;
use super::algorithms;
use super::rc4::rc4_crypt;
use super::{Algorithm, CipherMethod};
use crate::config::ProtectOptions;
use crate::error::{Error, Result};
use crate::object::{Dict, Object};

/// Handler for encrypting PDF objects during write operations.
#[derive(Debug, Clone)]
pub struct EncryptionWriteHandler {
    /// File encryption key
    encryption_key: Vec<u8>,
    /// The encryption algorithm in use
    algorithm: Algorithm,
    /// Whether to encrypt metadata streams
    encrypt_metadata: bool,
}

impl EncryptionWriteHandler {
    /// Derive keys for `options` and build the `/Encrypt` dictionary.
    ///
    /// `file_id` must be the first element of the `/ID` array the document
    /// is written with.
    ///
    /// # Errors
    ///
    /// - `UnsupportedRevision` when the requested revision does not match the
    ///   algorithm (R5 is never written)
    /// - `InvalidPermissions` when a reserved-as-zero permission bit is set
    pub fn new(options: &ProtectOptions, file_id: &[u8]) -> Result<(Dict, Self)> {
        let algorithm = options.algorithm;
        let (version, revision) = algorithm.version_revision();
        if let Some(requested) = options.revision {
            if requested != revision {
                return Err(Error::UnsupportedRevision(requested));
            }
        }
        let p = options.permissions.to_p(revision)?;

        log::info!("Setting up {} encryption (V={}, R={})", algorithm, version, revision);

        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), Object::name("Standard"));
        dict.insert("V".to_string(), Object::Integer(version as i64));
        dict.insert("R".to_string(), Object::Integer(revision as i64));
        dict.insert("P".to_string(), Object::Integer(p as i64));

        let encryption_key = if revision >= 5 {
            let user = algorithms::encode_password_utf8(&options.user_password);
            let owner = algorithms::encode_password_utf8(&options.owner_password);
            let key = algorithms::random_bytes(32);
            let values = algorithms::compute_r6_values(&user, &owner, &key, p, options.encrypt_metadata)?;

            dict.insert("Length".to_string(), Object::Integer(256));
            dict.insert("O".to_string(), Object::String(values.owner_key));
            dict.insert("U".to_string(), Object::String(values.user_key));
            dict.insert("OE".to_string(), Object::String(values.owner_encryption));
            dict.insert("UE".to_string(), Object::String(values.user_encryption));
            dict.insert("Perms".to_string(), Object::String(values.perms));
            key
        } else {
            let user = algorithms::encode_password_legacy(&options.user_password);
            let owner = algorithms::encode_password_legacy(&options.owner_password);
            let key_length = algorithm.key_length();

            let o = algorithms::compute_owner_hash(&owner, &user, revision, key_length);
            let key = algorithms::compute_encryption_key(
                &user,
                &o,
                p,
                file_id,
                revision,
                key_length,
                options.encrypt_metadata,
            );
            let u = algorithms::compute_user_hash(&key, file_id, revision);

            dict.insert("Length".to_string(), Object::Integer((key_length * 8) as i64));
            dict.insert("O".to_string(), Object::String(o));
            dict.insert("U".to_string(), Object::String(u));
            key
        };

        if version >= 4 {
            let cfm = if algorithm == Algorithm::Aes256 { "AESV3" } else { "AESV2" };
            let mut std_cf = Dict::new();
            std_cf.insert("Type".to_string(), Object::name("CryptFilter"));
            std_cf.insert("CFM".to_string(), Object::name(cfm));
            std_cf.insert("AuthEvent".to_string(), Object::name("DocOpen"));
            std_cf.insert("Length".to_string(), Object::Integer(algorithm.key_length() as i64));

            let mut cf = Dict::new();
            cf.insert("StdCF".to_string(), Object::Dictionary(std_cf));
            dict.insert("CF".to_string(), Object::Dictionary(cf));
            dict.insert("StmF".to_string(), Object::name("StdCF"));
            dict.insert("StrF".to_string(), Object::name("StdCF"));
            if !options.encrypt_metadata {
                dict.insert("EncryptMetadata".to_string(), Object::Boolean(false));
            }
        }

        Ok((
            dict,
            Self {
                encryption_key,
                algorithm,
                encrypt_metadata: options.encrypt_metadata,
            },
        ))
    }

    /// Encrypt every string and stream in `obj`, to be stored as `obj_num gen_num`.
    ///
    /// Cross-reference streams, and metadata streams when metadata stays in
    /// the clear, are left untouched.
    pub fn encrypt_object(&self, obj: &mut Object, obj_num: u32, gen_num: u16) -> Result<()> {
        match obj {
            Object::String(bytes) => {
                *bytes = self.encrypt_bytes(bytes, obj_num, gen_num)?;
            },
            Object::Array(items) => {
                for item in items {
                    self.encrypt_object(item, obj_num, gen_num)?;
                }
            },
            Object::Dictionary(dict) => {
                for value in dict.values_mut() {
                    self.encrypt_object(value, obj_num, gen_num)?;
                }
            },
            Object::Stream { dict, data } => {
                let skip = match dict.get("Type").and_then(Object::as_name) {
                    Some("XRef") => true,
                    Some("Metadata") => !self.encrypt_metadata,
                    _ => false,
                };
                for value in dict.values_mut() {
                    self.encrypt_object(value, obj_num, gen_num)?;
                }
                if !skip {
                    *data = self.encrypt_bytes(data, obj_num, gen_num)?.into();
                }
            },
            _ => {},
        }
        Ok(())
    }

    /// Encrypt one string or stream body. AES output carries its IV up front.
    fn encrypt_bytes(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        let method = self.algorithm.cipher_method();
        let key = algorithms::compute_object_key(&self.encryption_key, obj_num, gen_num, method.is_aes());

        match method {
            CipherMethod::Identity => Ok(data.to_vec()),
            CipherMethod::Rc4 => Ok(rc4_crypt(&key, data)),
            CipherMethod::AesV2 | CipherMethod::AesV3 => {
                let iv = algorithms::random_bytes(16);
                let mut out = iv.clone();
                out.extend(aes_cbc_encrypt(&key, &iv, data)?);
                Ok(out)
            },
        }
    }

    /// Get the encryption algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Check if metadata should be encrypted.
    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Get the encryption key (for testing purposes).
    #[cfg(test)]
    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::Permissions;

    const FILE_ID: &[u8] = b"fedcba9876543210";

    #[test]
    fn test_dictionary_entries_per_algorithm() {
        let cases = [
            (Algorithm::Rc4_40, 1, 2, 40),
            (Algorithm::Rc4_128, 2, 3, 128),
            (Algorithm::Aes128, 4, 4, 128),
            (Algorithm::Aes256, 5, 6, 256),
        ];
        for (algorithm, v, r, length) in cases {
            let options = ProtectOptions::new("pw").with_algorithm(algorithm);
            let (dict, handler) = EncryptionWriteHandler::new(&options, FILE_ID).unwrap();

            assert_eq!(dict["V"], Object::Integer(v));
            assert_eq!(dict["R"], Object::Integer(r));
            assert_eq!(dict["Length"], Object::Integer(length));
            assert_eq!(handler.encryption_key().len(), algorithm.key_length());
            assert_eq!(dict.contains_key("CF"), v >= 4);
            assert_eq!(dict.contains_key("OE"), v == 5);
        }
    }

    #[test]
    fn test_aes128_crypt_filter() {
        let (dict, _) = EncryptionWriteHandler::new(&ProtectOptions::new("pw"), FILE_ID).unwrap();
        let cf = dict["CF"].as_dict().unwrap()["StdCF"].as_dict().unwrap();
        assert_eq!(cf["CFM"], Object::name("AESV2"));
        assert_eq!(dict["StmF"], Object::name("StdCF"));
    }

    #[test]
    fn test_revision_mismatch_rejected() {
        let options = ProtectOptions::new("pw").with_algorithm(Algorithm::Aes256).with_revision(5);
        assert!(matches!(EncryptionWriteHandler::new(&options, FILE_ID), Err(Error::UnsupportedRevision(5))));

        let options = ProtectOptions::new("pw").with_algorithm(Algorithm::Rc4_40).with_revision(4);
        assert!(matches!(EncryptionWriteHandler::new(&options, FILE_ID), Err(Error::UnsupportedRevision(4))));

        let options = ProtectOptions::new("pw").with_algorithm(Algorithm::Aes128).with_revision(4);
        assert!(EncryptionWriteHandler::new(&options, FILE_ID).is_ok());
    }

    #[test]
    fn test_reserved_permission_bits_rejected() {
        let options = ProtectOptions::new("pw").with_permissions(Permissions::from_bits_retain(0b111));
        assert!(matches!(EncryptionWriteHandler::new(&options, FILE_ID), Err(Error::InvalidPermissions(_))));
    }

    #[test]
    fn test_aes_output_has_fresh_iv() {
        let (_, handler) = EncryptionWriteHandler::new(&ProtectOptions::new("pw"), FILE_ID).unwrap();
        let a = handler.encrypt_bytes(b"same plaintext", 4, 0).unwrap();
        let b = handler.encrypt_bytes(b"same plaintext", 4, 0).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unencrypted_metadata_stream() {
        let options = ProtectOptions::new("pw").with_encrypt_metadata(false);
        let (dict, handler) = EncryptionWriteHandler::new(&options, FILE_ID).unwrap();
        assert_eq!(dict["EncryptMetadata"], Object::Boolean(false));

        let mut meta = Dict::new();
        meta.insert("Type".to_string(), Object::name("Metadata"));
        let mut obj = Object::stream(meta, b"<x:xmpmeta/>".to_vec());
        let before = obj.clone();
        handler.encrypt_object(&mut obj, 9, 0).unwrap();
        assert_eq!(obj, before);
    }
}
