//! AES-CBC for PDF.
//!
//! Strings and streams use AES in CBC mode with PKCS#7 padding and the IV
//! stored as the first 16 bytes of the data. The R6 key-wrapping steps use
//! the same mode without padding.
//!
//! - AES-128: 16-byte key (V=4, `/CFM /AESV2`)
//! - AES-256: 32-byte key (V=5, `/CFM /AESV3`)
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm

use crate::error::{Error, Result};
use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes256};

const BLOCK: usize = 16;

/// Encrypt with PKCS#7 padding. The key length selects AES-128 or AES-256.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let pad = BLOCK - data.len() % BLOCK;
    let mut padded = Vec::with_capacity(data.len() + pad);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad, pad as u8);
    aes_cbc_encrypt_raw(key, iv, &padded)
}

/// Decrypt and strip PKCS#7 padding.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut plain = aes_cbc_decrypt_raw(key, iv, data)?;
    let pad = plain.last().copied().unwrap_or(0) as usize;
    let valid = (1..=BLOCK).contains(&pad)
        && pad <= plain.len()
        && plain[plain.len() - pad..].iter().all(|&b| b as usize == pad);
    if !valid {
        return Err(Error::Encryption("invalid PKCS#7 padding".to_string()));
    }

    plain.truncate(plain.len() - pad);
    Ok(plain)
}

/// Encrypt whole blocks without padding.
pub fn aes_cbc_encrypt_raw(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_blocks(data)?;
    let mut buf = data.to_vec();
    let len = buf.len();

    match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| invalid_iv())?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ())
            .map_err(|_| Error::Encryption("AES-128 encryption failed".to_string()))?,
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| invalid_iv())?
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map(|_| ())
            .map_err(|_| Error::Encryption("AES-256 encryption failed".to_string()))?,
        n => return Err(invalid_key(n)),
    }

    Ok(buf)
}

/// Decrypt whole blocks without removing padding.
pub fn aes_cbc_decrypt_raw(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_blocks(data)?;
    let mut buf = data.to_vec();

    match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| invalid_iv())?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ())
            .map_err(|_| Error::Encryption("AES-128 decryption failed".to_string()))?,
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| invalid_iv())?
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map(|_| ())
            .map_err(|_| Error::Encryption("AES-256 decryption failed".to_string()))?,
        n => return Err(invalid_key(n)),
    }

    Ok(buf)
}

fn check_blocks(data: &[u8]) -> Result<()> {
    if data.len() % BLOCK != 0 {
        return Err(Error::Encryption(format!(
            "AES data length {} is not a multiple of {}",
            data.len(),
            BLOCK
        )));
    }
    Ok(())
}

fn invalid_key(len: usize) -> Error {
    Error::Encryption(format!("AES key must be 16 or 32 bytes, got {}", len))
}

fn invalid_iv() -> Error {
    Error::Encryption("AES IV must be 16 bytes".to_string())
}
