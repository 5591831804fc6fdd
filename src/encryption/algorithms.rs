//! Standard security handler algorithms.
//!
//! Key derivation and password validation for every revision the engine
//! reads (R2-R6) and writes (R2, R3, R4, R6).
//!
//! PDF Spec: Section 7.6.3 - Standard Security Handler
//! PDF 2.0 Spec (ISO 32000-2:2020): Section 7.6.4.3 - Algorithms 2.A, 2.B, 8-13

use super::aes::{aes_cbc_decrypt_raw, aes_cbc_encrypt_raw};
use super::rc4::rc4_crypt;
use crate::error::Result;
use md5::Md5;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Padding string used in PDF encryption (32 bytes).
///
/// PDF Spec: Algorithm 2, step a
pub const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Encode a password for R2-R4: Latin-1 when every char fits, else UTF-8.
pub fn encode_password_legacy(password: &str) -> Vec<u8> {
    if password.chars().all(|c| (c as u32) <= 0xFF) {
        password.chars().map(|c| c as u8).collect()
    } else {
        password.as_bytes().to_vec()
    }
}

/// Encode a password for R5/R6: UTF-8, at most 127 bytes, cut on a char boundary.
pub fn encode_password_utf8(password: &str) -> Vec<u8> {
    let mut end = password.len().min(127);
    while !password.is_char_boundary(end) {
        end -= 1;
    }
    password.as_bytes()[..end].to_vec()
}

/// Pad or truncate a password to 32 bytes using the standard padding.
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PADDING;
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Compute the file encryption key from a password (Algorithm 2, R2-R4).
pub fn compute_encryption_key(
    password: &[u8],
    owner_key: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let key_length = key_length.clamp(5, 16);

    let mut hasher = Md5::new();
    hasher.update(pad_password(password));
    hasher.update(owner_key);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF; 4]);
    }
    let mut hash = hasher.finalize().to_vec();

    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash[..key_length]).to_vec();
        }
    }

    hash.truncate(if revision == 2 { 5 } else { key_length });
    hash
}

/// RC4 key derived from the owner password (Algorithm 3, steps a-d).
fn owner_rc4_key(owner_password: &[u8], revision: u32, key_length: usize) -> Vec<u8> {
    let key_length = if revision == 2 { 5 } else { key_length.clamp(5, 16) };
    let mut hash = Md5::digest(pad_password(owner_password)).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            hash = Md5::digest(&hash).to_vec();
        }
    }
    hash.truncate(key_length);
    hash
}

/// XOR every byte of `key` with `round`.
fn xor_key(key: &[u8], round: u8) -> Vec<u8> {
    key.iter().map(|b| b ^ round).collect()
}

/// Compute the /O value (Algorithm 3, R2-R4).
///
/// An empty owner password falls back to the user password.
pub fn compute_owner_hash(owner_password: &[u8], user_password: &[u8], revision: u32, key_length: usize) -> Vec<u8> {
    let password = if owner_password.is_empty() {
        user_password
    } else {
        owner_password
    };
    let rc4_key = owner_rc4_key(password, revision, key_length);

    let mut result = rc4_crypt(&rc4_key, &pad_password(user_password));
    if revision >= 3 {
        for i in 1..=19u8 {
            result = rc4_crypt(&xor_key(&rc4_key, i), &result);
        }
    }
    result
}

/// Compute the /U value (Algorithm 4 for R2, Algorithm 5 for R3-R4).
pub fn compute_user_hash(encryption_key: &[u8], file_id: &[u8], revision: u32) -> Vec<u8> {
    if revision == 2 {
        return rc4_crypt(encryption_key, &PADDING);
    }

    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut hash = hasher.finalize().to_vec();

    for i in 0..20u8 {
        hash = rc4_crypt(&xor_key(encryption_key, i), &hash);
    }
    // Arbitrary padding to 32 bytes
    hash.resize(32, 0);
    hash
}

/// Inputs shared by the R2-R4 authentication algorithms.
#[derive(Debug, Clone, Copy)]
pub struct LegacyParams<'a> {
    /// /O entry
    pub owner_key: &'a [u8],
    /// /U entry
    pub user_key: &'a [u8],
    /// /P entry
    pub permissions: i32,
    /// First element of /ID
    pub file_id: &'a [u8],
    /// /R entry
    pub revision: u32,
    /// Key length in bytes
    pub key_length: usize,
    /// /EncryptMetadata entry
    pub encrypt_metadata: bool,
}

/// Authenticate the user password (Algorithm 6), returning the file key.
pub fn authenticate_user_legacy(password: &[u8], params: &LegacyParams<'_>) -> Option<Vec<u8>> {
    let key = compute_encryption_key(
        password,
        params.owner_key,
        params.permissions,
        params.file_id,
        params.revision,
        params.key_length,
        params.encrypt_metadata,
    );
    let expected = compute_user_hash(&key, params.file_id, params.revision);

    // R3+ compares only the first 16 bytes
    let n = if params.revision == 2 { 32 } else { 16 };
    if params.user_key.len() >= n && constant_time_compare(&params.user_key[..n], &expected[..n]) {
        Some(key)
    } else {
        None
    }
}

/// Authenticate the owner password (Algorithm 7), returning the file key.
///
/// Recovers the padded user password from /O and authenticates with it.
pub fn authenticate_owner_legacy(owner_password: &[u8], params: &LegacyParams<'_>) -> Option<Vec<u8>> {
    let rc4_key = owner_rc4_key(owner_password, params.revision, params.key_length);
    let owner_key = params.owner_key.get(..32)?;

    let user_password = if params.revision == 2 {
        rc4_crypt(&rc4_key, owner_key)
    } else {
        (0..=19u8)
            .rev()
            .fold(owner_key.to_vec(), |data, i| rc4_crypt(&xor_key(&rc4_key, i), &data))
    };

    authenticate_user_legacy(&user_password, params)
}

/// Hash a password for R5 (SHA-256) or R6 (Algorithm 2.B).
pub fn hash_r5_r6(password: &[u8], salt: &[u8], user_data: &[u8], revision: u32) -> Result<[u8; 32]> {
    let mut k: Vec<u8> = Sha256::new()
        .chain_update(password)
        .chain_update(salt)
        .chain_update(user_data)
        .finalize()
        .to_vec();

    if revision >= 6 {
        let mut round: u32 = 0;
        loop {
            let block_len = password.len() + k.len() + user_data.len();
            let mut k1 = Vec::with_capacity(block_len * 64);
            for _ in 0..64 {
                k1.extend_from_slice(password);
                k1.extend_from_slice(&k);
                k1.extend_from_slice(user_data);
            }

            let e = aes_cbc_encrypt_raw(&k[..16], &k[16..32], &k1)?;
            let selector: u32 = e[..16].iter().map(|&b| b as u32).sum::<u32>() % 3;
            k = match selector {
                0 => Sha256::digest(&e).to_vec(),
                1 => Sha384::digest(&e).to_vec(),
                _ => Sha512::digest(&e).to_vec(),
            };

            round += 1;
            let last = e.last().copied().unwrap_or(0) as u32;
            if round >= 64 && last <= round - 32 {
                break;
            }
        }
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&k[..32]);
    Ok(out)
}

/// Encryption dictionary values for R6.
#[derive(Debug, Clone)]
pub struct R6Values {
    /// /O (48 bytes)
    pub owner_key: Vec<u8>,
    /// /OE (32 bytes)
    pub owner_encryption: Vec<u8>,
    /// /U (48 bytes)
    pub user_key: Vec<u8>,
    /// /UE (32 bytes)
    pub user_encryption: Vec<u8>,
    /// /Perms (16 bytes)
    pub perms: Vec<u8>,
}

/// Compute /U, /UE, /O, /OE and /Perms for R6 (Algorithms 8, 9, 10).
pub fn compute_r6_values(
    user_password: &[u8],
    owner_password: &[u8],
    file_key: &[u8],
    permissions: i32,
    encrypt_metadata: bool,
) -> Result<R6Values> {
    let zero_iv = [0u8; 16];

    let salts = random_bytes(32);
    let (user_validation, user_key_salt) = (&salts[0..8], &salts[8..16]);
    let (owner_validation, owner_key_salt) = (&salts[16..24], &salts[24..32]);

    let mut user_key = hash_r5_r6(user_password, user_validation, &[], 6)?.to_vec();
    user_key.extend_from_slice(user_validation);
    user_key.extend_from_slice(user_key_salt);
    let ue_key = hash_r5_r6(user_password, user_key_salt, &[], 6)?;
    let user_encryption = aes_cbc_encrypt_raw(&ue_key, &zero_iv, file_key)?;

    let mut owner_key = hash_r5_r6(owner_password, owner_validation, &user_key, 6)?.to_vec();
    owner_key.extend_from_slice(owner_validation);
    owner_key.extend_from_slice(owner_key_salt);
    let oe_key = hash_r5_r6(owner_password, owner_key_salt, &user_key, 6)?;
    let owner_encryption = aes_cbc_encrypt_raw(&oe_key, &zero_iv, file_key)?;

    let mut block = [0u8; 16];
    block[..4].copy_from_slice(&permissions.to_le_bytes());
    block[4..8].copy_from_slice(&[0xFF; 4]);
    block[8] = if encrypt_metadata { b'T' } else { b'F' };
    block[9..12].copy_from_slice(b"adb");
    block[12..16].copy_from_slice(&random_bytes(4));
    let perms = aes_cbc_encrypt_raw(file_key, &zero_iv, &block)?;

    Ok(R6Values {
        owner_key,
        owner_encryption,
        user_key,
        user_encryption,
        perms,
    })
}

/// Authenticate the user password for R5/R6 (Algorithm 11), returning the file key.
pub fn authenticate_user_r6(password: &[u8], user_key: &[u8], user_encryption: &[u8], revision: u32) -> Result<Option<Vec<u8>>> {
    if user_key.len() < 48 || user_encryption.len() < 32 {
        return Ok(None);
    }
    let hash = hash_r5_r6(password, &user_key[32..40], &[], revision)?;
    if !constant_time_compare(&hash, &user_key[..32]) {
        return Ok(None);
    }

    let key = hash_r5_r6(password, &user_key[40..48], &[], revision)?;
    aes_cbc_decrypt_raw(&key, &[0u8; 16], &user_encryption[..32]).map(Some)
}

/// Authenticate the owner password for R5/R6 (Algorithm 12), returning the file key.
pub fn authenticate_owner_r6(
    password: &[u8],
    owner_key: &[u8],
    owner_encryption: &[u8],
    user_key: &[u8],
    revision: u32,
) -> Result<Option<Vec<u8>>> {
    if owner_key.len() < 48 || owner_encryption.len() < 32 || user_key.len() < 48 {
        return Ok(None);
    }
    let user_data = &user_key[..48];
    let hash = hash_r5_r6(password, &owner_key[32..40], user_data, revision)?;
    if !constant_time_compare(&hash, &owner_key[..32]) {
        return Ok(None);
    }

    let key = hash_r5_r6(password, &owner_key[40..48], user_data, revision)?;
    aes_cbc_decrypt_raw(&key, &[0u8; 16], &owner_encryption[..32]).map(Some)
}

/// Check /Perms against /P (Algorithm 13).
pub fn verify_perms(file_key: &[u8], perms: &[u8], permissions: i32) -> bool {
    let Some(block) = perms.get(..16) else {
        return false;
    };
    match aes_cbc_decrypt_raw(file_key, &[0u8; 16], block) {
        Ok(plain) => &plain[9..12] == b"adb" && plain[..4] == permissions.to_le_bytes(),
        Err(_) => false,
    }
}

/// Derive the key for one object (Algorithm 1).
///
/// AES-256 uses the file key directly.
pub fn compute_object_key(file_key: &[u8], obj_num: u32, gen_num: u16, aes: bool) -> Vec<u8> {
    if file_key.len() == 32 {
        return file_key.to_vec();
    }

    let mut hasher = Md5::new();
    hasher.update(file_key);
    hasher.update(&obj_num.to_le_bytes()[..3]);
    hasher.update(gen_num.to_le_bytes());
    if aes {
        hasher.update(b"sAlT");
    }
    let hash = hasher.finalize();

    hash[..(file_key.len() + 5).min(16)].to_vec()
}

/// Random bytes for salts, IVs and R6 file keys.
///
/// Each v4 UUID carries fresh OS randomness; SHA-256 spreads its fixed
/// version bits across the output.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let digest = Sha256::new()
            .chain_update(uuid::Uuid::new_v4().as_bytes())
            .chain_update(uuid::Uuid::new_v4().as_bytes())
            .finalize();
        let take = (len - out.len()).min(digest.len());
        out.extend_from_slice(&digest[..take]);
    }
    out
}

/// Constant-time comparison.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
