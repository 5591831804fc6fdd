//! RC4 stream cipher.
//!
//! Used by the standard security handler for V1/V2 documents, by V4 crypt
//! filters with `/CFM /V2`, and inside the R2-R4 password algorithms.
//!
//! PDF Spec: Section 7.6.2 - General Encryption Algorithm

/// RC4 keystream generator.
pub struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Run the key schedule. An empty key yields the identity permutation.
    pub fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (i, val) in s.iter_mut().enumerate() {
            *val = i as u8;
        }

        if !key.is_empty() {
            let mut j = 0u8;
            for i in 0..256 {
                j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
                s.swap(i, j as usize);
            }
        }

        Self { s, i: 0, j: 0 }
    }

    /// XOR the keystream into `data`.
    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.s[self.i as usize]);
            self.s.swap(self.i as usize, self.j as usize);
            let k = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
            *byte ^= self.s[k as usize];
        }
    }
}

/// Encrypt or decrypt data using RC4 (the operation is its own inverse).
pub fn rc4_crypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    Rc4::new(key).apply(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc4_known_vectors() {
        assert_eq!(rc4_crypt(b"Key", b"Plaintext"), [0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]);
        assert_eq!(rc4_crypt(b"Wiki", b"pedia"), [0x10, 0x21, 0xBF, 0x04, 0x20]);
    }

    #[test]
    fn test_rc4_symmetric() {
        let ciphertext = rc4_crypt(b"testkey", b"Hello, World!");
        assert_ne!(&ciphertext[..], b"Hello, World!");
        assert_eq!(rc4_crypt(b"testkey", &ciphertext), b"Hello, World!");
    }

    #[test]
    fn test_rc4_streaming_matches_one_shot() {
        let mut cipher = Rc4::new(b"secret");
        let mut a = b"split ".to_vec();
        let mut b = b"message".to_vec();
        cipher.apply(&mut a);
        cipher.apply(&mut b);
        a.extend(b);
        assert_eq!(a, rc4_crypt(b"secret", b"split message"));
    }

    #[test]
    fn test_rc4_empty() {
        assert!(rc4_crypt(b"testkey", b"").is_empty());
        assert_eq!(rc4_crypt(b"", b"abc").len(), 3);
    }
}
