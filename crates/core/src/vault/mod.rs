//! Authenticated encryption for OAuth tokens at rest.
//!
//! ChaCha20-Poly1305 with a 256-bit process-lifetime key and a fresh
//! 96-bit random nonce per encryption. Ciphertext blobs are stored as
//! `base64(nonce):base64(tag):base64(body)` so the three parts can never
//! ambiguate.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, Key, Nonce};

use crate::errors::CryptoError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

pub struct CryptoVault {
    cipher: ChaCha20Poly1305,
}

impl CryptoVault {
    /// Build a vault from raw key bytes. The key must be exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::KeyInvalid);
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::Malformed("encryption failed".into()))?;
        // The AEAD appends the 16-byte tag to the body; store it between
        // nonce and body per the blob layout.
        let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        Ok(format!(
            "{}:{}:{}",
            B64.encode(nonce),
            B64.encode(tag),
            B64.encode(body)
        ))
    }

    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>, CryptoError> {
        let mut parts = blob.splitn(3, ':');
        let (nonce_b64, tag_b64, body_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(n), Some(t), Some(b)) => (n, t, b),
            _ => return Err(CryptoError::Malformed("expected three segments".into())),
        };

        let nonce = B64
            .decode(nonce_b64)
            .map_err(|e| CryptoError::Malformed(format!("nonce: {}", e)))?;
        let tag = B64
            .decode(tag_b64)
            .map_err(|e| CryptoError::Malformed(format!("tag: {}", e)))?;
        let body = B64
            .decode(body_b64)
            .map_err(|e| CryptoError::Malformed(format!("body: {}", e)))?;
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::Malformed("nonce must be 12 bytes".into()));
        }
        if tag.len() != TAG_LEN {
            return Err(CryptoError::Malformed("tag must be 16 bytes".into()));
        }

        let mut sealed = body;
        sealed.extend_from_slice(&tag);
        self.cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_ref())
            .map_err(|_| CryptoError::IntegrityFailure)
    }

    /// Convenience for token strings.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<String, CryptoError> {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt_str(&self, blob: &str) -> Result<String, CryptoError> {
        let bytes = self.decrypt(blob)?;
        String::from_utf8(bytes).map_err(|_| CryptoError::Malformed("plaintext is not UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CryptoVault {
        CryptoVault::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(matches!(
            CryptoVault::new(&[0u8; 16]),
            Err(CryptoError::KeyInvalid)
        ));
    }

    #[test]
    fn round_trips_bytes() {
        let v = vault();
        let blob = v.encrypt(b"act.123456").unwrap();
        assert_eq!(v.decrypt(&blob).unwrap(), b"act.123456");
    }

    #[test]
    fn two_encryptions_of_same_plaintext_differ() {
        let v = vault();
        let a = v.encrypt(b"same").unwrap();
        let b = v.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_body_fails_authentication() {
        let v = vault();
        let blob = v.encrypt(b"secret refresh token").unwrap();
        let mut parts: Vec<String> = blob.split(':').map(String::from).collect();
        let mut body = B64.decode(&parts[2]).unwrap();
        body[0] ^= 0x01;
        parts[2] = B64.encode(&body);
        let tampered = parts.join(":");
        assert!(matches!(
            v.decrypt(&tampered),
            Err(CryptoError::IntegrityFailure)
        ));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let blob = vault().encrypt(b"secret").unwrap();
        let other = CryptoVault::new(&[8u8; 32]).unwrap();
        assert!(matches!(
            other.decrypt(&blob),
            Err(CryptoError::IntegrityFailure)
        ));
    }

    #[test]
    fn malformed_blob_is_not_an_integrity_failure() {
        let v = vault();
        assert!(matches!(
            v.decrypt("not-a-blob"),
            Err(CryptoError::Malformed(_))
        ));
        assert!(matches!(
            v.decrypt("a:b"),
            Err(CryptoError::Malformed(_))
        ));
        assert!(matches!(
            v.decrypt("%%:%%:%%"),
            Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn decrypt_str_rejects_non_utf8() {
        let v = vault();
        let blob = v.encrypt(&[0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(matches!(
            v.decrypt_str(&blob),
            Err(CryptoError::Malformed(_))
        ));
    }
}
