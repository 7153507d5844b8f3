use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::OAuthError;

type HmacSha256 = Hmac<Sha256>;

/// Signature is the first 16 hex chars of HMAC-SHA-256 over
/// `"{store_id}:{nonce_hex}"`.
const SIG_LEN: usize = 16;

/// Builds and validates the CSRF `state` parameter:
/// `"{store_id}_{nonce_hex}_{sig_hex}"`.
///
/// The store id is carried inside the state so the callback can recover it
/// without a database lookup, and the signature stops a forged callback
/// from burning another store's pending verifier.
pub struct StateSigner {
    secret: Vec<u8>,
}

impl StateSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn signature(&self, store_id: &str, nonce_hex: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA-256 accepts keys of any length");
        mac.update(store_id.as_bytes());
        mac.update(b":");
        mac.update(nonce_hex.as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        digest[..SIG_LEN].to_string()
    }

    pub fn build(&self, store_id: &str) -> String {
        let nonce: [u8; 8] = rand::random();
        let nonce_hex = hex::encode(nonce);
        let sig = self.signature(store_id, &nonce_hex);
        format!("{}_{}_{}", store_id, nonce_hex, sig)
    }

    /// Validate a state string and return the embedded store id.
    ///
    /// Splits from the right so store ids containing underscores survive
    /// the round trip. Comparison is constant-time.
    pub fn validate(&self, state: &str) -> Result<String, OAuthError> {
        let mut parts = state.rsplitn(3, '_');
        let sig = parts.next().ok_or(OAuthError::StateInvalid)?;
        let nonce_hex = parts.next().ok_or(OAuthError::StateInvalid)?;
        let store_id = parts.next().ok_or(OAuthError::StateInvalid)?;
        if store_id.is_empty() || nonce_hex.is_empty() {
            return Err(OAuthError::StateInvalid);
        }

        let expected = self.signature(store_id, nonce_hex);
        if !constant_time_eq(expected.as_bytes(), sig.as_bytes()) {
            return Err(OAuthError::StateInvalid);
        }
        Ok(store_id.to_string())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> StateSigner {
        StateSigner::new(b"test-state-secret".to_vec())
    }

    #[test]
    fn round_trips_simple_store_id() {
        let s = signer();
        let state = s.build("store_A");
        assert_eq!(s.validate(&state).unwrap(), "store_A");
    }

    #[test]
    fn round_trips_store_id_with_many_underscores() {
        let s = signer();
        let state = s.build("shop_eu_west_42");
        assert_eq!(s.validate(&state).unwrap(), "shop_eu_west_42");
    }

    #[test]
    fn rejects_tampered_signature() {
        let s = signer();
        let state = s.build("store_A");
        let tampered = format!(
            "{}deadbeefdeadbeef",
            &state[..state.len() - SIG_LEN]
        );
        assert!(s.validate(&tampered).is_err());
    }

    #[test]
    fn rejects_tampered_store_id() {
        let s = signer();
        let state = s.build("store_A");
        let tampered = state.replacen("store_A", "store_B", 1);
        assert!(s.validate(&tampered).is_err());
    }

    #[test]
    fn rejects_single_byte_flips_anywhere() {
        let s = signer();
        let state = s.build("store_A");
        for i in 0..state.len() {
            let mut bytes = state.clone().into_bytes();
            bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
            if let Ok(tampered) = String::from_utf8(bytes) {
                if tampered == state {
                    continue;
                }
                assert!(
                    s.validate(&tampered).is_err(),
                    "byte {} flip was accepted",
                    i
                );
            }
        }
    }

    #[test]
    fn rejects_truncated_and_malformed_states() {
        let s = signer();
        assert!(s.validate("").is_err());
        assert!(s.validate("no-underscores-here").is_err());
        assert!(s.validate("_abcdef0123456789_0123456789abcdef").is_err());
        assert!(s.validate("store_A").is_err());
    }

    #[test]
    fn different_secret_rejects() {
        let state = signer().build("store_A");
        let other = StateSigner::new(b"another-secret".to_vec());
        assert!(other.validate(&state).is_err());
    }
}
