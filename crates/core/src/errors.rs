//! Shared error types for the core and storage layers.

use thiserror::Error;

/// Result type alias used across the core and storage crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Storage-level failures surfaced through the repository traits.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Could not obtain a database connection: {0}")]
    Pool(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Failures of the token vault.
///
/// `IntegrityFailure` means the authentication tag did not verify — the
/// stored ciphertext was tampered with or encrypted under a different key.
/// Callers treat it as "stored token is corrupt" and transition the owning
/// account to the ERROR status. `Malformed` covers everything that fails
/// before the AEAD runs (wrong segment count, bad base64, short nonce) and
/// must stay distinguishable from a tag mismatch.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("token encryption key is not configured")]
    KeyMissing,

    #[error("token encryption key must be exactly 32 bytes")]
    KeyInvalid,

    #[error("ciphertext failed authentication")]
    IntegrityFailure,

    #[error("ciphertext is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when this error is a vault tag-verification failure.
    pub fn is_crypto_integrity_failure(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::IntegrityFailure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_failure_is_detected_through_wrapper() {
        let err = Error::from(CryptoError::IntegrityFailure);
        assert!(err.is_crypto_integrity_failure());
        assert!(!Error::from(CryptoError::KeyMissing).is_crypto_integrity_failure());
    }
}
