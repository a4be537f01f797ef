//! Error types for signing and key handling.

use thiserror::Error;

/// Signing and key errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Signature verification failed (tampered, truncated or foreign salt).
    #[error("signature verification failed")]
    VerificationFailed,

    /// Signature is valid but older than the allowed maximum age.
    #[error("signature age {age}s exceeds {max_age}s")]
    SignatureExpired {
        /// Age of the signature in seconds.
        age: u64,
        /// Maximum accepted age in seconds.
        max_age: u64,
    },

    /// Unusable secret (too short, empty).
    #[error("invalid key: {0}")]
    InvalidKey(String),
}
