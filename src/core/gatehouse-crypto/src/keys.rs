//! Application secret with automatic memory zeroization.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::random::generate_bytes;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Length of freshly generated secrets in bytes.
pub const GENERATED_SECRET_LEN: usize = 32;

/// The application-wide signing secret.
///
/// Signers never use this value directly; they derive a per-salt key from
/// it (see [`crate::kdf::derive_signing_key`]). The bytes are erased from
/// memory when the key is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Generates a new random secret.
    pub fn generate() -> Self {
        Self {
            bytes: generate_bytes(GENERATED_SECRET_LEN),
        }
    }

    /// Creates a secret from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is shorter than [`MIN_SECRET_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_SECRET_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected at least {} bytes, got {}",
                MIN_SECRET_LEN,
                bytes.len()
            )));
        }

        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Creates a secret from a configuration string (its UTF-8 bytes).
    pub fn from_string(secret: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(secret.as_bytes())
    }

    /// Returns the raw secret bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
