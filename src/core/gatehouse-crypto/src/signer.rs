//! Timestamping HMAC signer.
//!
//! Signed values have the form `value:timestamp:signature` where
//! - `timestamp` is the signing time in seconds since the Unix epoch, base62
//!   encoded
//! - `signature` is the unpadded URL-safe base64 HMAC-SHA256 of
//!   `value:timestamp` under a key derived from the secret and the salt
//!
//! The value itself may contain `:`; parsing splits from the right.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::error::CryptoError;
use crate::kdf::derive_signing_key;
use crate::keys::SecretKey;

type HmacSha256 = Hmac<Sha256>;

/// Separator between value, timestamp and signature.
pub const SEP: char = ':';

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Signs values together with the time of signing and verifies them
/// against a maximum age.
#[derive(Clone)]
pub struct TimestampSigner {
    mac: HmacSha256,
    salt: String,
}

impl TimestampSigner {
    /// Creates a signer for `salt`, deriving its key from `secret`.
    pub fn new(secret: &SecretKey, salt: impl Into<String>) -> Result<Self, CryptoError> {
        let salt = salt.into();
        let key = derive_signing_key(secret.as_bytes(), &salt)?;
        let mac = HmacSha256::new_from_slice(&key[..])
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self { mac, salt })
    }

    /// Returns the namespace this signer was created for.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Signs `value` with the current time.
    pub fn sign(&self, value: &str) -> String {
        self.sign_at(value, unix_now())
    }

    /// Signs `value` as if it were signed at `timestamp`.
    pub fn sign_at(&self, value: &str, timestamp: u64) -> String {
        let payload = format!("{value}{SEP}{}", base62_encode(timestamp));
        let signature = URL_SAFE_NO_PAD.encode(self.compute(payload.as_bytes()));
        format!("{payload}{SEP}{signature}")
    }

    /// Verifies `signed` and returns the original value.
    ///
    /// With `max_age` set, signatures older than that many seconds are
    /// rejected with [`CryptoError::SignatureExpired`].
    pub fn unsign(&self, signed: &str, max_age: Option<u64>) -> Result<String, CryptoError> {
        self.unsign_at(signed, max_age, unix_now())
    }

    /// Like [`unsign`](Self::unsign), with an explicit current time.
    pub fn unsign_at(
        &self,
        signed: &str,
        max_age: Option<u64>,
        now: u64,
    ) -> Result<String, CryptoError> {
        let (payload, signature) = signed
            .rsplit_once(SEP)
            .ok_or(CryptoError::VerificationFailed)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CryptoError::VerificationFailed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| {
            debug!(salt = %self.salt, "Signature mismatch");
            CryptoError::VerificationFailed
        })?;

        let (value, timestamp) = payload
            .rsplit_once(SEP)
            .ok_or(CryptoError::VerificationFailed)?;
        let timestamp = base62_decode(timestamp).ok_or(CryptoError::VerificationFailed)?;

        if let Some(max_age) = max_age {
            let age = now.saturating_sub(timestamp);
            if age > max_age {
                return Err(CryptoError::SignatureExpired { age, max_age });
            }
        }

        Ok(value.to_string())
    }

    fn compute(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for TimestampSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampSigner")
            .field("salt", &self.salt)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Current time in seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn base62_encode(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE62_ALPHABET[(n % 62) as usize]);
        n /= 62;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

fn base62_decode(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    s.bytes().try_fold(0u64, |acc, c| {
        let digit = BASE62_ALPHABET.iter().position(|&a| a == c)? as u64;
        acc.checked_mul(62)?.checked_add(digit)
    })
}
