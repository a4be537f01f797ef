//! Confirmation code encoding and decoding.
//!
//! ## Code Format
//!
//! `base64url("<email>:<payload>"):<timestamp>:<signature>`
//!
//! The email and payload are escaped together as one base64url unit before
//! signing, so the payload may contain `:`. The email ends at the first `:`.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gatehouse_crypto::{signer::unix_now, CryptoError, SecretKey, TimestampSigner};

use crate::error::ConfirmError;

/// Signing namespace of registration codes.
pub const REGISTRATION_SALT: &str = "email_registration";

/// Signing namespace of magic sign-in codes.
pub const MAGIC_LINK_SALT: &str = "magic_link";

/// Default maximum age of registration links (1 hour).
pub const REGISTRATION_MAX_AGE: u64 = 60 * 60;

/// Default maximum age of magic sign-in links (3 hours).
pub const MAGIC_LINK_MAX_AGE: u64 = 3 * 60 * 60;

const SEP: char = ':';

/// URL-safe base64, unpadded on output, padding optional on input.
const ESCAPE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The verified contents of a confirmation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPayload {
    /// The address the link was sent to.
    pub email: String,
    /// Caller-defined data, empty when none was given.
    pub payload: String,
}

/// Mints and verifies confirmation codes.
#[derive(Debug, Clone)]
pub struct ConfirmationCodec {
    signer: TimestampSigner,
    legacy_fallback: bool,
}

impl ConfirmationCodec {
    /// Creates a codec signing under [`REGISTRATION_SALT`].
    pub fn new(secret: &SecretKey) -> Result<Self, ConfirmError> {
        Self::with_salt(secret, REGISTRATION_SALT)
    }

    /// Creates a codec signing under [`MAGIC_LINK_SALT`].
    pub fn magic_link(secret: &SecretKey) -> Result<Self, ConfirmError> {
        Self::with_salt(secret, MAGIC_LINK_SALT)
    }

    /// Creates a codec signing under a custom namespace.
    pub fn with_salt(secret: &SecretKey, salt: &str) -> Result<Self, ConfirmError> {
        Ok(Self {
            signer: TimestampSigner::new(secret, salt)?,
            legacy_fallback: true,
        })
    }

    /// Rejects codes whose data is not base64-escaped.
    ///
    /// By default such codes are still accepted when their raw data splits
    /// on `:`, which is how codes were minted before escaping was added.
    pub fn strict(mut self) -> Self {
        self.legacy_fallback = false;
        self
    }

    /// Returns the signing namespace.
    pub fn salt(&self) -> &str {
        self.signer.salt()
    }

    /// Builds a code for `email` and `payload`, timestamped now.
    pub fn encode(&self, email: &str, payload: &str) -> String {
        self.encode_at(email, payload, unix_now())
    }

    /// Builds a code as if minted at `timestamp`.
    pub fn encode_at(&self, email: &str, payload: &str, timestamp: u64) -> String {
        let escaped = ESCAPE.encode(format!("{email}{SEP}{payload}"));
        self.signer.sign_at(&escaped, timestamp)
    }

    /// Verifies `code` and returns the email and payload it carries.
    ///
    /// Codes older than `max_age` seconds fail with
    /// [`ConfirmError::Expired`].
    pub fn decode(&self, code: &str, max_age: u64) -> Result<ConfirmationPayload, ConfirmError> {
        self.decode_at(code, max_age, unix_now())
    }

    /// Like [`decode`](Self::decode), with an explicit current time.
    pub fn decode_at(
        &self,
        code: &str,
        max_age: u64,
        now: u64,
    ) -> Result<ConfirmationPayload, ConfirmError> {
        let data = self
            .signer
            .unsign_at(code, Some(max_age), now)
            .map_err(|e| match e {
                CryptoError::SignatureExpired { age, max_age } => {
                    warn!(age, max_age, "Confirmation code expired");
                    ConfirmError::Expired
                }
                _ => {
                    warn!(salt = %self.signer.salt(), "Confirmation code signature rejected");
                    ConfirmError::BadSignature
                }
            })?;

        let decoded = match self.unescape(&data) {
            Some(text) => text,
            None if self.legacy_fallback && data.contains(SEP) => {
                debug!("Accepting unescaped legacy confirmation code");
                data
            }
            None => return Err(ConfirmError::Malformed),
        };

        let (email, payload) = decoded.split_once(SEP).ok_or(ConfirmError::Malformed)?;

        Ok(ConfirmationPayload {
            email: email.to_string(),
            payload: payload.to_string(),
        })
    }

    fn unescape(&self, data: &str) -> Option<String> {
        let bytes = ESCAPE.decode(data).ok()?;
        String::from_utf8(bytes).ok()
    }
}
