//! Confirmation code error types.
//!
//! The `Display` output of the decode errors is meant to be shown to the
//! person following the link.

use thiserror::Error;

/// Errors that can occur while minting or decoding confirmation codes.
#[derive(Debug, Error)]
pub enum ConfirmError {
    /// The signature is valid but the link is older than allowed.
    #[error("The link is expired. Please request another registration link.")]
    Expired,

    /// The signature does not verify (tampering, truncation, foreign salt).
    #[error("Unable to verify the signature. Please request a new registration link.")]
    BadSignature,

    /// The signed data cannot be split into an email and a payload.
    #[error("Something went wrong while decoding the registration request. Please try again.")]
    Malformed,

    /// The confirmation URL could not be built.
    #[error("invalid confirmation url: {0}")]
    InvalidUrl(String),

    /// Mail delivery failed.
    #[error("mail delivery failed: {0}")]
    Transport(String),

    /// Signer setup failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] gatehouse_crypto::CryptoError),
}

impl ConfirmError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Expired => "email_registration_expired",
            Self::BadSignature => "email_registration_signature",
            Self::Malformed => "email_registration_broken",
            Self::InvalidUrl(_) => "email_registration_url",
            Self::Transport(_) => "email_registration_transport",
            Self::Crypto(_) => "email_registration_crypto",
        }
    }

    /// Whether the person should simply request a fresh link.
    pub fn is_link_error(&self) -> bool {
        matches!(self, Self::Expired | Self::BadSignature | Self::Malformed)
    }
}
