//! Authentication error types.
//!
//! Most messages are shown to the person signing in, usually as a flash
//! message on the page they are redirected to.

use thiserror::Error;

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials (unknown email, wrong password, inactive user).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No active account for a confirmed email address.
    #[error("No active user with email address {0} found.")]
    NoActiveUser(String),

    /// The link was minted for an account that no longer exists.
    #[error("Something went wrong while decoding the registration request. Please try again.")]
    UnknownLinkAccount,

    /// The account logged in after the link was minted.
    #[error("The link has already been used.")]
    LinkUsed,

    /// The OAuth provider did not return an email address.
    #[error("Did not get an email address. Please try again.")]
    MissingEmail,

    /// A signed-in user asked for a link to a different address.
    #[error(
        "The email you entered ({input}) does not match the email of the account \
         you're logged in as currently ({current})."
    )]
    EmailMismatch {
        /// Address entered in the form.
        input: String,
        /// Address of the signed-in account.
        current: String,
    },

    /// A link was requested for a deactivated account.
    #[error("This email address belongs to an inactive account.")]
    InactiveAccount,

    /// The admin SSO gate refused the provider's email.
    #[error("No email address received or email domain unknown.")]
    AdminSsoRejected,

    /// An account with this email already exists.
    #[error("user already exists: {0}")]
    AlreadyExists(String),

    /// The email address is not usable.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Confirmation link or mail delivery failure.
    #[error(transparent)]
    Confirm(#[from] gatehouse_confirm::ConfirmError),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Password(String),

    /// OAuth provider failure.
    #[error("oauth provider error: {0}")]
    Provider(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Stable machine-readable code for link errors.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::UnknownLinkAccount => Some("email_registration_invalid_uid"),
            Self::LinkUsed => Some("email_registration_used"),
            Self::Confirm(e) => Some(e.code()),
            _ => None,
        }
    }
}
