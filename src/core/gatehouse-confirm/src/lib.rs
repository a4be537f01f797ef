//! # Gatehouse Confirm
//!
//! Email confirmation links for registration and magic-link sign-in.
//!
//! A confirmation code proves that an email address was sent a particular
//! link. Codes carry the address plus an opaque caller payload, are signed
//! under a per-flow namespace (`email_registration`, `magic_link`) and
//! expire after a caller-chosen number of seconds.
//!
//! ```
//! use gatehouse_confirm::{ConfirmationCodec, REGISTRATION_MAX_AGE};
//! use gatehouse_crypto::SecretKey;
//!
//! let secret = SecretKey::from_string("an application secret of some length").unwrap();
//! let codec = ConfirmationCodec::new(&secret).unwrap();
//!
//! let code = codec.encode("user@example.com", "next=/welcome/");
//! let confirmed = codec.decode(&code, REGISTRATION_MAX_AGE).unwrap();
//! assert_eq!(confirmed.email, "user@example.com");
//! assert_eq!(confirmed.payload, "next=/welcome/");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod mail;

pub use codec::{
    ConfirmationCodec, ConfirmationPayload, MAGIC_LINK_MAX_AGE, MAGIC_LINK_SALT,
    REGISTRATION_MAX_AGE, REGISTRATION_SALT,
};
pub use error::ConfirmError;
pub use mail::{
    confirmation_url, render_to_mail, MailMessage, MailTemplate, MailTransport, RegistrationTemplate,
};
