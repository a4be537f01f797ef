//! # Gatehouse Auth
//!
//! Login flows for a host web application.
//!
//! ## Supported Methods
//!
//! - Email + password
//! - Email registration links
//! - Magic sign-in links
//! - OAuth providers (the wire protocol is left to an [`OAuthClient`])
//! - Admin console SSO restricted to staff accounts
//!
//! Persistence and mail delivery are delegated to the host through the
//! [`UserStore`] and [`MailTransport`](gatehouse_confirm::MailTransport)
//! traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin_sso;
pub mod backend;
pub mod context;
pub mod error;
pub mod oauth;
pub mod registration;
pub mod user;

pub use admin_sso::{safe_redirect, AdminSsoGate, SsoRule};
pub use backend::{EmailBackend, InMemoryUserStore, UserStore};
pub use context::{AuthContext, AuthMethod};
pub use error::AuthError;
pub use oauth::{complete_oauth_login, is_callback, OAuthClient, OAuthLogin, OAuthUserData};
pub use registration::{
    AccountBinding, ConfirmedLink, EmailRegistration, LinkMailer, MagicLink, Registration,
};
pub use user::{normalize_email, obfuscate_email, NewUser, User};
