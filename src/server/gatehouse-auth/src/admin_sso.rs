//! Admin console single sign-on.
//!
//! A provider login is accepted for the admin console when the email it
//! returns matches one of the configured rules and the account behind the
//! rule is an active staff member.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use gatehouse_roles::GlobPattern;

use crate::backend::EmailBackend;
use crate::context::{AuthContext, AuthMethod};
use crate::error::AuthError;
use crate::user::normalize_email;

/// Maps provider emails matching `pattern` to a local account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoRule {
    /// Glob over the provider email, e.g. `*@example.com`.
    pub pattern: GlobPattern,
    /// Account to log in as; the provider email itself when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl SsoRule {
    /// Creates a rule logging matching emails into their own account.
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: GlobPattern::new(pattern),
            user: None,
        }
    }

    /// Logs matching emails into `user` instead.
    pub fn as_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Authorizes admin console logins.
#[derive(Debug, Clone)]
pub struct AdminSsoGate {
    rules: Vec<SsoRule>,
    backend: EmailBackend,
}

impl AdminSsoGate {
    /// Creates a gate; rules are tried in order.
    pub fn new(rules: Vec<SsoRule>, backend: EmailBackend) -> Self {
        Self { rules, backend }
    }

    /// Configured rules.
    pub fn rules(&self) -> &[SsoRule] {
        &self.rules
    }

    /// Logs in the staff account for a provider `email`.
    ///
    /// The first matching rule whose account is active staff wins.
    pub async fn authorize(&self, email: Option<&str>) -> Result<AuthContext, AuthError> {
        let email = email.filter(|e| !e.is_empty()).ok_or_else(|| {
            warn!("Admin SSO without email address");
            AuthError::AdminSsoRejected
        })?;
        let email = normalize_email(email).map_err(|_| {
            warn!("Admin SSO with unusable email address");
            AuthError::AdminSsoRejected
        })?;

        for rule in self.rules.iter().filter(|r| r.pattern.matches(&email)) {
            let target = rule.user.as_deref().unwrap_or(&email);
            match self.backend.authenticate_email(target).await {
                Ok(user) if user.is_staff => {
                    return self.backend.login(user, AuthMethod::AdminSso).await;
                }
                Ok(_) => debug!(rule = %rule.pattern, "Admin SSO account is not staff"),
                Err(AuthError::InvalidCredentials) => {
                    debug!(rule = %rule.pattern, "Admin SSO account not found")
                }
                Err(e) => return Err(e),
            }
        }

        warn!(%email, "Admin SSO refused");
        Err(AuthError::AdminSsoRejected)
    }
}

/// Returns `next` if it is safe to redirect to after a login on `host`.
///
/// Relative paths are accepted, absolute URLs only with an http(s) scheme
/// and the same `host[:port]`. Scheme-relative `//` URLs are refused.
pub fn safe_redirect<'a>(next: Option<&'a str>, host: &str) -> Option<&'a str> {
    let next = next?.trim();
    if next.is_empty() || next.contains('\\') || next.chars().any(char::is_control) {
        return None;
    }
    if next.starts_with("//") {
        return None;
    }

    match Url::parse(next) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                return None;
            }
            let authority = match (url.host_str(), url.port()) {
                (Some(h), Some(port)) => format!("{h}:{port}"),
                (Some(h), None) => h.to_string(),
                (None, _) => return None,
            };
            authority.eq_ignore_ascii_case(host).then_some(next)
        }
        // No scheme: a path relative to the current host. Anything with a
        // colon before the first slash would be read as a scheme by browsers.
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let head = next.split('/').next().unwrap_or_default();
            (!head.contains(':')).then_some(next)
        }
        Err(_) => None,
    }
}
