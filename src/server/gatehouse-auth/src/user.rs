//! User records.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};

use gatehouse_roles::RoleHolder;

use crate::error::AuthError;

/// A persisted user account, keyed by its unique email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier.
    pub id: u64,
    /// Unique email address, also the login name.
    pub email: String,
    /// Full name, possibly empty.
    #[serde(default)]
    pub full_name: String,
    /// Inactive accounts cannot log in and hold no permissions.
    pub is_active: bool,
    /// Whether the user may log into the admin console.
    pub is_staff: bool,
    /// Superusers hold every permission.
    pub is_superuser: bool,
    /// Key of the user's role.
    pub role: String,
    /// Argon2id hash; `None` for accounts that only use links or OAuth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Last login (Unix seconds).
    #[serde(default)]
    pub last_login: Option<u64>,
    /// Account creation (Unix seconds).
    pub date_joined: u64,
}

impl User {
    /// Sets a new password, storing only its Argon2id hash.
    pub fn set_password(&mut self, password: &str) -> Result<(), AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Password(e.to_string()))?;
        self.password_hash = Some(hash.to_string());
        Ok(())
    }

    /// Verifies `password` against the stored hash.
    ///
    /// Accounts without a password never match.
    pub fn check_password(&self, password: &str) -> bool {
        let Some(hash) = self.password_hash.as_deref() else {
            return false;
        };
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Name shown in the UI: the full name, or an obfuscated email.
    pub fn display_name(&self) -> String {
        if self.full_name.is_empty() {
            obfuscate_email(&self.email)
        } else {
            self.full_name.clone()
        }
    }
}

impl RoleHolder for User {
    fn authorization_role(&self) -> &str {
        &self.role
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Data for creating a user; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Full name.
    pub full_name: String,
    /// Role key.
    pub role: String,
    /// Initial active flag.
    pub is_active: bool,
    /// Staff flag.
    pub is_staff: bool,
    /// Superuser flag.
    pub is_superuser: bool,
}

impl NewUser {
    /// An active, unprivileged user with `role`.
    pub fn new(email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            full_name: String::new(),
            role: role.into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    /// Sets the full name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = full_name.into();
        self
    }

    /// Marks the user as staff.
    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    /// Marks the user as staff and superuser.
    pub fn superuser(mut self) -> Self {
        self.is_staff = true;
        self.is_superuser = true;
        self
    }
}

/// Lowercases the domain part of an email address.
///
/// Fails on addresses without a local part or domain.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(format!("{local}@{}", domain.to_lowercase()))
        }
        _ => Err(AuthError::InvalidEmail(email.to_string())),
    }
}

/// Masks an email address for display: `alexander@mail.example.com` becomes
/// `ale***@***.com`.
pub fn obfuscate_email(email: &str) -> String {
    const KEEP: usize = 3;

    let (user, domain) = email.split_once('@').unwrap_or((email, ""));
    let kept: String = user.chars().take(KEEP).collect();

    if domain.is_empty() {
        return format!("{kept}***");
    }

    let tld = domain.rsplit('.').next().unwrap_or(domain);
    let mask = if user.chars().count() > KEEP { "***" } else { "" };
    format!("{kept}{mask}@***.{tld}")
}
