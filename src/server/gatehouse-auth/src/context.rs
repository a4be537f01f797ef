//! Authentication context types.

use serde::{Deserialize, Serialize};

use crate::user::User;

/// Method used to authenticate the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Email address and password.
    Password,
    /// Confirmed registration link.
    EmailRegistration,
    /// Magic sign-in link.
    MagicLink,
    /// Third-party OAuth provider.
    OAuth {
        /// Provider name, e.g. `google`.
        provider: String,
    },
    /// Admin console single sign-on.
    AdminSso,
}

/// Authenticated user context.
///
/// Returned by every successful login flow; the host stores `user_id` in
/// its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Identifier of the logged-in user.
    pub user_id: u64,

    /// Email address of the logged-in user.
    pub email: String,

    /// Authentication method used.
    pub auth_method: AuthMethod,

    /// Whether the account was created by this login.
    pub new_user: bool,

    /// Login timestamp (Unix seconds).
    pub authenticated_at: u64,
}

impl AuthContext {
    /// Creates a context for `user`.
    pub fn for_user(user: &User, auth_method: AuthMethod, authenticated_at: u64) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            auth_method,
            new_user: false,
            authenticated_at,
        }
    }

    /// Marks the account as created by this login.
    pub fn as_new_user(mut self, new_user: bool) -> Self {
        self.new_user = new_user;
        self
    }
}
