//! OAuth login.
//!
//! Talking to a provider (redirects, token exchange, profile requests) is
//! the job of an [`OAuthClient`] implementation. This module turns the
//! profile it returns into a local login.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use gatehouse_roles::RoleRegistry;

use crate::backend::{EmailBackend, UserStore};
use crate::context::{AuthContext, AuthMethod};
use crate::error::AuthError;
use crate::user::{normalize_email, NewUser};

/// Profile data returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthUserData {
    /// Verified email address, if the provider shared one.
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Client for one OAuth provider.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Provider name, e.g. `google`.
    fn provider(&self) -> &str;

    /// Where to send the browser to start the login.
    fn authentication_url(&self) -> Result<Url, AuthError>;

    /// Exchanges the callback query parameters for the user's profile.
    async fn user_data(&self, params: &HashMap<String, String>) -> Result<OAuthUserData, AuthError>;
}

/// Whether the query parameters are a provider callback (OAuth 2 `code` or
/// OAuth 1 `oauth_token`) rather than the start of a login.
pub fn is_callback(params: &HashMap<String, String>) -> bool {
    params.contains_key("code") || params.contains_key("oauth_token")
}

/// Logs in the owner of a provider profile, creating the account if needed.
#[derive(Debug, Clone)]
pub struct OAuthLogin {
    backend: EmailBackend,
    default_role: String,
}

impl OAuthLogin {
    /// New accounts get the registry's default role.
    pub fn new(store: Arc<dyn UserStore>, roles: &RoleRegistry) -> Self {
        Self {
            backend: EmailBackend::new(store),
            default_role: roles.default_key().to_string(),
        }
    }

    /// Completes a login from profile data returned by `provider`.
    pub async fn complete(
        &self,
        provider: &str,
        data: OAuthUserData,
    ) -> Result<AuthContext, AuthError> {
        let Some(email) = data.email.filter(|e| !e.is_empty()) else {
            warn!(provider, "Provider returned no email address");
            return Err(AuthError::MissingEmail);
        };
        let email = normalize_email(&email)?;

        let store = self.backend.store();
        let (user, new_user) = match store.find_by_email(&email).await? {
            Some(user) => (user, false),
            None => {
                let new = NewUser::new(email.as_str(), self.default_role.as_str())
                    .with_full_name(data.full_name.unwrap_or_default());
                let user = store.create(new).await?;
                info!(user_id = user.id, provider, "Created user from OAuth profile");
                (user, true)
            }
        };

        if !user.is_active {
            return Err(AuthError::NoActiveUser(email));
        }

        let method = AuthMethod::OAuth {
            provider: provider.to_string(),
        };
        Ok(self.backend.login(user, method).await?.as_new_user(new_user))
    }

    /// Runs the callback leg of `client`: fetches the profile and logs in.
    pub async fn callback(
        &self,
        client: &dyn OAuthClient,
        params: &HashMap<String, String>,
    ) -> Result<AuthContext, AuthError> {
        let data = client.user_data(params).await?;
        self.complete(client.provider(), data).await
    }
}

/// Completes an OAuth login; new accounts get the registry's default role.
pub async fn complete_oauth_login(
    store: Arc<dyn UserStore>,
    roles: &RoleRegistry,
    provider: &str,
    data: OAuthUserData,
) -> Result<AuthContext, AuthError> {
    OAuthLogin::new(store, roles).complete(provider, data).await
}
