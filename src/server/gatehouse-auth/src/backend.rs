//! User persistence and email-based authentication.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use gatehouse_crypto::signer::unix_now;

use crate::context::{AuthContext, AuthMethod};
use crate::error::AuthError;
use crate::user::{normalize_email, NewUser, User};

/// Trait for user record stores.
///
/// Implemented by the host on top of its database.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Gets a user by id.
    async fn get(&self, id: u64) -> Result<Option<User>, AuthError>;

    /// Gets a user by exact email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    /// Creates a user.
    ///
    /// Fails with [`AuthError::AlreadyExists`] if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, AuthError>;

    /// Replaces a stored user.
    async fn update(&self, user: &User) -> Result<(), AuthError>;
}

/// In-memory [`UserStore`] for tests and single-process setups.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<u64, User>>,
    next_id: AtomicU64,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the store holds no user.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: u64) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, AuthError> {
        let email = normalize_email(&new.email)?;

        let mut users = self.users.write().await;
        if users.values().any(|user| user.email == email) {
            return Err(AuthError::AlreadyExists(email));
        }

        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            email,
            full_name: new.full_name,
            is_active: new.is_active,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            role: new.role,
            password_hash: None,
            last_login: None,
            date_joined: unix_now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(AuthError::Storage(format!("user {} not found", user.id))),
        }
    }
}

/// Authenticates users by email address, with or without a password.
#[derive(Clone)]
pub struct EmailBackend {
    store: Arc<dyn UserStore>,
}

impl EmailBackend {
    /// Creates a backend over `store`.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Returns the active user with `email`.
    ///
    /// Only call this once the address has been verified by other means
    /// (a confirmed link, an OAuth provider).
    pub async fn authenticate_email(&self, email: &str) -> Result<User, AuthError> {
        match self.store.find_by_email(email).await? {
            Some(user) if user.is_active => Ok(user),
            _ => {
                debug!(email, "No active user for email");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Returns the active user with `email` if `password` matches.
    pub async fn authenticate_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = self.authenticate_email(email).await?;
        if !user.check_password(password) {
            debug!(email, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Email and password login.
    pub async fn password_login(&self, email: &str, password: &str) -> Result<AuthContext, AuthError> {
        let user = self.authenticate_password(email, password).await?;
        self.login(user, AuthMethod::Password).await
    }

    /// Records the login on `user` and returns its context.
    pub async fn login(&self, mut user: User, method: AuthMethod) -> Result<AuthContext, AuthError> {
        // Strictly increasing, so links bound to the previous login expire.
        let now = match user.last_login {
            Some(previous) => unix_now().max(previous.saturating_add(1)),
            None => unix_now(),
        };
        user.last_login = Some(now);
        self.store.update(&user).await?;

        info!(user_id = user.id, method = ?method, "User logged in");
        Ok(AuthContext::for_user(&user, method, now))
    }
}

impl std::fmt::Debug for EmailBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailBackend").finish_non_exhaustive()
    }
}
