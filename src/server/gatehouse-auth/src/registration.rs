//! Email registration and magic sign-in links.
//!
//! Both flows mail a signed confirmation code to an address and log the user
//! in once the link comes back. Registration creates missing accounts;
//! magic links only work for existing active users.
//!
//! A link minted for an existing account is bound to that account's id and
//! last login. Logging in moves the last login, so every link works once.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use gatehouse_confirm::{
    confirmation_url, ConfirmError, ConfirmationCodec, ConfirmationPayload, MailTemplate,
    MailTransport, MAGIC_LINK_MAX_AGE, REGISTRATION_MAX_AGE,
};
use gatehouse_crypto::SecretKey;
use gatehouse_roles::RoleRegistry;

use crate::backend::{EmailBackend, UserStore};
use crate::context::{AuthContext, AuthMethod};
use crate::error::AuthError;
use crate::user::{normalize_email, NewUser, User};

/// Base36 rendering of a user's last login, `0` if they never logged in.
fn login_stamp(user: &User) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut n = user.last_login.unwrap_or(0);
    let mut digits = Vec::new();
    loop {
        digits.push(DIGITS[(n % 36) as usize] as char);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

/// Account a link was minted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBinding {
    /// Id of the account.
    pub user_id: u64,
    /// The account's last login when the link was minted, in base36.
    pub login_stamp: String,
}

impl AccountBinding {
    fn of(user: &User) -> Self {
        Self {
            user_id: user.id,
            login_stamp: login_stamp(user),
        }
    }

    /// Fails if `user` logged in after the link was minted.
    pub fn verify(&self, user: &User) -> Result<(), AuthError> {
        if login_stamp(user) != self.login_stamp {
            warn!(user_id = user.id, "Confirmation link reused");
            return Err(AuthError::LinkUsed);
        }
        Ok(())
    }
}

/// Contents of a verified link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedLink {
    /// Address the link was mailed to.
    pub email: String,
    /// Account the link was minted for, if it existed at the time.
    pub account: Option<AccountBinding>,
    /// Caller payload.
    pub payload: String,
}

/// Mints confirmation links and mails them.
#[derive(Clone)]
pub struct LinkMailer {
    codec: ConfirmationCodec,
    transport: Arc<dyn MailTransport>,
    template: Arc<dyn MailTemplate>,
    base_url: Url,
}

impl LinkMailer {
    /// Creates a mailer producing links below `base_url`.
    pub fn new(
        codec: ConfirmationCodec,
        transport: Arc<dyn MailTransport>,
        template: Arc<dyn MailTemplate>,
        base_url: Url,
    ) -> Self {
        Self {
            codec,
            transport,
            template,
            base_url,
        }
    }

    /// Returns the codec.
    pub fn codec(&self) -> &ConfirmationCodec {
        &self.codec
    }

    /// Builds the confirmation URL for `email` and `payload`, bound to
    /// `account` when given.
    pub fn url(
        &self,
        email: &str,
        account: Option<&User>,
        payload: &str,
    ) -> Result<Url, ConfirmError> {
        // Signed data: `uid:stamp:payload`, both empty for unbound links.
        let data = match account.map(AccountBinding::of) {
            Some(binding) => format!("{}:{}:{payload}", binding.user_id, binding.login_stamp),
            None => format!("::{payload}"),
        };
        confirmation_url(&self.base_url, &self.codec.encode(email, &data))
    }

    /// Mails a fresh link to `email` and returns it.
    pub async fn send(
        &self,
        email: &str,
        account: Option<&User>,
        payload: &str,
    ) -> Result<Url, ConfirmError> {
        let url = self.url(email, account, payload)?;
        let message = self.template.render(&url, email);
        self.transport.send(&message).await?;
        debug!(salt = self.codec.salt(), bound = account.is_some(), "Confirmation link sent");
        Ok(url)
    }

    /// Decodes a code taken from a link.
    pub fn decode(&self, code: &str, max_age: u64) -> Result<ConfirmedLink, ConfirmError> {
        let ConfirmationPayload { email, payload } = self.codec.decode(code, max_age)?;

        let mut parts = payload.splitn(3, ':');
        let (Some(uid), Some(stamp), Some(payload)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ConfirmError::Malformed);
        };

        let account = match (uid, stamp) {
            ("", "") => None,
            (uid, stamp) if !stamp.is_empty() => Some(AccountBinding {
                user_id: uid.parse().map_err(|_| ConfirmError::Malformed)?,
                login_stamp: stamp.to_string(),
            }),
            _ => return Err(ConfirmError::Malformed),
        };

        Ok(ConfirmedLink {
            email,
            account,
            payload: payload.to_string(),
        })
    }
}

impl std::fmt::Debug for LinkMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkMailer")
            .field("codec", &self.codec)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Result of a confirmed link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Login context of the confirmed user.
    pub context: AuthContext,
    /// The user, after the login was recorded.
    pub user: User,
    /// Payload carried by the link, e.g. the page to continue on.
    pub payload: String,
}

/// Records the login and returns the stored user with it.
async fn finish_login(
    backend: &EmailBackend,
    user: User,
    method: AuthMethod,
    new_user: bool,
    payload: String,
) -> Result<Registration, AuthError> {
    let context = backend.login(user, method).await?.as_new_user(new_user);
    let user = backend
        .store()
        .get(context.user_id)
        .await?
        .ok_or_else(|| AuthError::Storage(format!("user {} vanished", context.user_id)))?;

    Ok(Registration {
        context,
        user,
        payload,
    })
}

/// Registration by email link.
#[derive(Debug, Clone)]
pub struct EmailRegistration {
    mailer: LinkMailer,
    backend: EmailBackend,
    max_age: u64,
    default_role: String,
}

impl EmailRegistration {
    /// Creates the flow with the one-hour link lifetime. New accounts get
    /// the registry's default role.
    pub fn new(mailer: LinkMailer, store: Arc<dyn UserStore>, roles: &RoleRegistry) -> Self {
        Self {
            mailer,
            backend: EmailBackend::new(store),
            max_age: REGISTRATION_MAX_AGE,
            default_role: roles.default_key().to_string(),
        }
    }

    /// Overrides the link lifetime in seconds.
    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Link lifetime in seconds.
    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    /// Sends a registration link to `email`.
    ///
    /// `current_user` is the signed-in user, if any; they may only request a
    /// link for their own address.
    pub async fn request(
        &self,
        email: &str,
        current_user: Option<&User>,
        payload: &str,
    ) -> Result<Url, AuthError> {
        let email = normalize_email(email)?;

        if let Some(current) = current_user {
            if current.email != email {
                return Err(AuthError::EmailMismatch {
                    input: email,
                    current: current.email.clone(),
                });
            }
        }

        let existing = self.backend.store().find_by_email(&email).await?;
        if existing.as_ref().is_some_and(|user| !user.is_active) {
            return Err(AuthError::InactiveAccount);
        }

        Ok(self.mailer.send(&email, existing.as_ref(), payload).await?)
    }

    /// Confirms a registration code and logs its user in, creating the
    /// account on first use.
    pub async fn confirm(&self, code: &str) -> Result<Registration, AuthError> {
        let ConfirmedLink {
            email,
            account,
            payload,
        } = self.mailer.decode(code, self.max_age)?;
        let store = self.backend.store();

        let (user, new_user) = match account {
            Some(binding) => {
                let user = store
                    .get(binding.user_id)
                    .await?
                    .ok_or(AuthError::UnknownLinkAccount)?;
                binding.verify(&user)?;
                (user, false)
            }
            None => match store.find_by_email(&email).await? {
                // Created by this link, which has been followed already.
                Some(user) if user.last_login.is_some() => return Err(AuthError::LinkUsed),
                Some(user) => (user, false),
                None => {
                    let user = store
                        .create(NewUser::new(email.as_str(), self.default_role.as_str()))
                        .await?;
                    info!(user_id = user.id, role = %user.role, "Registered user");
                    (user, true)
                }
            },
        };

        if !user.is_active {
            return Err(AuthError::NoActiveUser(email));
        }

        let method = AuthMethod::EmailRegistration;
        finish_login(&self.backend, user, method, new_user, payload).await
    }
}

/// Passwordless sign-in for existing accounts.
///
/// Links are signed under [`MAGIC_LINK_SALT`](gatehouse_confirm::MAGIC_LINK_SALT),
/// so registration codes are never accepted here.
#[derive(Debug, Clone)]
pub struct MagicLink {
    mailer: LinkMailer,
    backend: EmailBackend,
    max_age: u64,
}

impl MagicLink {
    /// Creates the flow with the three-hour link lifetime.
    pub fn new(
        secret: &SecretKey,
        transport: Arc<dyn MailTransport>,
        template: Arc<dyn MailTemplate>,
        base_url: Url,
        store: Arc<dyn UserStore>,
    ) -> Result<Self, AuthError> {
        let codec = ConfirmationCodec::magic_link(secret)?;
        Ok(Self {
            mailer: LinkMailer::new(codec, transport, template, base_url),
            backend: EmailBackend::new(store),
            max_age: MAGIC_LINK_MAX_AGE,
        })
    }

    /// Overrides the link lifetime in seconds.
    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Returns the mailer minting the sign-in links.
    pub fn mailer(&self) -> &LinkMailer {
        &self.mailer
    }

    /// Mails a sign-in link if `email` belongs to an active user.
    ///
    /// Returns `None` without sending anything otherwise, so the caller can
    /// show the same confirmation page either way.
    pub async fn request(&self, email: &str, payload: &str) -> Result<Option<Url>, AuthError> {
        let email = normalize_email(email)?;
        match self.backend.authenticate_email(&email).await {
            Ok(user) => Ok(Some(self.mailer.send(&user.email, Some(&user), payload).await?)),
            Err(AuthError::InvalidCredentials) => {
                debug!("Magic link requested for unknown or inactive account");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Confirms a sign-in code.
    pub async fn confirm(&self, code: &str) -> Result<Registration, AuthError> {
        let ConfirmedLink {
            email,
            account,
            payload,
        } = self.mailer.decode(code, self.max_age)?;

        let Some(binding) = account else {
            return Err(AuthError::NoActiveUser(email));
        };
        let user = match self.backend.store().get(binding.user_id).await? {
            Some(user) if user.is_active => user,
            _ => return Err(AuthError::NoActiveUser(email)),
        };
        binding.verify(&user)?;

        finish_login(&self.backend, user, AuthMethod::MagicLink, false, payload).await
    }
}
