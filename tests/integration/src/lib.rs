//! Integration tests for Gatehouse.
//!
//! These tests wire every crate together the way a host application would:
//! a role registry and admin SSO rules loaded from TOML, an in-memory user
//! store, and an outbox standing in for the mail relay.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use gatehouse_auth::{
    AdminSsoGate, EmailBackend, EmailRegistration, InMemoryUserStore, LinkMailer, MagicLink,
    OAuthLogin, SsoRule,
};
use gatehouse_confirm::{
    ConfirmError, ConfirmationCodec, MailMessage, MailTransport, RegistrationTemplate,
};
use gatehouse_crypto::SecretKey;
use gatehouse_roles::{CallbackFactory, RoleConfig, RoleRegistry};

/// Host configuration used by the tests.
pub const TEST_CONFIG: &str = r#"
[[roles]]
key = "default"
title = "Default"
callback = { name = "allow_deny_globs", allow = ["blog.*"] }

[[roles]]
key = "deny_accounts"
title = "All but accounts"
callback = { name = "allow_deny_globs", allow = ["*"], deny = ["auth.*", "admin_sso.*", "accounts.*", "little_auth.*"] }

[[roles]]
key = "readonly"
title = "Read only"

[[admin_sso]]
pattern = "*@staff.example.com"

[[admin_sso]]
pattern = "*@partner.example"
user = "admin@example.com"
"#;

// ============================================================================
// Host Configuration
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
    #[serde(default)]
    pub admin_sso: Vec<SsoRule>,
}

// ============================================================================
// Outbox
// ============================================================================

/// Mail transport keeping every message in memory.
#[derive(Default)]
pub struct Outbox {
    messages: Mutex<Vec<MailMessage>>,
}

impl Outbox {
    pub fn messages(&self) -> Vec<MailMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// The link in the most recent message.
    pub fn last_link(&self) -> Option<Url> {
        let messages = self.messages.lock().unwrap();
        let body = &messages.last()?.body;
        body.lines()
            .map(str::trim)
            .find(|line| line.starts_with("http://") || line.starts_with("https://"))
            .and_then(|line| Url::parse(line).ok())
    }
}

#[async_trait]
impl MailTransport for Outbox {
    async fn send(&self, message: &MailMessage) -> Result<(), ConfirmError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Extracts the code from a confirmation link.
pub fn code_from_link(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

// ============================================================================
// Test Application
// ============================================================================

/// Every flow wired to one store, one outbox and one role registry.
pub struct TestApp {
    pub store: Arc<InMemoryUserStore>,
    pub outbox: Arc<Outbox>,
    pub registry: RoleRegistry,
    pub registration: EmailRegistration,
    pub magic_link: MagicLink,
    pub oauth: OAuthLogin,
    pub admin_sso: AdminSsoGate,
    pub registration_codec: ConfirmationCodec,
    pub magic_link_codec: ConfirmationCodec,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::from_config(TEST_CONFIG)
    }

    pub fn from_config(raw: &str) -> Result<Self> {
        let config: HostConfig = toml::from_str(raw).context("Failed to parse host config")?;
        let registry = RoleRegistry::from_config(&config.roles, &CallbackFactory::with_builtins())?;

        let secret = SecretKey::from_string("integration test secret key")?;
        let registration_codec = ConfirmationCodec::new(&secret)?;
        let magic_link_codec = ConfirmationCodec::magic_link(&secret)?;

        let store = Arc::new(InMemoryUserStore::new());
        let outbox = Arc::new(Outbox::default());
        let base = Url::parse("http://testserver/email/")?;

        let registration = EmailRegistration::new(
            LinkMailer::new(
                registration_codec.clone(),
                outbox.clone(),
                Arc::new(RegistrationTemplate),
                base.clone(),
            ),
            store.clone(),
            &registry,
        );

        let magic_link = MagicLink::new(
            &secret,
            outbox.clone(),
            Arc::new(RegistrationTemplate),
            base.join("magic/")?,
            store.clone(),
        )?;

        let oauth = OAuthLogin::new(store.clone(), &registry);
        let admin_sso = AdminSsoGate::new(config.admin_sso, EmailBackend::new(store.clone()));

        Ok(Self {
            store,
            outbox,
            registry,
            registration,
            magic_link,
            oauth,
            admin_sso,
            registration_codec,
            magic_link_codec,
        })
    }
}

// ============================================================================
// CLI Binary
// ============================================================================

/// Finds the `gatehouse` binary in the target directory, if it was built.
pub fn find_cli_binary() -> Option<PathBuf> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let root = std::path::Path::new(&manifest_dir).join("../..");

    ["target/debug/gatehouse", "target/debug/gatehouse.exe", "target/release/gatehouse", "target/release/gatehouse.exe"]
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|candidate| candidate.exists())
}

/// Runs the CLI and returns its stdout.
pub async fn run_cli(binary: &PathBuf, args: &[&str]) -> Result<String> {
    let output = tokio::process::Command::new(binary)
        .args(args)
        .env_remove("GATEHOUSE_SECRET_KEY")
        .env_remove("GATEHOUSE_CONFIG")
        .output()
        .await
        .with_context(|| format!("Failed to run {}", binary.display()))?;

    if !output.status.success() {
        bail!(
            "gatehouse {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8(output.stdout)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_auth::{AuthError, AuthMethod, NewUser, OAuthUserData, UserStore};
    use gatehouse_confirm::MAGIC_LINK_MAX_AGE;
    use gatehouse_crypto::signer::unix_now;
    use gatehouse_roles::{has_perm, PermissionScope};

    #[tokio::test]
    async fn test_registration_workflow() {
        let app = TestApp::new().unwrap();

        // 1. Request a link
        let url = app
            .registration
            .request("new.user@Example.com", None, "/welcome/")
            .await
            .unwrap();

        let messages = app.outbox.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].subject, "Confirm your email address");
        assert_eq!(messages[0].to, vec!["new.user@example.com".to_string()]);
        assert_eq!(app.outbox.last_link(), Some(url.clone()));

        // 2. Follow it
        let code = code_from_link(&url).unwrap();
        let registration = app.registration.confirm(&code).await.unwrap();
        assert!(registration.context.new_user);
        assert_eq!(registration.payload, "/welcome/");
        assert_eq!(registration.user.email, "new.user@example.com");

        // 3. The new account holds the default role's permissions
        assert_eq!(registration.user.role, "default");
        let scope = PermissionScope::new(&app.registry, &registration.user);
        assert!(scope.has_perm("blog.add_post"));
        assert!(!scope.has_perm("accounts.view_user"));

        // 4. The link works only once
        let err = app.registration.confirm(&code).await.unwrap_err();
        assert_eq!(err.to_string(), "The link has already been used.");
        assert_eq!(err.code(), Some("email_registration_used"));

        // 5. A fresh link logs the existing account in, once
        let url = app
            .registration
            .request("new.user@example.com", None, "")
            .await
            .unwrap();
        let code = code_from_link(&url).unwrap();
        let again = app.registration.confirm(&code).await.unwrap();
        assert!(!again.context.new_user);
        assert_eq!(again.user.id, registration.user.id);
        assert!(matches!(
            app.registration.confirm(&code).await,
            Err(AuthError::LinkUsed)
        ));
    }

    #[tokio::test]
    async fn test_deny_accounts_role() {
        let app = TestApp::new().unwrap();
        let mut user = app
            .store
            .create(NewUser::new("deny@example.com", "deny_accounts").staff())
            .await
            .unwrap();

        let scope = PermissionScope::new(&app.registry, &user);
        assert!(!scope.has_perm("little_auth.change_user"));
        assert!(scope.has_perm("sessions.change_session"));
        assert!(!scope.has_perm("admin_sso.add_config"));
        assert!(scope.has_perm("blog.add_post"));
        assert!(scope.has_perm("anything.at_all"));
        assert!(!scope.has_perm("accounts.view_user"));
        assert!(!scope.has_perm("auth.change_permission"));
        assert!(scope.has_perms(["blog.add_post", "blog.delete_post"]));
        assert!(!scope.has_perms(["blog.add_post", "accounts.view_user"]));

        user.is_superuser = true;
        assert!(has_perm(&app.registry, &user, "accounts.view_user", None));

        user.is_active = false;
        assert!(!has_perm(&app.registry, &user, "blog.add_post", None));
        assert!(!has_perm(&app.registry, &user, "accounts.view_user", None));
    }

    #[tokio::test]
    async fn test_roles_without_callback_grant_nothing() {
        let app = TestApp::new().unwrap();
        let readonly = app
            .store
            .create(NewUser::new("ro@example.com", "readonly"))
            .await
            .unwrap();
        let unknown = app
            .store
            .create(NewUser::new("lost@example.com", "removed_role"))
            .await
            .unwrap();

        for user in [&readonly, &unknown] {
            assert!(!has_perm(&app.registry, user, "blog.view_post", None));
        }
        assert_eq!(
            app.registry.choices(),
            vec![
                ("default", "Default"),
                ("deny_accounts", "All but accounts"),
                ("readonly", "Read only"),
            ]
        );
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_register() {
        let app = TestApp::new().unwrap();
        let mut user = app
            .store
            .create(NewUser::new("gone@example.com", "default"))
            .await
            .unwrap();
        user.is_active = false;
        app.store.update(&user).await.unwrap();

        let err = app
            .registration
            .request("gone@example.com", None, "")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This email address belongs to an inactive account.");
        assert!(app.outbox.messages().is_empty());
    }

    #[tokio::test]
    async fn test_magic_link_workflow() {
        let app = TestApp::new().unwrap();
        let user = app
            .store
            .create(NewUser::new("known@example.com", "default"))
            .await
            .unwrap();

        let url = app
            .magic_link
            .request("known@example.com", "/dashboard/")
            .await
            .unwrap()
            .unwrap();
        assert!(url.as_str().starts_with("http://testserver/email/magic/"));

        let code = code_from_link(&url).unwrap();
        let login = app.magic_link.confirm(&code).await.unwrap();
        assert_eq!(login.user.id, user.id);
        assert_eq!(login.context.auth_method, AuthMethod::MagicLink);
        assert_eq!(login.payload, "/dashboard/");
        assert!(matches!(
            app.magic_link.confirm(&code).await,
            Err(AuthError::LinkUsed)
        ));

        // Registration links do not work as magic links and vice versa
        let err = app.registration.confirm(&code).await.unwrap_err();
        assert!(matches!(err, AuthError::Confirm(ConfirmError::BadSignature)));

        let registration_code = app.registration_codec.encode("known@example.com", "");
        let err = app.magic_link.confirm(&registration_code).await.unwrap_err();
        assert!(matches!(err, AuthError::Confirm(ConfirmError::BadSignature)));
    }

    #[tokio::test]
    async fn test_expired_magic_link() {
        let app = TestApp::new().unwrap();
        app.store
            .create(NewUser::new("known@example.com", "default"))
            .await
            .unwrap();

        let minted_at = unix_now() - MAGIC_LINK_MAX_AGE - 60;
        let code = app
            .magic_link_codec
            .encode_at("known@example.com", "", minted_at);

        let err = app.magic_link.confirm(&code).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "The link is expired. Please request another registration link."
        );
    }

    #[tokio::test]
    async fn test_oauth_workflow() {
        let app = TestApp::new().unwrap();
        let data = OAuthUserData {
            email: Some("oauth.user@example.com".to_string()),
            full_name: Some("OAuth User".to_string()),
        };

        let ctx = app.oauth.complete("google", data.clone()).await.unwrap();
        assert!(ctx.new_user);

        let user = app.store.get(ctx.user_id).await.unwrap().unwrap();
        assert_eq!(user.to_string(), "OAuth User");
        assert!(has_perm(&app.registry, &user, "blog.view_post", None));

        let again = app.oauth.complete("google", data).await.unwrap();
        assert!(!again.new_user);

        let err = app
            .oauth
            .complete("google", OAuthUserData::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingEmail));
    }

    #[tokio::test]
    async fn test_admin_sso() {
        let app = TestApp::new().unwrap();
        app.store
            .create(NewUser::new("admin@example.com", "default").superuser())
            .await
            .unwrap();
        app.store
            .create(NewUser::new("ops@staff.example.com", "default").staff())
            .await
            .unwrap();
        app.store
            .create(NewUser::new("intern@staff.example.com", "default"))
            .await
            .unwrap();

        let ctx = app.admin_sso.authorize(Some("ops@staff.example.com")).await.unwrap();
        assert_eq!(ctx.email, "ops@staff.example.com");
        assert_eq!(ctx.auth_method, AuthMethod::AdminSso);

        let ctx = app.admin_sso.authorize(Some("bob@partner.example")).await.unwrap();
        assert_eq!(ctx.email, "admin@example.com");

        for email in [Some("intern@staff.example.com"), Some("eve@evil.example"), None] {
            assert!(matches!(
                app.admin_sso.authorize(email).await,
                Err(AuthError::AdminSsoRejected)
            ));
        }
    }

    #[tokio::test]
    async fn test_cli_perm_check() {
        let Some(binary) = find_cli_binary() else {
            eprintln!("gatehouse binary not built, skipping");
            return;
        };

        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("gatehouse.toml");
        std::fs::write(&config, TEST_CONFIG).unwrap();
        let config = config.to_str().unwrap();

        let out = run_cli(
            &binary,
            &["--config", config, "perm", "check", "--role", "deny_accounts", "--perm", "accounts.view_user"],
        )
        .await
        .unwrap();
        assert!(out.contains("accounts.view_user: denied"));

        let out = run_cli(
            &binary,
            &["--config", config, "perm", "check", "--role", "deny_accounts", "--perm", "blog.add_post"],
        )
        .await
        .unwrap();
        assert!(out.contains("blog.add_post: granted"));

        let out = run_cli(&binary, &["--config", config, "roles", "list"]).await.unwrap();
        assert!(out.contains("default - Default (default)"));
        assert!(out.contains("readonly - Read only [no callback]"));
    }

    #[tokio::test]
    async fn test_cli_code_roundtrip() {
        let Some(binary) = find_cli_binary() else {
            eprintln!("gatehouse binary not built, skipping");
            return;
        };

        let secret = run_cli(&binary, &["keygen"]).await.unwrap();
        let secret_arg = format!("--secret-key={}", secret.trim());
        let secret = secret_arg.as_str();

        let code = run_cli(
            &binary,
            &[secret, "code", "mint", "--email", "cli@example.com", "--payload", "next"],
        )
        .await
        .unwrap();

        let out = run_cli(&binary, &[secret, "code", "verify", code.trim()])
            .await
            .unwrap();
        assert!(out.contains("Email:   cli@example.com"));
        assert!(out.contains("Payload: next"));

        assert!(run_cli(&binary, &["--secret-key", "another secret value", "code", "verify", code.trim()])
            .await
            .is_err());
    }
}
