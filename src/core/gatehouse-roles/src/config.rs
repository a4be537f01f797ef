//! Role configuration.
//!
//! Roles are plain data so hosts can add new ones from their configuration
//! file:
//!
//! ```toml
//! [[roles]]
//! key = "default"
//! title = "default"
//!
//! [[roles]]
//! key = "deny_accounts"
//! title = "deny accounts"
//!
//! [roles.callback]
//! name = "allow_deny_globs"
//! allow = ["*"]
//! deny = ["auth.*", "accounts.*"]
//! ```
//!
//! The order of `[[roles]]` entries is kept; the first one is the default
//! role for new users.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One configured role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role key stored on user records.
    pub key: String,
    /// Human-readable title. Defaults to the key.
    #[serde(default)]
    pub title: Option<String>,
    /// Authorization callback; without one the role grants nothing.
    #[serde(default)]
    pub callback: Option<CallbackConfig>,
}

impl RoleConfig {
    /// Title to display, falling back to the key.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.key)
    }
}

/// Reference to a named callback plus the arguments bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackConfig {
    /// Name registered in the [`CallbackFactory`](crate::CallbackFactory).
    pub name: String,
    /// Remaining keys, passed to the callback constructor.
    #[serde(flatten)]
    pub args: HashMap<String, Value>,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct File {
        roles: Vec<RoleConfig>,
    }

    #[test]
    fn test_parse_toml_roles() {
        let file: File = toml::from_str(
            r#"
            [[roles]]
            key = "default"

            [[roles]]
            key = "deny_accounts"
            title = "deny accounts"

            [roles.callback]
            name = "allow_deny_globs"
            allow = ["*"]
            deny = ["auth.*", "accounts.*"]
            "#,
        )
        .unwrap();

        assert_eq!(file.roles.len(), 2);
        assert_eq!(file.roles[0].display_title(), "default");
        assert!(file.roles[0].callback.is_none());

        let callback = file.roles[1].callback.as_ref().unwrap();
        assert_eq!(callback.name, "allow_deny_globs");
        assert_eq!(callback.args["allow"], serde_json::json!(["*"]));
        assert_eq!(callback.args["deny"], serde_json::json!(["auth.*", "accounts.*"]));
    }
}
