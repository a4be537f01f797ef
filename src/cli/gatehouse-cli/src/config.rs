//! Configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use gatehouse_confirm::{REGISTRATION_MAX_AGE, REGISTRATION_SALT};
use gatehouse_roles::RoleConfig;

/// Top-level `gatehouse.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Signing secret; `--secret-key` takes precedence.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Confirmation link settings.
    #[serde(default)]
    pub links: LinkConfig,

    /// Roles in display order.
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
}

/// `[links]` table.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Base URL links are built under, e.g. `https://example.com/email/`.
    pub base_url: Option<String>,
    /// Signing namespace.
    pub salt: String,
    /// Lifetime in seconds.
    pub max_age: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            salt: REGISTRATION_SALT.to_string(),
            max_age: REGISTRATION_MAX_AGE,
        }
    }
}

impl LinkConfig {
    /// Parsed base URL, if configured.
    pub fn base_url(&self) -> Result<Option<Url>> {
        self.base_url
            .as_deref()
            .map(|raw| Url::parse(raw).with_context(|| format!("Invalid links.base_url: {raw}")))
            .transpose()
    }
}

impl AppConfig {
    /// Loads `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parses TOML text.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
