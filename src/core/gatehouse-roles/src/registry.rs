//! Role registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::callback::{CallbackFactory, RoleCallback};
use crate::config::RoleConfig;
use crate::error::RolesError;

/// Key of the role used when nothing is configured.
pub const DEFAULT_ROLE: &str = "default";

/// A resolved role.
#[derive(Clone)]
pub struct RoleEntry {
    key: String,
    title: String,
    callback: Option<Arc<dyn RoleCallback>>,
}

impl RoleEntry {
    /// Creates a role without a callback.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            callback: None,
        }
    }

    /// Attaches an authorization callback.
    pub fn with_callback(mut self, callback: impl RoleCallback + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Attaches an already shared authorization callback.
    pub fn with_shared_callback(mut self, callback: Arc<dyn RoleCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Role key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Authorization callback, if any.
    pub fn callback(&self) -> Option<&dyn RoleCallback> {
        self.callback.as_deref()
    }
}

impl std::fmt::Debug for RoleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleEntry")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Immutable, ordered set of roles.
///
/// Built once at startup and shared read-only between request handlers.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: Vec<RoleEntry>,
    index: HashMap<String, usize>,
}

impl RoleRegistry {
    /// Creates a registry from roles in display order.
    ///
    /// # Errors
    ///
    /// Fails on an empty list or duplicate keys.
    pub fn new(roles: Vec<RoleEntry>) -> Result<Self, RolesError> {
        if roles.is_empty() {
            return Err(RolesError::EmptyRegistry);
        }

        let mut index = HashMap::with_capacity(roles.len());
        for (position, role) in roles.iter().enumerate() {
            if index.insert(role.key.clone(), position).is_some() {
                return Err(RolesError::DuplicateRole(role.key.clone()));
            }
        }

        Ok(Self { roles, index })
    }

    /// Builds the registry from configuration.
    ///
    /// An empty configuration yields the [default registry](Self::default).
    pub fn from_config(
        configs: &[RoleConfig],
        factory: &CallbackFactory,
    ) -> Result<Self, RolesError> {
        if configs.is_empty() {
            return Ok(Self::default());
        }

        let roles = configs
            .iter()
            .map(|config| {
                let entry = RoleEntry::new(&config.key, config.display_title());
                match &config.callback {
                    Some(callback) => Ok(entry
                        .with_shared_callback(factory.build(&config.key, callback)?)),
                    None => Ok(entry),
                }
            })
            .collect::<Result<Vec<_>, RolesError>>()?;

        let registry = Self::new(roles)?;
        debug!(roles = ?registry.keys().collect::<Vec<_>>(), "Role registry loaded");
        Ok(registry)
    }

    /// Roles in configuration order.
    pub fn roles(&self) -> impl Iterator<Item = &RoleEntry> {
        self.roles.iter()
    }

    /// Role keys in configuration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|role| role.key.as_str())
    }

    /// `(key, title)` pairs for a role selection field.
    pub fn choices(&self) -> Vec<(&str, &str)> {
        self.roles
            .iter()
            .map(|role| (role.key.as_str(), role.title.as_str()))
            .collect()
    }

    /// Key assigned to users without an explicit role.
    pub fn default_key(&self) -> &str {
        // `new` guarantees at least one role.
        &self.roles[0].key
    }

    /// Looks up a role by key.
    pub fn resolve(&self, key: &str) -> Option<&RoleEntry> {
        self.index.get(key).map(|&position| &self.roles[position])
    }

    /// Whether there is nothing to choose, so a role selector can be hidden.
    pub fn is_single_choice(&self) -> bool {
        self.roles.len() <= 1
    }

    /// Number of roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Always `false`; a registry holds at least one role.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl Default for RoleRegistry {
    /// A single `"default"` role without a callback, which grants nothing.
    fn default() -> Self {
        let role = RoleEntry::new(DEFAULT_ROLE, DEFAULT_ROLE);
        Self {
            index: HashMap::from([(role.key.clone(), 0)]),
            roles: vec![role],
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::callback::AllowDenyGlobs;
    use crate::config::CallbackConfig;

    #[test]
    fn test_default_registry() {
        let registry = RoleRegistry::default();

        assert_eq!(registry.default_key(), DEFAULT_ROLE);
        assert_eq!(registry.choices(), vec![("default", "default")]);
        assert!(registry.is_single_choice());
        assert!(registry.resolve("default").unwrap().callback().is_none());
        assert!(registry.resolve("staff").is_none());
    }

    #[test]
    fn test_empty_config_falls_back_to_default() {
        let registry = RoleRegistry::from_config(&[], &CallbackFactory::with_builtins()).unwrap();
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["default"]);
    }

    #[test]
    fn test_order_is_kept() {
        let registry = RoleRegistry::new(vec![
            RoleEntry::new("editor", "Editor"),
            RoleEntry::new("default", "default"),
            RoleEntry::new("auditor", "Auditor").with_callback(AllowDenyGlobs::new(["*.view_*"], [""; 0])),
        ])
        .unwrap();

        assert_eq!(registry.default_key(), "editor");
        assert_eq!(
            registry.choices(),
            vec![("editor", "Editor"), ("default", "default"), ("auditor", "Auditor")]
        );
        assert!(!registry.is_single_choice());
        assert!(registry.resolve("auditor").unwrap().callback().is_some());
    }

    #[test]
    fn test_duplicate_and_empty() {
        assert_eq!(
            RoleRegistry::new(vec![RoleEntry::new("a", "A"), RoleEntry::new("a", "B")]).err(),
            Some(RolesError::DuplicateRole("a".to_string()))
        );
        assert_eq!(RoleRegistry::new(vec![]).err(), Some(RolesError::EmptyRegistry));
    }

    #[test]
    fn test_from_config_unknown_callback() {
        let configs = vec![RoleConfig {
            key: "staff".to_string(),
            title: None,
            callback: Some(CallbackConfig {
                name: "nope".to_string(),
                args: HashMap::new(),
            }),
        }];

        assert!(matches!(
            RoleRegistry::from_config(&configs, &CallbackFactory::with_builtins()),
            Err(RolesError::UnknownCallback { .. })
        ));
    }
}
