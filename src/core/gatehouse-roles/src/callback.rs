//! Role callbacks.
//!
//! A callback decides whether a user holding a role may exercise a
//! permission. Callbacks return a three-valued [`Decision`] so that an
//! explicit veto can be told apart from "nothing matched".

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::CallbackConfig;
use crate::error::RolesError;
use crate::evaluator::RoleHolder;
use crate::glob::GlobPattern;

/// Outcome of a single callback evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Explicitly granted.
    Allow,
    /// Explicitly vetoed; overrides any allow.
    Deny,
    /// No rule applied; treated as not granted.
    NoOpinion,
}

impl Decision {
    /// Whether this decision grants the permission.
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Authorization strategy attached to a role.
///
/// Implementations must be cheap to call and free of side effects; they run
/// on every permission check that is not served from a request cache.
pub trait RoleCallback: Send + Sync {
    /// Decides `perm` (optionally on `obj`) for `user`.
    fn check(&self, user: &dyn RoleHolder, perm: &str, obj: Option<&dyn Any>) -> Decision;
}

impl<F> RoleCallback for F
where
    F: Fn(&dyn RoleHolder, &str, Option<&dyn Any>) -> Decision + Send + Sync,
{
    fn check(&self, user: &dyn RoleHolder, perm: &str, obj: Option<&dyn Any>) -> Decision {
        self(user, perm, obj)
    }
}

/// Evaluates `permission` against deny globs first, then allow globs.
///
/// Any deny match yields [`Decision::Deny`] without looking at the allow
/// list. Otherwise the result is [`Decision::Allow`] if an allow glob
/// matches and [`Decision::NoOpinion`] if none does.
pub fn evaluate(permission: &str, allow: &[GlobPattern], deny: &[GlobPattern]) -> Decision {
    if deny.iter().any(|rule| rule.matches(permission)) {
        return Decision::Deny;
    }
    if allow.iter().any(|rule| rule.matches(permission)) {
        Decision::Allow
    } else {
        Decision::NoOpinion
    }
}

/// Built-in callback granting permissions by allow/deny glob lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowDenyGlobs {
    allow: Vec<GlobPattern>,
    deny: Vec<GlobPattern>,
}

impl AllowDenyGlobs {
    /// Name under which the callback is registered in [`CallbackFactory`].
    pub const NAME: &'static str = "allow_deny_globs";

    /// Creates the callback from allow and deny patterns.
    pub fn new<A, D>(allow: A, deny: D) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            allow: allow.into_iter().map(|p| GlobPattern::new(p.as_ref())).collect(),
            deny: deny.into_iter().map(|p| GlobPattern::new(p.as_ref())).collect(),
        }
    }

    /// Decides `permission` without a user.
    pub fn evaluate(&self, permission: &str) -> Decision {
        evaluate(permission, &self.allow, &self.deny)
    }

    fn from_args(args: &HashMap<String, Value>) -> Result<Self, RolesError> {
        for key in args.keys() {
            if key != "allow" && key != "deny" {
                return Err(invalid_args(format!("unexpected argument '{key}'")));
            }
        }
        Ok(Self::new(
            string_list(args, "allow")?,
            string_list(args, "deny")?,
        ))
    }
}

impl RoleCallback for AllowDenyGlobs {
    fn check(&self, _user: &dyn RoleHolder, perm: &str, _obj: Option<&dyn Any>) -> Decision {
        self.evaluate(perm)
    }
}

fn invalid_args(reason: String) -> RolesError {
    RolesError::InvalidCallbackArgs {
        name: AllowDenyGlobs::NAME.to_string(),
        reason,
    }
}

fn string_list(args: &HashMap<String, Value>, key: &str) -> Result<Vec<String>, RolesError> {
    let Some(value) = args.get(key) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| invalid_args(format!("'{key}' must be a list of strings")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid_args(format!("'{key}' must be a list of strings")))
        })
        .collect()
}

/// Turns bound configuration arguments into a callback.
pub type CallbackBuilder =
    Arc<dyn Fn(&HashMap<String, Value>) -> Result<Arc<dyn RoleCallback>, RolesError> + Send + Sync>;

/// Named callback constructors, used to resolve callbacks referenced from
/// configuration.
#[derive(Clone, Default)]
pub struct CallbackFactory {
    builders: HashMap<String, CallbackBuilder>,
}

impl CallbackFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with the built-in callbacks registered.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register(AllowDenyGlobs::NAME, |args| {
            Ok(Arc::new(AllowDenyGlobs::from_args(args)?) as Arc<dyn RoleCallback>)
        });
        factory
    }

    /// Registers a constructor under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(&HashMap<String, Value>) -> Result<Arc<dyn RoleCallback>, RolesError>
            + Send
            + Sync
            + 'static,
    {
        self.builders.insert(name.into(), Arc::new(builder));
    }

    /// Whether a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Builds the callback described by `config` for role `role`.
    pub fn build(
        &self,
        role: &str,
        config: &CallbackConfig,
    ) -> Result<Arc<dyn RoleCallback>, RolesError> {
        let builder = self
            .builders
            .get(&config.name)
            .ok_or_else(|| RolesError::UnknownCallback {
                role: role.to_string(),
                name: config.name.clone(),
            })?;
        builder(&config.args)
    }
}

impl std::fmt::Debug for CallbackFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CallbackFactory")
            .field("callbacks", &names)
            .finish()
    }
}
