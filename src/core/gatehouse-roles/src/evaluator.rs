//! Permission evaluation.
//!
//! Evaluation order:
//! 1. Inactive users are denied
//! 2. Unknown roles and roles without a callback are denied
//! 3. The role callback decides; only [`Decision::Allow`] grants
//!
//! Nothing here returns an error: every failure mode is a plain `false`.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::callback::Decision;
use crate::registry::RoleRegistry;

/// A user record as seen by the permission evaluator.
pub trait RoleHolder {
    /// Key of the role assigned to this user.
    fn authorization_role(&self) -> &str;

    /// Whether the account is active.
    fn is_active(&self) -> bool;

    /// Whether the account bypasses role checks entirely.
    fn is_superuser(&self) -> bool {
        false
    }
}

/// Asks the user's role whether `perm` is granted.
pub fn role_decision(
    registry: &RoleRegistry,
    user: &dyn RoleHolder,
    perm: &str,
    obj: Option<&dyn Any>,
) -> Decision {
    if !user.is_active() {
        debug!(perm, "Inactive user denied");
        return Decision::Deny;
    }

    let role = user.authorization_role();
    let Some(entry) = registry.resolve(role) else {
        debug!(role, perm, "Unknown role denied");
        return Decision::NoOpinion;
    };
    let Some(callback) = entry.callback() else {
        return Decision::NoOpinion;
    };

    let decision = callback.check(user, perm, obj);
    debug!(role, perm, ?decision, "Role callback evaluated");
    decision
}

/// Whether the user's role grants `perm`, optionally on `obj`.
pub fn has_permission(
    registry: &RoleRegistry,
    user: &dyn RoleHolder,
    perm: &str,
    obj: Option<&dyn Any>,
) -> bool {
    role_decision(registry, user, perm, obj).is_allowed()
}

/// Host-level check: active superusers hold every permission, everyone
/// else goes through their role.
pub fn has_perm(
    registry: &RoleRegistry,
    user: &dyn RoleHolder,
    perm: &str,
    obj: Option<&dyn Any>,
) -> bool {
    if user.is_active() && user.is_superuser() {
        return true;
    }
    has_permission(registry, user, perm, obj)
}

/// Permission checks for one user during one request.
///
/// Object-less decisions are memoized for the lifetime of the scope. Create
/// a new scope per request; the cache is never shared between scopes.
pub struct PermissionScope<'a> {
    registry: &'a RoleRegistry,
    user: &'a dyn RoleHolder,
    cache: RefCell<HashMap<String, bool>>,
}

impl<'a> PermissionScope<'a> {
    /// Starts an empty scope for `user`.
    pub fn new(registry: &'a RoleRegistry, user: &'a dyn RoleHolder) -> Self {
        Self {
            registry,
            user,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Whether the user holds `perm`; cached.
    pub fn has_perm(&self, perm: &str) -> bool {
        if let Some(&granted) = self.cache.borrow().get(perm) {
            return granted;
        }
        let granted = has_perm(self.registry, self.user, perm, None);
        self.cache.borrow_mut().insert(perm.to_string(), granted);
        granted
    }

    /// Whether the user holds `perm` on `obj`; never cached.
    pub fn has_perm_for(&self, perm: &str, obj: &dyn Any) -> bool {
        has_perm(self.registry, self.user, perm, Some(obj))
    }

    /// Whether the user holds every permission in `perms`.
    pub fn has_perms<I, S>(&self, perms: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        perms.into_iter().all(|perm| self.has_perm(perm.as_ref()))
    }

    /// The subset of `catalog` granted to the user.
    pub fn all_permissions<I, S>(&self, catalog: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        catalog
            .into_iter()
            .filter(|perm| self.has_perm(perm.as_ref()))
            .map(|perm| perm.as_ref().to_string())
            .collect()
    }

    /// Number of memoized decisions.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}
