//! # Gatehouse Roles
//!
//! Role-based authorization driven by configuration.
//!
//! ## Model
//!
//! - A [`RoleRegistry`] maps role keys to a display title and an optional
//!   [`RoleCallback`]. It is built once at startup and shared read-only.
//! - Users expose their role key through [`RoleHolder`].
//! - [`has_permission`] resolves the role and asks its callback for a
//!   [`Decision`]. Inactive users, unknown roles and roles without a
//!   callback are denied.
//! - [`AllowDenyGlobs`] is the built-in callback: deny globs are checked
//!   first and always win over allow globs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod callback;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod glob;
pub mod registry;

pub use callback::{AllowDenyGlobs, CallbackFactory, Decision, RoleCallback};
pub use config::{CallbackConfig, RoleConfig};
pub use error::RolesError;
pub use evaluator::{has_perm, has_permission, role_decision, PermissionScope, RoleHolder};
pub use glob::{fnmatch, GlobPattern};
pub use registry::{RoleEntry, RoleRegistry, DEFAULT_ROLE};
