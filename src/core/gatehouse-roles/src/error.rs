//! Role configuration error types.

use thiserror::Error;

/// Errors raised while building a role registry.
///
/// Authorization checks themselves never fail; they return `false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RolesError {
    /// The registry would contain no role at all.
    #[error("at least one role must be configured")]
    EmptyRegistry,

    /// The same role key appears twice.
    #[error("duplicate role: {0}")]
    DuplicateRole(String),

    /// A role references a callback nobody registered.
    #[error("role '{role}' references unknown callback '{name}'")]
    UnknownCallback {
        /// Role key.
        role: String,
        /// Callback name.
        name: String,
    },

    /// Callback arguments could not be interpreted.
    #[error("invalid arguments for callback '{name}': {reason}")]
    InvalidCallbackArgs {
        /// Callback name.
        name: String,
        /// What was wrong.
        reason: String,
    },
}
