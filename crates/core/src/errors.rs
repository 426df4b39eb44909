//! Crate-level error type.
//!
//! Each pipeline stage fails with its own variant so callers can tell a
//! parse miss from a policy denial from a provider failure without string
//! matching.

use thiserror::Error;

use crate::command::{OperationCategory, SafetyMode};
use crate::error_map::ExecutionError;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GateError {
    /// Natural-language input could not be resolved to a command.
    #[error("could not understand request: {message}")]
    Parse { message: String, suggestions: Vec<String> },

    /// The command does not match the service catalog.
    #[error("invalid command: {}", errors.join("; "))]
    Validation {
        errors: Vec<String>,
        missing_required: Vec<String>,
        suggestions: Vec<String>,
    },

    /// Denied by the active safety mode or the blast-radius ceiling.
    #[error("safety policy denied operation: {message}")]
    Safety {
        message: String,
        category: OperationCategory,
        current_mode: SafetyMode,
        suggested_mode: Option<SafetyMode>,
    },

    /// On the denylist. No mode permits it.
    #[error("operation '{operation}' is blocked: {reason}")]
    Blocked { operation: String, reason: String },

    /// Confirmation required but not supplied.
    #[error("operation requires confirmation: {message}")]
    ConfirmationRequired { message: String, double: bool },

    /// The provider call failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The provider call exceeded the request deadline.
    #[error("operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },
}
