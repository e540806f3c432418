//! Crate error type.
//!
//! Configuration problems are fatal and surface before any model is built.
//! An infeasible solve is *not* an error; see [`SolveStatus`](crate::models::SolveStatus).

use crate::validation::ValidationError;

/// Errors raised while building, patching, or solving a selection model.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Input or parameter problems detected at build time.
    #[error("configuration error: {}", join_messages(.0))]
    Configuration(Vec<ValidationError>),

    /// Parameters could not be parsed.
    #[error("invalid scheduling parameters: {0}")]
    InvalidParams(#[from] serde_json::Error),

    /// The solver backend failed (numerical trouble, resource exhaustion, ...).
    #[error("solver backend failure: {0}")]
    Backend(String),

    /// A driver operation was called out of order.
    #[error("cannot {action} while scheduler is {state}")]
    InvalidState {
        /// Current driver state.
        state: String,
        /// Attempted operation.
        action: &'static str,
    },
}

impl From<Vec<ValidationError>> for ScheduleError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Configuration(errors)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScheduleError>;
