//! Error types for port operations.

use visualdm_domain::FactionType;

/// Failures of the faction snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Reading or writing the snapshot failed.
    #[error("Snapshot storage failed during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    /// The snapshot could not be encoded or decoded.
    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),
}

impl RepoError {
    pub fn storage(operation: &'static str, message: impl ToString) -> Self {
        Self::Storage {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

/// Errors raised by a consequence system while applying an effect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsequenceError {
    #[error("Faction not found: {0}")]
    FactionNotFound(FactionType),
    #[error("Consequence rejected: {0}")]
    Rejected(String),
}
