//! Domain errors for the medic scheduling and recovery engine.

use thiserror::Error;

/// Format a list of work item ids as a human-readable string: `A, B, C`.
fn format_item_ids(ids: &[String]) -> String {
    ids.join(", ")
}

/// Domain-level errors that can occur in the engine.
///
/// Most public operations report expected failures through outcome types
/// (`TriggerOutcome`, `FailureReason`, `RunSummary`); these errors cover
/// misuse and strict-mode planning.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Work item dependency cycle detected among: {}", format_item_ids(.0))]
    DependencyCycle(Vec<String>),

    #[error("Duplicate work item id: {0}")]
    DuplicateWorkItem(String),

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    #[error("Recovery session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Collaborator {collaborator} failed: {message}")]
    CollaboratorFailed { collaborator: String, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl DomainError {
    /// Shorthand for a collaborator failure.
    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CollaboratorFailed {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for DomainError {
    fn from(err: serde_yaml::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
