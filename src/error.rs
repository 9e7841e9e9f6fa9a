//! Error types for the qstage configuration staging engine.

use thiserror::Error;

/// Malformed capacity text. Recoverable; surfaced as a field-level message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapacityParseError {
    #[error("Capacity value is empty")]
    Empty,

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Malformed resource entry '{0}' (expected name=value)")]
    MalformedEntry(String),

    #[error("Resource vector '{0}' has no entries")]
    EmptyVector(String),

    #[error("Resource '{0}' appears more than once")]
    DuplicateResource(String),

    #[error("Unrecognized capacity expression '{0}'")]
    Unrecognized(String),
}

/// Contract violations of the configuration manager. The failing operation is
/// aborted and the tree is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Queue already exists: {0}")]
    QueueExists(String),

    #[error("Parent queue of {0} does not exist")]
    ParentMissing(String),

    #[error("Parent queue of {0} is staged for deletion")]
    ParentDeleted(String),

    #[error("Queue {path} has descendants not staged for deletion: {}", .descendants.join(", "))]
    LiveDescendants {
        path: String,
        descendants: Vec<String>,
    },

    #[error("Queue {0} is staged for deletion")]
    QueueDeleted(String),

    #[error("Queue {0} is a staged addition; discard it instead of deleting")]
    PendingAdd(String),

    #[error("The root queue cannot be added or removed")]
    RootImmutable,

    #[error("Malformed queue path: {0}")]
    MalformedPath(String),

    #[error("Malformed property key: {0}")]
    MalformedKey(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Top-level errors for the library surface and CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Capacity parse error: {0}")]
    Parse(#[from] CapacityParseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid snapshot: {0}")]
    Snapshot(String),

    #[error("Change #{index} failed: {source}")]
    ChangeScript {
        index: usize,
        #[source]
        source: StructuralError,
    },

    #[error("Validation failed with {0} error(s)")]
    ValidationFailed(usize),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
