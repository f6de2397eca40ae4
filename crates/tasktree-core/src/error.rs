//! Unified error types for tasktree

use thiserror::Error;

/// Unified error type for all tasktree operations
#[derive(Error, Debug)]
pub enum Error {
    // Identifier errors
    #[error("Invalid task id {0:?}: must be at least {1} characters long")]
    InvalidIdentifier(String, usize),

    #[error("Task id already used in this tree: {0}")]
    DuplicateIdentifier(String),

    #[error("Connection copy must target a different id (got {0})")]
    SameIdentifier(String),

    // Connection set errors
    #[error("Not a connection: {0}")]
    NotAConnection(String),

    #[error("Unsupported operand for connection union: {0}")]
    UnsupportedOperand(String),

    #[error("Invalid tag pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    // Tree errors
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("No task tree stored at {0}")]
    TreeNotFound(String),

    #[error("Invalid task status: {0}")]
    InvalidStatus(String),

    #[error("Store is closed: {0}")]
    StoreClosed(String),

    #[error("Unsupported snapshot version: {0}")]
    SnapshotVersion(u32),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using the tasktree Error type.
pub type Result<T> = std::result::Result<T, Error>;
