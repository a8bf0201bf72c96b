//! Common error types for LAPJU

use thiserror::Error;

/// Common result type for LAPJU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the LAPJU tools
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested project/task/template not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input, reported with the offending field
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Weight normalization requires at least one leaf task
    #[error("No leaf tasks to normalize")]
    NoLeafTasks,

    /// Weight normalization is undefined when the current sum is zero
    #[error("Leaf weights sum to zero, scaling is undefined")]
    ZeroWeightSum,

    /// Parent-link cycle encountered while walking toward the root
    #[error("Parent cycle detected at node {0}")]
    CycleDetected(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a field-level validation error
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
