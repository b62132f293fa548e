/// Error types for quick-term
///
/// This module defines the errors that can escape a public entry point.
/// Resolution problems are not errors: they are reported as
/// `ResolutionWarning`s next to the resolved text.

use thiserror::Error;

/// Main error type for quick-term operations
#[derive(Error, Debug)]
pub enum QuickTermError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Malformed command input (neither a command nor a rule list)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// History could not be loaded or saved
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A user supplied pattern could not be compiled
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for quick-term operations
pub type Result<T> = std::result::Result<T, QuickTermError>;

/// Convert QuickTermError to a user-friendly error message
impl QuickTermError {
    pub fn user_message(&self) -> String {
        match self {
            QuickTermError::Database(e) => {
                format!("History database error. Commands still run, but won't be remembered. Details: {}", e)
            }
            QuickTermError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            QuickTermError::Git(e) => {
                format!("Could not inspect the git repository. Details: {}", e)
            }
            QuickTermError::Configuration(msg) => {
                format!("Invalid command input: {}", msg)
            }
            QuickTermError::Persistence(msg) => {
                format!("History could not be persisted: {}", msg)
            }
            QuickTermError::InvalidPattern(pattern) => {
                format!("Pattern '{}' is not valid", pattern)
            }
            QuickTermError::Serialization(e) => {
                format!("Data format error: {}", e)
            }
        }
    }
}
