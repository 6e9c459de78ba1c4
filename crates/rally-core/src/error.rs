//! Error types for rally-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using rally-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rally-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or inconsistent remote credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote store error
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Cached snapshot could not be decoded
    #[error("Malformed cache entry '{key}': {reason}")]
    MalformedCache { key: String, reason: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
