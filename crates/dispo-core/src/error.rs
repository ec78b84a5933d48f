//! Error types for dispo-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using dispo-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dispo-core operations
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

    /// Record not found
    #[error("Disposition not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required form fields are missing
    #[error("Missing required fields: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    /// Optimistic concurrency check kept failing
    #[error("Storage slot '{0}' was modified concurrently; giving up after retries")]
    Conflict(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote endpoint error
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
