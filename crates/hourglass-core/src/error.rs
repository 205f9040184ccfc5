//! Core error types for hourglass-core.
//!
//! Local failures (store, configuration, validation) are modelled here and
//! propagated to callers. Remote mirror failures live in
//! [`crate::sync::SyncError`] and never reach the entry mutation API.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for hourglass-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Remote failure from an explicitly requested remote operation
    /// (provisioning, database discovery). Automatic syncs never return it.
    #[error("Remote error: {0}")]
    Remote(#[from] crate::sync::SyncError),
}

impl CoreError {
    pub fn entry_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: "Time entry",
            id: id.into(),
        }
    }

    pub fn project_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: "Project",
            id: id.into(),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A uniqueness constraint was violated
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The shared connection mutex was poisoned by a panicking holder
    #[error("Database handle poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Integration is not configured
    #[error("{0} is not configured")]
    NotConfigured(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end_time ({end}) must not be earlier than start_time ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::ConstraintViolation => {
                    DatabaseError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
                }
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
