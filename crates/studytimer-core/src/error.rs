//! Core error types for studytimer-core.
//!
//! Store failures, reporting failures and illegal lifecycle transitions each
//! get their own enum; `CoreError` wraps them for callers that just want `?`.
//! An active-timer conflict is not an error: it is returned as a regular
//! outcome value by the conflict resolver.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studytimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Progress reporting errors
    #[error("Reporting error: {0}")]
    Reporting(#[from] ReportingError),

    /// Illegal timer lifecycle transitions
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Read failed
    #[error("Failed to read key '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Write or delete failed
    #[error("Failed to write key '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Stored value could not be decoded
    #[error("Corrupt record under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Store is locked by another connection
    #[error("Store is locked")]
    Locked,

    /// Any other SQLite failure not tied to a key (schema setup, connection)
    #[error("SQLite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

/// Errors raised while handing studied minutes to the progress service.
#[derive(Error, Debug)]
pub enum ReportingError {
    /// No bearer token available; reporting is not attempted
    #[error("Not authenticated: no token available")]
    NotAuthenticated,

    /// Token provider itself failed
    #[error("Token lookup failed: {0}")]
    TokenLookup(String),

    /// Transport-level failure
    #[error("Request to progress service failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Progress service returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Base URL or path could not be built
    #[error("Invalid progress endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Illegal transitions of the session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Session is already running")]
    AlreadyRunning,

    #[error("Session is not running")]
    NotRunning,

    #[error("Session has no time left to run")]
    NothingRemaining,

    #[error("Session still has {remaining_secs}s remaining")]
    NotExpired { remaining_secs: u64 },

    #[error("Session already completed")]
    AlreadyCompleted,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StorageError::Locked
            }
            _ => StorageError::Sqlite(err),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
