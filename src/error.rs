//! Error types for the hub.

use thiserror::Error;

/// Main error type for hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Alias is missing")]
    MissingAlias,

    #[error("Table is missing")]
    MissingTable,

    #[error("Symbol is missing")]
    MissingSymbol,

    #[error("Column is missing")]
    MissingColumn,

    #[error("Wildcard subscription on table {0} requires a slot id")]
    MissingSlot(String),

    #[error("Slot id is not a sequence of digits: {0}")]
    MalformedSlot(String),

    #[error("Invalid history offset: {0} (expected 0 or a negative integer)")]
    InvalidHistoryOffset(String),

    #[error("Malformed batch for table {table}: {reason}")]
    MalformedBatch { table: String, reason: String },

    #[error("Alias was disconnected: {0}")]
    AliasClosed(String),

    #[error("Unknown param: {0}")]
    UnknownParameter(String),

    #[error("Invalid value for {param}: {value}")]
    InvalidParameter { param: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for HubError {
    fn from(e: serde_json::Error) -> Self {
        HubError::Config(e.to_string())
    }
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
