//! Error types for Sheetwatch

use thiserror::Error;

/// Result type alias using Sheetwatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Sheetwatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, fatal at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested worksheet does not exist
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// A cell range could not be fetched
    #[error("Failed to fetch range {range} from '{source_name}': {reason}")]
    RangeFetch {
        source_name: String,
        range: String,
        reason: String,
    },

    /// The notification ledger could not be read or written
    #[error("Notification ledger unavailable: {0}")]
    StoreUnavailable(String),

    /// The alert channel rejected or failed to deliver a message
    #[error("Alert dispatch failed: {0}")]
    Dispatch(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a range fetch error
    pub fn range_fetch(
        source_name: impl Into<String>,
        range: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::RangeFetch {
            source_name: source_name.into(),
            range: range.into(),
            reason: reason.into(),
        }
    }

    /// Create a ledger error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a dispatch error
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }
}
