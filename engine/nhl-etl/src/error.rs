//! Error types for the NHL ETL pipelines

use thiserror::Error;

/// A required field did not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Invalid height format: {value:?} (expected F' I\")")]
    Height { value: String },

    #[error("Invalid time-on-ice format: {value:?} (expected MM:SS)")]
    TimeOnIce { value: String },
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Unable to connect to the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to normalize {entity}: {source}")]
    Normalize {
        entity: String,
        #[source]
        source: NormalizeError,
    },

    #[error("Invalid table name: {name:?}")]
    InvalidIdentifier { name: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Store error: {message}")]
    Store { message: String },
}

impl EtlError {
    pub(crate) fn store(message: impl Into<String>) -> Self {
        Self::Store { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
