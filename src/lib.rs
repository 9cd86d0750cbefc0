//! Bidscope: a polite bid-history aggregator
//!
//! This crate pulls a freelancer's bid, project, thread, milestone, and client
//! data from the marketplace REST API, respecting the API's rate-limit windows,
//! and merges everything into flat rows stored as named local datasets.

pub mod api;
pub mod config;
pub mod fetch;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod storage;

use thiserror::Error;

/// Main error type for Bidscope operations
#[derive(Debug, Error)]
pub enum BidscopeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] api::ApiError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Aggregation cancelled")]
    Cancelled,

    #[error("Aggregation stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        source: api::ApiError,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid date in config: {0}")]
    InvalidDate(String),
}

/// Result type alias for Bidscope operations
pub type Result<T> = std::result::Result<T, BidscopeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use model::{AwardStatus, Bid, ClientProfile, Milestone, Project, Row, Thread};
pub use pipeline::{Aggregator, CancelToken, FetchScope};
