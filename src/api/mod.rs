//! Marketplace API access layer
//!
//! This module contains everything that talks to the external REST API:
//! - Building HTTP clients with proper timeouts and auth headers
//! - Rate-limit window tracking and adaptive delay computation
//! - Retry with exponential backoff for transient failures
//! - Batching of ID lists for endpoints with payload limits
//! - Array-style query parameter encoding
//! - Raw response shapes and their normalization into model types

mod batch;
mod client;
mod query;
mod rate_limit;
mod retry;
pub mod types;

pub use batch::{needs_batching, split_into_batches, DEFAULT_BATCH_SIZE, INTER_BATCH_DELAY};
pub use client::{build_http_client, ApiClient, CallStats, EndpointStats};
pub use query::{format_query_params, QueryPairs};
pub use rate_limit::{RateLimitTracker, RateLimitWindow};
pub use retry::{retry, RetryPolicy};

use thiserror::Error;

/// API endpoints the aggregator talks to
///
/// Each endpoint carries its own rate-limit windows, so the tracker and the
/// call counters key off this enum rather than raw URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Bids,
    Projects,
    Threads,
    Milestones,
    Users,
}

impl Endpoint {
    /// Short name used in logs and counter keys
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bids => "bids",
            Self::Projects => "projects",
            Self::Threads => "threads",
            Self::Milestones => "milestones",
            Self::Users => "users",
        }
    }

    /// Path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::Bids => "projects/0.1/bids/",
            Self::Projects => "projects/0.1/projects/",
            Self::Threads => "messages/0.1/threads/",
            Self::Milestones => "projects/0.1/milestones/",
            Self::Users => "users/0.1/users/",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while calling the marketplace API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error for {endpoint}: {source}")]
    Network {
        endpoint: &'static str,
        source: reqwest::Error,
    },

    #[error("Request timeout for {endpoint}")]
    Timeout { endpoint: &'static str },

    #[error("Rate limited on {endpoint} (HTTP 429)")]
    RateLimited { endpoint: &'static str },

    #[error("Server error {status} on {endpoint}")]
    Server { endpoint: &'static str, status: u16 },

    #[error("Client error {status} on {endpoint}: {detail}")]
    Client {
        endpoint: &'static str,
        status: u16,
        detail: String,
    },

    #[error("Failed to decode {endpoint} response: {detail}")]
    Decode {
        endpoint: &'static str,
        detail: String,
    },
}

impl ApiError {
    /// Returns true for failures that are worth retrying
    ///
    /// Transport errors, timeouts, HTTP 429, and 5xx responses are transient.
    /// Other 4xx responses and decode failures are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimited { .. } | Self::Server { .. }
        )
    }

    /// The HTTP status behind this error, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } | Self::Client { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
