//! Request executor
//!
//! Every external call passes through `ApiClient::get`: it waits out the
//! rate-limit delay, performs the request, records the response's rate-limit
//! headers back into the tracker, classifies failures, counts the call, and
//! returns the decoded payload.

use crate::api::query::QueryPairs;
use crate::api::rate_limit::RateLimitTracker;
use crate::api::types::unwrap_envelope;
use crate::api::{ApiError, ApiResult, Endpoint};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Header carrying the marketplace OAuth token
const AUTH_HEADER: &str = "freelancer-oauth-v1";

/// Response headers describing the current rate-limit windows
const LIMIT_HEADER: &str = "ratelimit-limit";
const REMAINING_HEADER: &str = "ratelimit-remaining";

/// How much of an error body to keep in logs and error detail
const ERROR_DETAIL_LIMIT: usize = 200;

/// Call counters for one endpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointStats {
    pub calls: u64,
    pub failures: u64,
}

/// Process-wide call counters, total and per endpoint
#[derive(Debug, Clone, Default)]
pub struct CallStats {
    pub total_calls: u64,
    pub total_failures: u64,
    pub per_endpoint: HashMap<&'static str, EndpointStats>,
}

impl CallStats {
    fn record(&mut self, endpoint: Endpoint, failed: bool) {
        self.total_calls += 1;
        let entry = self.per_endpoint.entry(endpoint.name()).or_default();
        entry.calls += 1;
        if failed {
            self.total_failures += 1;
            entry.failures += 1;
        }
    }
}

/// Builds the HTTP client used for all API calls
///
/// Bounded timeouts make a hung request surface as a retryable timeout
/// instead of stalling the pipeline.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("bidscope/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// The single point through which every marketplace API call passes
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    tracker: Mutex<RateLimitTracker>,
    stats: Mutex<CallStats>,
}

impl ApiClient {
    /// Creates a client for the given API base URL
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root of the REST API, with or without trailing slash
    /// * `token` - OAuth token, sent on every request when present
    /// * `aggressiveness` - Rate-limit aggressiveness in [0, 1]
    pub fn new(
        base_url: &str,
        token: Option<String>,
        aggressiveness: f64,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            tracker: Mutex::new(RateLimitTracker::new(aggressiveness)),
            stats: Mutex::new(CallStats::default()),
        })
    }

    /// Performs a GET against an endpoint and decodes the enveloped payload
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &QueryPairs,
    ) -> ApiResult<T> {
        self.wait_if_needed(endpoint).await;

        let url = self.endpoint_url(endpoint, query);
        tracing::debug!("GET {}", url);

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.header(AUTH_HEADER, token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.record_call(endpoint, true);
                let err = if e.is_timeout() {
                    ApiError::Timeout {
                        endpoint: endpoint.name(),
                    }
                } else {
                    ApiError::Network {
                        endpoint: endpoint.name(),
                        source: e,
                    }
                };
                tracing::error!("Request to {} failed: {}", endpoint, err);
                return Err(err);
            }
        };

        // Record rate-limit headers before looking at the status
        let limit = header_value(&response, LIMIT_HEADER);
        let remaining = header_value(&response, REMAINING_HEADER);
        {
            let mut tracker = self.tracker.lock().unwrap();
            tracker.record_headers(endpoint, limit.as_deref(), remaining.as_deref());
        }

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            self.tracker.lock().unwrap().record_throttled(endpoint);
            self.record_call(endpoint, true);
            tracing::warn!("Endpoint {} returned 429", endpoint);
            return Err(ApiError::RateLimited {
                endpoint: endpoint.name(),
            });
        }

        if status.is_server_error() {
            self.record_call(endpoint, true);
            tracing::error!("Endpoint {} returned server error {}", endpoint, status);
            return Err(ApiError::Server {
                endpoint: endpoint.name(),
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            self.record_call(endpoint, true);
            let detail = body_detail(response).await;
            tracing::error!(
                "Endpoint {} returned client error {}: {}",
                endpoint,
                status,
                detail
            );
            return Err(ApiError::Client {
                endpoint: endpoint.name(),
                status: status.as_u16(),
                detail,
            });
        }

        let value: serde_json::Value = match response.json().await {
            Ok(value) => value,
            Err(e) => {
                self.record_call(endpoint, true);
                tracing::error!("Failed to read {} response body: {}", endpoint, e);
                return Err(ApiError::Network {
                    endpoint: endpoint.name(),
                    source: e,
                });
            }
        };

        match serde_json::from_value(unwrap_envelope(value)) {
            Ok(decoded) => {
                self.record_call(endpoint, false);
                Ok(decoded)
            }
            Err(e) => {
                self.record_call(endpoint, true);
                tracing::error!("Failed to decode {} response: {}", endpoint, e);
                Err(ApiError::Decode {
                    endpoint: endpoint.name(),
                    detail: e.to_string(),
                })
            }
        }
    }

    /// Whether any endpoint has been observed near or at exhaustion
    pub fn is_rate_limited(&self) -> bool {
        self.tracker.lock().unwrap().is_rate_limited()
    }

    /// Snapshot of the call counters
    pub fn stats(&self) -> CallStats {
        self.stats.lock().unwrap().clone()
    }

    /// Sleeps until the tracker allows the next request to this endpoint
    async fn wait_if_needed(&self, endpoint: Endpoint) {
        let wait = {
            let tracker = self.tracker.lock().unwrap();
            tracker.until_allowed(endpoint, Instant::now())
        };

        if !wait.is_zero() {
            tracing::trace!("Waiting {:?} before calling {}", wait, endpoint);
            tokio::time::sleep(wait).await;
        }

        self.tracker
            .lock()
            .unwrap()
            .record_request(endpoint, Instant::now());
    }

    fn record_call(&self, endpoint: Endpoint, failed: bool) {
        self.stats.lock().unwrap().record(endpoint, failed);
    }

    fn endpoint_url(&self, endpoint: Endpoint, query: &QueryPairs) -> String {
        if query.is_empty() {
            format!("{}/{}", self.base_url, endpoint.path())
        } else {
            format!("{}/{}?{}", self.base_url, endpoint.path(), query.encode())
        }
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn body_detail(response: reqwest::Response) -> String {
    let mut detail = response.text().await.unwrap_or_default();
    detail.truncate(ERROR_DETAIL_LIMIT);
    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_base_and_query() {
        let client = ApiClient::new("https://marketplace.example.com/api/", None, 0.7).unwrap();

        let query = QueryPairs::new().with_array("projects", [1u64, 2]);
        assert_eq!(
            client.endpoint_url(Endpoint::Projects, &query),
            "https://marketplace.example.com/api/projects/0.1/projects/?projects%5B%5D=1&projects%5B%5D=2"
        );

        let empty = QueryPairs::new();
        assert_eq!(
            client.endpoint_url(Endpoint::Bids, &empty),
            "https://marketplace.example.com/api/projects/0.1/bids/"
        );
    }

    #[test]
    fn test_call_stats_accumulate() {
        let mut stats = CallStats::default();
        stats.record(Endpoint::Bids, false);
        stats.record(Endpoint::Bids, true);
        stats.record(Endpoint::Users, false);

        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(stats.per_endpoint["bids"].calls, 2);
        assert_eq!(stats.per_endpoint["bids"].failures, 1);
        assert_eq!(stats.per_endpoint["users"].calls, 1);
    }
}
