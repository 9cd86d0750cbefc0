//! Rate-limit window tracking and adaptive delay computation
//!
//! The marketplace API advertises its limits through response headers: a
//! limit header that may describe several windows in one value (for example
//! `"50, 50;window=60, 1000;window=3600"`) and a matching remaining-count
//! header. The tracker keeps the latest windows per endpoint and decides,
//! before each request, how long the caller must wait.

use crate::api::Endpoint;
use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Window length assumed when a limit entry carries no `;window=` suffix
const DEFAULT_WINDOW_SECS: u64 = 60;

/// Window forced onto an endpoint after an HTTP 429 response
const THROTTLED_WINDOW_SECS: u64 = 60;

/// Upper bound of the anti-burst jitter applied when capacity is plentiful
const JITTER_CEILING_MS: u64 = 50;

/// One rate-limit window advertised by the API: at most `limit` requests per
/// `window_secs`, with `remaining` slots left in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    pub limit: u32,
    pub window_secs: u64,
    pub remaining: u32,
}

impl RateLimitWindow {
    /// Time to regain one request slot in this window
    fn slot(&self) -> Duration {
        Duration::from_millis(self.window_secs * 1000 / u64::from(self.limit.max(1)))
    }

    fn remaining_ratio(&self) -> f64 {
        f64::from(self.remaining) / f64::from(self.limit.max(1))
    }
}

/// Tracks per-endpoint rate-limit windows and computes adaptive delays
///
/// The tracker is the only shared mutable state in the pipeline. It is owned
/// by the `ApiClient` behind a mutex; the executor records into it right
/// after each response and reads the current delay right before each request.
#[derive(Debug)]
pub struct RateLimitTracker {
    /// Aggressiveness in [0, 1]; higher trades safety margin for speed
    aggressiveness: f64,

    /// Latest known windows per endpoint
    windows: HashMap<Endpoint, Vec<RateLimitWindow>>,

    /// When each endpoint last sent a request
    last_request: HashMap<Endpoint, Instant>,

    /// When any endpoint last sent a request
    last_request_any: Option<Instant>,

    /// True once any window's remaining count has dropped to <= 2
    rate_limited: bool,
}

impl RateLimitTracker {
    /// Creates a tracker with the given aggressiveness (clamped to [0, 1])
    pub fn new(aggressiveness: f64) -> Self {
        Self {
            aggressiveness: aggressiveness.clamp(0.0, 1.0),
            windows: HashMap::new(),
            last_request: HashMap::new(),
            last_request_any: None,
            rate_limited: false,
        }
    }

    /// Records rate-limit headers from a response
    ///
    /// The limit header holds comma-separated entries of the form `N` or
    /// `N;window=S`; the remaining header holds comma-separated counts paired
    /// by index (the last count carries forward when the list is shorter).
    /// Unparseable or absent headers leave the prior state untouched.
    pub fn record_headers(
        &mut self,
        endpoint: Endpoint,
        limit_header: Option<&str>,
        remaining_header: Option<&str>,
    ) {
        let Some(limit_header) = limit_header else {
            return;
        };

        let limits = parse_limit_header(limit_header);
        if limits.is_empty() {
            return;
        }

        let remaining = remaining_header.map(parse_remaining_header).unwrap_or_default();

        let windows: Vec<RateLimitWindow> = limits
            .iter()
            .enumerate()
            .map(|(i, &(limit, window_secs))| {
                // Pair by index; the last remaining value carries forward
                let rem = remaining
                    .get(i)
                    .or_else(|| remaining.last())
                    .copied()
                    .unwrap_or(limit);
                RateLimitWindow {
                    limit,
                    window_secs,
                    remaining: rem.min(limit),
                }
            })
            .collect();

        tracing::trace!(
            "Rate-limit windows for {}: {:?}",
            endpoint,
            windows
        );

        self.windows.insert(endpoint, windows);
        self.refresh_rate_limited_flag();
    }

    /// Forces the endpoint into a throttled state after an HTTP 429
    ///
    /// The synthetic window has zero remaining slots over 60 seconds,
    /// keeping a previously learned limit when one exists.
    pub fn record_throttled(&mut self, endpoint: Endpoint) {
        let limit = self
            .windows
            .get(&endpoint)
            .and_then(|ws| ws.iter().map(|w| w.limit).max())
            .unwrap_or(1);

        self.windows.insert(
            endpoint,
            vec![RateLimitWindow {
                limit,
                window_secs: THROTTLED_WINDOW_SECS,
                remaining: 0,
            }],
        );
        self.rate_limited = true;

        tracing::warn!("Endpoint {} throttled, forcing zero-remaining window", endpoint);
    }

    /// Records that a request is being sent to the endpoint now
    pub fn record_request(&mut self, endpoint: Endpoint, now: Instant) {
        self.last_request.insert(endpoint, now);
        self.last_request_any = Some(now);
    }

    /// Computes the delay to apply before the next request to this endpoint
    ///
    /// For each known window: zero remaining means waiting for one slot to
    /// regenerate; under 10% remaining scales the slot time up sharply; under
    /// 30% moderately; otherwise a small randomized delay spreads out bursts.
    /// The maximum across windows wins. Aggressiveness shortens everything
    /// linearly except the zero-remaining case, which never drops below one
    /// full slot.
    pub fn compute_delay(&self, endpoint: Endpoint) -> Duration {
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=JITTER_CEILING_MS));

        let Some(windows) = self.windows.get(&endpoint) else {
            return jitter;
        };

        // Linear trade: aggressiveness 1.0 -> factor 1.0, 0.0 -> factor 2.0
        let factor = 2.0 - self.aggressiveness;

        let mut delay = jitter;
        for window in windows {
            let slot = window.slot();
            let candidate = if window.remaining == 0 {
                slot.mul_f64(factor)
            } else if window.remaining_ratio() < 0.1 {
                slot.mul_f64(factor * 0.6)
            } else if window.remaining_ratio() < 0.3 {
                slot.mul_f64(factor * 0.2)
            } else {
                jitter
            };
            delay = delay.max(candidate);
        }

        delay
    }

    /// Time the caller must still wait before sending to this endpoint
    ///
    /// Combines the endpoint-specific delay with a process-wide minimum
    /// spacing, set slightly shorter than the endpoint delay, measured from
    /// the last request to ANY endpoint.
    pub fn until_allowed(&self, endpoint: Endpoint, now: Instant) -> Duration {
        let delay = self.compute_delay(endpoint);

        let endpoint_wait = self
            .last_request
            .get(&endpoint)
            .map(|last| remaining_wait(*last, delay, now))
            .unwrap_or(Duration::ZERO);

        let global_wait = self
            .last_request_any
            .map(|last| remaining_wait(last, delay.mul_f64(0.8), now))
            .unwrap_or(Duration::ZERO);

        endpoint_wait.max(global_wait)
    }

    /// Whether any window has been observed near or at exhaustion
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited
    }

    /// Latest known windows for an endpoint
    pub fn windows(&self, endpoint: Endpoint) -> Option<&[RateLimitWindow]> {
        self.windows.get(&endpoint).map(Vec::as_slice)
    }

    fn refresh_rate_limited_flag(&mut self) {
        self.rate_limited = self
            .windows
            .values()
            .flatten()
            .any(|w| w.remaining <= 2);
    }
}

fn remaining_wait(last: Instant, delay: Duration, now: Instant) -> Duration {
    let elapsed = now.duration_since(last);
    if elapsed >= delay {
        Duration::ZERO
    } else {
        delay - elapsed
    }
}

/// Parses a limit header value into `(limit, window_secs)` tuples
///
/// Entries that fail to parse are dropped rather than failing the whole
/// header; a zero limit is meaningless and is dropped too.
fn parse_limit_header(value: &str) -> Vec<(u32, u64)> {
    value
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().split(';');
            let limit = parts.next()?.trim().parse::<u32>().ok()?;
            if limit == 0 {
                return None;
            }

            let mut window_secs = DEFAULT_WINDOW_SECS;
            for part in parts {
                if let Some(v) = part.trim().strip_prefix("window=") {
                    window_secs = v.trim().parse().ok()?;
                }
            }
            Some((limit, window_secs))
        })
        .collect()
}

/// Parses a remaining header value into counts
fn parse_remaining_header(value: &str) -> Vec<u32> {
    value
        .split(',')
        .filter_map(|entry| entry.trim().parse::<u32>().ok())
        .collect()
}
