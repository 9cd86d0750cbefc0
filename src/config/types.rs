use serde::Deserialize;

/// Main configuration structure for Bidscope
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Marketplace API access configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the marketplace REST API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Numeric ID of the bidder whose history is aggregated
    #[serde(rename = "user-id")]
    pub user_id: u64,

    /// OAuth token sent as the `freelancer-oauth-v1` header.
    /// Falls back to the BIDSCOPE_TOKEN environment variable when absent.
    #[serde(default)]
    pub token: Option<String>,
}

/// Aggregation window and pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Inclusive start of the bid window (YYYY-MM-DD)
    #[serde(rename = "from-date", default)]
    pub from_date: Option<String>,

    /// Inclusive end of the bid window (YYYY-MM-DD)
    #[serde(rename = "to-date", default)]
    pub to_date: Option<String>,

    /// Stop after this many bids (all bids in the window when absent)
    #[serde(rename = "bid-limit", default)]
    pub bid_limit: Option<u32>,

    /// Bids requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Rate-limit aggressiveness in [0, 1]; higher means shorter delays
    #[serde(default = "default_aggressiveness")]
    pub aggressiveness: f64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite dataset database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path", default = "default_summary_path")]
    pub summary_path: String,
}

fn default_page_size() -> u32 {
    50
}

fn default_aggressiveness() -> f64 {
    0.7
}

fn default_summary_path() -> String {
    "./bidscope-summary.md".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            from_date: None,
            to_date: None,
            bid_limit: None,
            page_size: default_page_size(),
            aggressiveness: default_aggressiveness(),
        }
    }
}

impl ApiConfig {
    /// Resolves the OAuth token from the config or the environment
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("BIDSCOPE_TOKEN").ok())
    }
}

impl FetchConfig {
    /// Start of the bid window as epoch seconds (midnight UTC)
    pub fn from_epoch(&self) -> Option<i64> {
        date_to_epoch(self.from_date.as_deref())
    }

    /// End of the bid window as epoch seconds (end of day UTC)
    pub fn to_epoch(&self) -> Option<i64> {
        date_to_epoch(self.to_date.as_deref()).map(|t| t + 86_399)
    }
}

fn date_to_epoch(date: Option<&str>) -> Option<i64> {
    let date = date?;
    let parsed = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(parsed.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_epoch_parses_date() {
        let fetch = FetchConfig {
            from_date: Some("2024-01-01".to_string()),
            ..FetchConfig::default()
        };
        assert_eq!(fetch.from_epoch(), Some(1_704_067_200));
    }

    #[test]
    fn test_to_epoch_is_end_of_day() {
        let fetch = FetchConfig {
            to_date: Some("2024-01-01".to_string()),
            ..FetchConfig::default()
        };
        assert_eq!(fetch.to_epoch(), Some(1_704_067_200 + 86_399));
    }

    #[test]
    fn test_missing_dates_are_none() {
        let fetch = FetchConfig::default();
        assert_eq!(fetch.from_epoch(), None);
        assert_eq!(fetch.to_epoch(), None);
    }
}
