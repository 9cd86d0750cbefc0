use crate::config::types::{ApiConfig, Config, FetchConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates API access configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must be http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.user_id == 0 {
        return Err(ConfigError::Validation(
            "user_id must be a positive marketplace user ID".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch window and pacing configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if !(0.0..=1.0).contains(&config.aggressiveness) {
        return Err(ConfigError::Validation(format!(
            "aggressiveness must be between 0.0 and 1.0, got {}",
            config.aggressiveness
        )));
    }

    if let Some(limit) = config.bid_limit {
        if limit == 0 {
            return Err(ConfigError::Validation(
                "bid_limit must be >= 1 when set".to_string(),
            ));
        }
    }

    // Dates must parse, and the window must not be inverted
    for date in [config.from_date.as_deref(), config.to_date.as_deref()]
        .into_iter()
        .flatten()
    {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
            ConfigError::InvalidDate(format!("'{}' is not a YYYY-MM-DD date: {}", date, e))
        })?;
    }

    if let (Some(from), Some(to)) = (config.from_epoch(), config.to_epoch()) {
        if from > to {
            return Err(ConfigError::Validation(format!(
                "from_date {} is after to_date {}",
                config.from_date.as_deref().unwrap_or(""),
                config.to_date.as_deref().unwrap_or("")
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            api: ApiConfig {
                base_url: "https://marketplace.example.com/api".to_string(),
                user_id: 12345,
                token: None,
            },
            fetch: FetchConfig::default(),
            output: OutputConfig {
                database_path: "./bidscope.db".to_string(),
                summary_path: "./summary.md".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let mut config = valid_config();
        config.api.base_url = "ftp://marketplace.example.com".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_zero_user_id() {
        let mut config = valid_config();
        config.api.user_id = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_page_size_out_of_range() {
        let mut config = valid_config();
        config.fetch.page_size = 101;
        assert!(validate(&config).is_err());

        config.fetch.page_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_aggressiveness_out_of_range() {
        let mut config = valid_config();
        config.fetch.aggressiveness = 1.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_malformed_date() {
        let mut config = valid_config();
        config.fetch.from_date = Some("01/02/2024".to_string());
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_date_window() {
        let mut config = valid_config();
        config.fetch.from_date = Some("2024-06-30".to_string());
        config.fetch.to_date = Some("2024-01-01".to_string());
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }
}
