use crate::config::types::{Config, CrawlerConfig, HttpConfig, OutputConfig, SearchConfig};
use crate::query::{is_all_regions, province_code};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the search scope
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.unique_keywords().is_empty() {
        return Err(ConfigError::Validation(
            "at least one keyword is required".to_string(),
        ));
    }

    if config.start_date > config.end_date {
        return Err(ConfigError::Validation(format!(
            "start-date {} is later than end-date {}",
            config.start_date, config.end_date
        )));
    }

    for region in &config.region {
        if !is_all_regions(region) && province_code(region).is_none() {
            return Err(ConfigError::UnknownRegion(region.clone()));
        }
    }

    Ok(())
}

/// Validates pacing and depth settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if !config.download_delay.is_finite() || config.download_delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "download-delay must be a non-negative number of seconds, got {}",
            config.download_delay
        )));
    }

    if !config.max_delay.is_finite() || config.max_delay < config.download_delay {
        return Err(ConfigError::Validation(format!(
            "max-delay must be >= download-delay ({}s), got {}s",
            config.download_delay, config.max_delay
        )));
    }

    if !config.backoff_factor.is_finite() || config.backoff_factor < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-factor must be >= 1.0, got {}",
            config.backoff_factor
        )));
    }

    if config.decay_after < 1 {
        return Err(ConfigError::Validation(
            "decay-after must be >= 1".to_string(),
        ));
    }

    if config.block_retry_limit < 1 {
        return Err(ConfigError::Validation(
            "block-retry-limit must be >= 1".to_string(),
        ));
    }

    if config.max_pages_per_query < 1 {
        return Err(ConfigError::Validation(
            "max-pages-per-query must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates endpoint settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.ledger_path.is_empty() {
        return Err(ConfigError::Validation(
            "ledger-path cannot be empty".to_string(),
        ));
    }

    if config.records_path.is_empty() {
        return Err(ConfigError::Validation(
            "records-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.search.keywords = vec!["rust".to_string()];
        config.search.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        config.search.end_date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_keywords() {
        let mut config = valid_config();
        config.search.keywords = vec!["  ".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_reversed_dates() {
        let mut config = valid_config();
        config.search.start_date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_single_day_is_valid() {
        let mut config = valid_config();
        config.search.end_date = config.search.start_date;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_region() {
        let mut config = valid_config();
        config.search.region = vec!["Narnia".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_known_and_all_regions() {
        let mut config = valid_config();
        config.search.region = vec!["北京".to_string(), "all".to_string()];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_crawler_limits() {
        let mut config = valid_config();
        config.crawler.download_delay = -1.0;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.crawler.max_delay = 1.0;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.crawler.backoff_factor = 0.5;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.crawler.block_retry_limit = 0;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.crawler.max_pages_per_query = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_delay_is_allowed() {
        let mut config = valid_config();
        config.crawler.download_delay = 0.0;
        config.crawler.max_delay = 0.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = valid_config();
        config.http.base_url = "not a url".to_string();
        assert!(validate(&config).is_err());

        config.http.base_url = "ftp://example.com/".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_output_paths() {
        let mut config = valid_config();
        config.output.ledger_path = String::new();
        assert!(validate(&config).is_err());
    }
}
