use crate::config::types::{Config, SearchConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads, resolves and validates a configuration file
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use weibo_search::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Keywords: {:?}", config.search.keywords);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = read_config(path)?;
    finalize_config(config)
}

/// Reads and parses a configuration file without validating it
///
/// Callers that apply command-line overrides read first, override, then
/// call [`finalize_config`].
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Merges the keyword file into the keyword list and validates the result
pub fn finalize_config(mut config: Config) -> Result<Config, ConfigError> {
    if let Some(path) = config.search.keyword_file.take() {
        let keywords = read_keyword_file(Path::new(&path))?;
        tracing::info!("Loaded {} keywords from {}", keywords.len(), path);
        config.search.keywords.extend(keywords);
        config.search.keyword_file = Some(path);
    }

    validate(&config)?;
    Ok(config)
}

/// Reads one keyword per line, skipping blank lines
pub fn read_keyword_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Computes a SHA-256 fingerprint of the search scope
///
/// The fingerprint covers everything that decides which tasks exist and what
/// they return: keywords, dates, regions, type filters and the page-depth
/// ceiling. The result limit, pacing and paths are left out so an interrupted
/// run can be resumed with a higher limit or a different delay.
///
/// # Returns
///
/// Hex-encoded SHA-256 hash (64 characters)
pub fn compute_fingerprint(search: &SearchConfig, max_pages_per_query: u32) -> String {
    let regions: Vec<String> = search
        .region_list()
        .into_iter()
        .map(|r| r.unwrap_or_else(|| "*".to_string()))
        .collect();

    let canonical = format!(
        "keywords={}\nstart={}\nend={}\nregions={}\nweibo_type={}\ncontain_type={}\nmax_pages={}\n",
        search.unique_keywords().join("\u{1f}"),
        search.start_date,
        search.end_date,
        regions.join("\u{1f}"),
        search.weibo_type.code(),
        search.contain_type.code(),
        max_pages_per_query
    );

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ContainType, WeiboType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[search]
keywords = ["迪丽热巴", "杨幂"]
start-date = "2024-01-01"
end-date = "2024-01-31"
weibo-type = 1
contain-type = 2
region = ["北京", "上海"]
limit-result = 100

[crawler]
download-delay = 5.0
max-pages-per-query = 50

[output]
ledger-path = "./test.db"
records-path = "./posts.jsonl"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.search.keywords.len(), 2);
        assert_eq!(config.search.weibo_type, WeiboType::Original);
        assert_eq!(config.search.contain_type, ContainType::Video);
        assert_eq!(config.search.region, vec!["北京", "上海"]);
        assert_eq!(config.search.limit_result, 100);
        assert_eq!(config.crawler.download_delay, 5.0);
        assert_eq!(config.crawler.block_retry_limit, 3);
        assert_eq!(config.output.ledger_path, "./test.db");
    }

    #[test]
    fn test_region_all_string() {
        let config = parse_config(
            r#"
[search]
keywords = ["a"]
start-date = "2024-01-01"
end-date = "2024-01-02"
region = "all"
"#,
        )
        .unwrap();
        assert_eq!(config.search.region_list(), vec![None]);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_out_of_range_weibo_type() {
        let result = parse_config(
            r#"
[search]
keywords = ["a"]
start-date = "2024-01-01"
end-date = "2024-01-02"
weibo-type = 9
"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[search]
keywords = ["a"]
start-date = "2024-02-01"
end-date = "2024-01-01"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_keyword_file_is_merged() {
        let keywords = create_temp_config("alpha\n\n  beta  \nalpha\n");
        let config_content = format!(
            r#"
[search]
keywords = ["gamma"]
keyword-file = "{}"
start-date = "2024-01-01"
end-date = "2024-01-02"
"#,
            keywords.path().display()
        );

        let file = create_temp_config(&config_content);
        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.search.unique_keywords(),
            vec!["gamma", "alpha", "beta"]
        );
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let config = parse_config(
            r#"
[search]
keywords = ["a", "b"]
start-date = "2024-01-01"
end-date = "2024-01-02"
"#,
        )
        .unwrap();

        let fp1 = compute_fingerprint(&config.search, 50);
        let fp2 = compute_fingerprint(&config.search, 50);
        assert_eq!(fp1, fp2);
        assert_eq!(fp1.len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_scope_not_limit() {
        let mut config = Config::default();
        config.search.keywords = vec!["a".to_string()];
        let base = compute_fingerprint(&config.search, 50);

        config.search.limit_result = 10;
        assert_eq!(compute_fingerprint(&config.search, 50), base);

        config.search.keywords.push("b".to_string());
        assert_ne!(compute_fingerprint(&config.search, 50), base);

        config.search.keywords.pop();
        assert_ne!(compute_fingerprint(&config.search, 40), base);
    }
}
