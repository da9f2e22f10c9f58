use crate::query::{is_all_regions, ContainType, WeiboType};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main configuration structure for Weibo-Search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to search for
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Keywords to search, in order
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Optional file with one keyword per line, merged after `keywords`
    #[serde(rename = "keyword-file", default)]
    pub keyword_file: Option<String>,

    /// First day of the search window (inclusive)
    #[serde(rename = "start-date")]
    pub start_date: NaiveDate,

    /// Last day of the search window (inclusive)
    #[serde(rename = "end-date")]
    pub end_date: NaiveDate,

    /// Result type filter
    #[serde(rename = "weibo-type", default)]
    pub weibo_type: WeiboType,

    /// Content filter
    #[serde(rename = "contain-type", default)]
    pub contain_type: ContainType,

    /// Region names; empty or "all" means every region
    #[serde(default, deserialize_with = "deserialize_regions")]
    pub region: Vec<String>,

    /// Maximum number of records to emit, 0 for unlimited
    #[serde(rename = "limit-result", default)]
    pub limit_result: u64,
}

impl SearchConfig {
    /// Keywords with surrounding whitespace removed, blanks dropped and
    /// duplicates removed (first occurrence wins)
    pub fn unique_keywords(&self) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();
        for keyword in &self.keywords {
            let keyword = keyword.trim();
            if !keyword.is_empty() && !keywords.iter().any(|k| k == keyword) {
                keywords.push(keyword.to_string());
            }
        }
        keywords
    }

    /// Regions to search, `None` standing for all regions
    pub fn region_list(&self) -> Vec<Option<String>> {
        if self.region.is_empty() || self.region.iter().any(|r| is_all_regions(r)) {
            return vec![None];
        }

        let mut regions: Vec<Option<String>> = Vec::new();
        for region in &self.region {
            let region = Some(region.trim().to_string());
            if !regions.contains(&region) {
                regions.push(region);
            }
        }
        regions
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self {
            keywords: Vec::new(),
            keyword_file: None,
            start_date: today,
            end_date: today,
            weibo_type: WeiboType::default(),
            contain_type: ContainType::default(),
            region: Vec::new(),
            limit_result: 0,
        }
    }
}

/// Crawler pacing and depth configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Base delay between requests (seconds)
    #[serde(rename = "download-delay")]
    pub download_delay: f64,

    /// Upper bound on the escalated delay (seconds)
    #[serde(rename = "max-delay")]
    pub max_delay: f64,

    /// Multiplier applied to the delay on every blocked request
    #[serde(rename = "backoff-factor")]
    pub backoff_factor: f64,

    /// Consecutive successes needed before the delay decays one step
    #[serde(rename = "decay-after")]
    pub decay_after: u32,

    /// Maximum random jitter added to every wait (milliseconds)
    #[serde(rename = "jitter-ms")]
    pub jitter_ms: u64,

    /// Attempts per page before the task is abandoned as blocked
    #[serde(rename = "block-retry-limit")]
    pub block_retry_limit: u32,

    /// Maximum number of result pages the endpoint serves for one query
    #[serde(rename = "max-pages-per-query")]
    pub max_pages_per_query: u32,
}

impl CrawlerConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs_f64(self.download_delay)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs_f64(self.max_delay)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            download_delay: 10.0,
            max_delay: 300.0,
            backoff_factor: 2.0,
            decay_after: 5,
            jitter_ms: 1000,
            block_retry_limit: 3,
            max_pages_per_query: 50,
        }
    }
}

/// Search endpoint connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Search endpoint URL; query parameters are appended to it
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Pre-acquired session cookie sent with every request
    pub cookie: Option<String>,

    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://s.weibo.com/weibo".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
                .to_string(),
            cookie: None,
            timeout_secs: 30,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite run ledger
    #[serde(rename = "ledger-path")]
    pub ledger_path: String,

    /// Path to the JSON lines file receiving accepted posts
    #[serde(rename = "records-path")]
    pub records_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ledger_path: "./weibo_search.db".to_string(),
            records_path: "./output/posts.jsonl".to_string(),
        }
    }
}

/// Accepts `region = "all"` as well as `region = ["北京", "上海"]`
fn deserialize_regions<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RegionSetting {
        Single(String),
        List(Vec<String>),
    }

    Ok(match RegionSetting::deserialize(deserializer)? {
        RegionSetting::Single(region) => region
            .split(',')
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect(),
        RegionSetting::List(regions) => regions,
    })
}
