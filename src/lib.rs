//! Weibo-Search: a depth-aware keyword crawler for the Weibo search endpoint
//!
//! This crate expands keyword/date/region configurations into atomic search
//! tasks, walks their result pages under an adaptive rate controller, splits
//! date windows that hit the endpoint's page-depth ceiling, deduplicates posts
//! across windows, and keeps a durable ledger so an interrupted crawl resumes
//! exactly where it stopped.

pub mod config;
pub mod crawler;
pub mod output;
pub mod query;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

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

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use output::RunReport;
pub use query::{ContainType, SearchTask, WeiboType};
pub use state::{PostRecord, RunLedger, TaskStatus};
