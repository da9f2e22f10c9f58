//! Configuration module for Weibo-Search
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, merging keyword files, and fingerprinting the search scope so a
//! resumed run can detect configuration drift.
//!
//! # Example
//!
//! ```no_run
//! use weibo_search::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Searching {} keywords", config.search.keywords.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, HttpConfig, OutputConfig, SearchConfig};

// Re-export parser functions
pub use parser::{
    compute_fingerprint, finalize_config, load_config, parse_config, read_config,
    read_keyword_file,
};
pub use validation::validate;
