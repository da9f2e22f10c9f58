//! Crawler module for search task processing
//!
//! This module contains the core crawling logic, including:
//! - Expanding the configuration into search tasks and splitting date windows
//! - HTTP fetching with block classification
//! - Result page extraction
//! - Overall crawl coordination with resume support
//!
//! Cancellation uses a `tokio_util` [`CancellationToken`](tokio_util::sync::CancellationToken):
//! the coordinator stops at the next page boundary, or right away while it
//! is waiting out a request delay.

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchError, HttpSearchClient, SearchClient};
pub use parser::{extract, ParseError, ParsedPage};
pub use scheduler::{expand, split};
