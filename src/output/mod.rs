//! Output module for accepted posts and run reports
//!
//! This module handles:
//! - The sink boundary accepted posts are forwarded to
//! - Writing posts as JSON lines
//! - Deriving and printing the final run report

mod jsonl;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use stats::{load_report, print_report, RunReport};
pub use traits::{MemorySink, OutputError, OutputResult, PostSink};
