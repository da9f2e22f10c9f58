//! State module for tracking crawl progress
//!
//! This module provides the in-memory state the coordinator mutates while it
//! pages through search tasks.
//!
//! # Components
//!
//! - `TaskStatus`: Completion flag of a queued task (pending, done, truncated, split, blocked)
//! - `RateController`: Adaptive delay applied before every request
//! - `SeenSet`: Run-scoped set of emitted content ids, with `dedup`
//! - `RunLedger`: Task queue, page cursor and counters persisted after every page

mod ledger;
mod rate_state;
mod record;
mod seen_set;
mod task_state;

// Re-export main types
pub use ledger::{PageCursor, RunLedger, TaskCounts, TaskEntry};
pub use rate_state::{RateController, RateState};
pub use record::{PostRecord, TypeFlags};
pub use seen_set::{dedup, SeenSet};
pub use task_state::TaskStatus;
