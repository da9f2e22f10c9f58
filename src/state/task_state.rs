/// Task status definitions for tracking crawl progress
///
/// This module defines every status a queued search task can carry in the
/// run ledger.
use std::fmt;

/// Represents the current status of a task in the work queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    // ===== Active States =====
    /// Task is waiting in the queue, or is the one being paged
    Pending,

    // ===== Terminal Success States =====
    /// All result pages were walked until an empty page or the last advertised page
    Done,

    /// Saturated at single-day granularity; results accepted as incomplete
    Truncated,

    /// Replaced by its two date-window halves, which follow it in the queue
    Split,

    // ===== Terminal Error States =====
    /// Abandoned after exhausting the block-retry bound on one page
    Blocked,
}

impl TaskStatus {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if the task finished walking its pages
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Done | Self::Truncated)
    }

    /// Converts the task status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Truncated => "truncated",
            Self::Split => "split",
            Self::Blocked => "blocked",
        }
    }

    /// Parses a task status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "truncated" => Some(Self::Truncated),
            "split" => Some(Self::Split),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Returns all possible task statuses
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Done,
            Self::Truncated,
            Self::Split,
            Self::Blocked,
        ]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
