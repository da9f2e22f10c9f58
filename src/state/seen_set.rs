//! Run-wide post deduplication

use crate::state::PostRecord;
use std::collections::HashSet;

/// Content ids already emitted during the current run
///
/// Scoped to the whole run rather than a single task, since adjacent date
/// windows can surface the same post. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a set from a persisted snapshot
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, content_id: &str) -> bool {
        self.ids.contains(content_id)
    }

    /// Adds an id, returning false if it was already present
    pub fn insert(&mut self, content_id: &str) -> bool {
        if self.ids.contains(content_id) {
            return false;
        }
        self.ids.insert(content_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Admits a candidate record at most once per run
///
/// Returns true and records the id if the candidate has not been seen yet.
/// Rejected candidates are expected overlap from window splitting and are
/// only logged at debug level.
pub fn dedup(candidate: &PostRecord, seen: &mut SeenSet) -> bool {
    let accepted = seen.insert(&candidate.content_id);
    if !accepted {
        tracing::debug!("Dropping duplicate post {}", candidate.content_id);
    }
    accepted
}
