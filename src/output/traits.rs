//! Sink traits and error types
//!
//! This module defines the boundary that accepted posts cross on their way
//! out of the crawler.

use crate::state::PostRecord;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for accepted posts
///
/// Records are handed over only after the ledger save covering them has
/// committed, so each record reaches the sink at most once per run.
pub trait PostSink {
    /// Forwards one accepted record
    ///
    /// # Arguments
    ///
    /// * `record` - A record that passed dedup
    fn emit(&mut self, record: &PostRecord) -> OutputResult<()>;

    /// Makes every record emitted so far durable
    fn flush(&mut self) -> OutputResult<()>;
}

/// Collects records in memory
///
/// Clones share the same buffer, so a caller can keep one clone and hand the
/// other to the coordinator.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<PostRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records emitted so far
    pub fn records(&self) -> Vec<PostRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PostSink for MemorySink {
    fn emit(&mut self, record: &PostRecord) -> OutputResult<()> {
        self.records
            .lock()
            .map_err(|e| OutputError::Write(e.to_string()))?
            .push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
