//! Storage traits and error types
//!
//! This module defines the trait interface for ledger backends and
//! associated error types.

use crate::state::RunLedger;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Ledger is corrupt: {0}")]
    Corrupt(String),

    #[error(
        "Configuration changed since the stored run (stored fingerprint {stored}, current {current}); \
         rerun with --fresh to start over"
    )]
    FingerprintMismatch { stored: String, current: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for run ledger backends
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `fingerprint` - Fingerprint of the search configuration
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, fingerprint: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run, whatever its status
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Gets the most recent run that can still be resumed
    fn get_resumable_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run with a terminal or paused status and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks every resumable run abandoned
    ///
    /// # Returns
    ///
    /// The number of runs abandoned
    fn abandon_open_runs(&mut self) -> StorageResult<usize>;

    // ===== Ledger Persistence =====

    /// Persists the ledger atomically
    ///
    /// Queue, cursor, emitted count and the ids accepted since the previous
    /// save are written in one transaction. The caller marks the ledger saved
    /// once this returns `Ok`.
    fn save_ledger(&mut self, ledger: &RunLedger) -> StorageResult<()>;

    /// Loads and validates the ledger of a run
    fn load_ledger(&self, run_id: i64) -> StorageResult<RunLedger>;

    /// Loads the ledger of the latest resumable run, if any
    fn load(&self) -> StorageResult<Option<RunLedger>> {
        match self.get_resumable_run()? {
            Some(run) => Ok(Some(self.load_ledger(run.id)?)),
            None => Ok(None),
        }
    }
}
