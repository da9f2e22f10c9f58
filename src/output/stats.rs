//! Run report generation
//!
//! This module derives the final status of a run from its ledger and prints
//! it. Because every count comes from the persisted queue, a report is exact
//! across any number of resumes.

use crate::state::RunLedger;
use crate::storage::{RunStatus, Storage};
use crate::CrawlError;

/// Final status of a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: i64,

    pub status: RunStatus,

    /// Tasks that walked all their pages, truncated ones included
    pub tasks_completed: u64,

    /// Single-day tasks that still saturated the page-depth ceiling
    pub tasks_truncated: u64,

    /// Records emitted over the whole run, across resumes
    pub records_emitted: u64,

    /// Tasks abandoned after exhausting the block-retry bound
    pub blocked_tasks: u64,

    /// Tasks not started yet, the current one included
    pub tasks_pending: u64,

    /// Tasks replaced by their two halves
    pub tasks_split: u64,
}

impl RunReport {
    /// Builds the report of a ledger in the given run status
    pub fn from_ledger(ledger: &RunLedger, status: RunStatus) -> Self {
        let counts = ledger.task_counts();
        Self {
            run_id: ledger.run_id,
            status,
            tasks_completed: counts.done + counts.truncated,
            tasks_truncated: counts.truncated,
            records_emitted: ledger.emitted_count,
            blocked_tasks: counts.blocked,
            tasks_pending: counts.pending,
            tasks_split: counts.split,
        }
    }
}

/// Loads the report of the most recent run
///
/// # Arguments
///
/// * `storage` - The ledger storage to query
///
/// # Returns
///
/// * `Ok(Some(RunReport))` - Report of the latest run
/// * `Ok(None)` - The ledger holds no runs
/// * `Err(CrawlError)` - Failed to read or validate the ledger
pub fn load_report(storage: &dyn Storage) -> Result<Option<RunReport>, CrawlError> {
    let run = match storage.get_latest_run()? {
        Some(run) => run,
        None => return Ok(None),
    };

    let ledger = storage.load_ledger(run.id)?;
    Ok(Some(RunReport::from_ledger(&ledger, run.status)))
}

/// Prints a report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &RunReport) {
    println!("=== Run {} ({}) ===\n", report.run_id, report.status);

    println!("Tasks:");
    println!("  Completed: {}", report.tasks_completed);
    println!("  Truncated: {}", report.tasks_truncated);
    println!("  Blocked: {}", report.blocked_tasks);
    println!("  Split: {}", report.tasks_split);
    println!("  Pending: {}", report.tasks_pending);
    println!();

    println!("Records emitted: {}", report.records_emitted);

    if report.tasks_truncated > 0 {
        println!(
            "\nNote: {} single-day task(s) hit the page-depth ceiling; their results are incomplete.",
            report.tasks_truncated
        );
    }

    if report.status.is_resumable() {
        println!("\nRun again with the same configuration to resume.");
    }
}
