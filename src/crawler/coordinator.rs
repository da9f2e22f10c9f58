//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Starting a fresh run or resuming the stored one
//! - Walking the pages of one task at a time under the rate controller
//! - Deciding between next page, done, split and truncation
//! - Saving the ledger after every page before forwarding records
//! - Honoring cancellation and the result limit

use crate::config::{compute_fingerprint, Config};
use crate::crawler::fetcher::{HttpSearchClient, SearchClient};
use crate::crawler::parser::{extract, ParsedPage};
use crate::crawler::scheduler::{expand, split};
use crate::output::{JsonLinesSink, PostSink, RunReport};
use crate::query::SearchTask;
use crate::state::{PostRecord, RateController, RunLedger, TaskStatus};
use crate::storage::{RunStatus, SqliteStorage, Storage, StorageError};
use crate::CrawlError;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Result of trying to get one page through the retry loop
enum PageAttempt {
    Parsed(ParsedPage),
    Blocked,
    Cancelled,
}

/// Main crawler coordinator structure
pub struct Coordinator<C: SearchClient> {
    config: Config,
    client: C,
    sink: Box<dyn PostSink + Send>,
    storage: SqliteStorage,
    ledger: RunLedger,
    rate: RateController,
    cancel: CancellationToken,
}

impl<C: SearchClient> Coordinator<C> {
    /// Creates a new coordinator instance
    ///
    /// Unless `fresh` is set, the latest resumable run in `storage` is picked
    /// up at its stored cursor. A stored run whose configuration fingerprint
    /// differs from the current one is refused. With `fresh`, open runs are
    /// marked abandoned and a new run is started from the configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `client` - Source of result pages
    /// * `sink` - Destination of accepted records
    /// * `storage` - The ledger database
    /// * `fresh` - Whether to ignore any resumable run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run, with the initial ledger saved
    /// * `Err(CrawlError)` - Configuration, storage or fingerprint failure
    pub fn new(
        config: Config,
        client: C,
        sink: Box<dyn PostSink + Send>,
        mut storage: SqliteStorage,
        fresh: bool,
    ) -> Result<Self, CrawlError> {
        let fingerprint =
            compute_fingerprint(&config.search, config.crawler.max_pages_per_query);

        let stored = if fresh {
            let abandoned = storage.abandon_open_runs()?;
            if abandoned > 0 {
                tracing::info!("Abandoned {} unfinished run(s)", abandoned);
            }
            None
        } else {
            storage.load()?
        };

        let ledger = match stored {
            Some(ledger) => {
                if ledger.fingerprint != fingerprint {
                    return Err(StorageError::FingerprintMismatch {
                        stored: ledger.fingerprint,
                        current: fingerprint,
                    }
                    .into());
                }

                storage.update_run_status(ledger.run_id, RunStatus::Running)?;
                tracing::info!(
                    "Resuming run {} at task {}/{} page {} ({} records already emitted)",
                    ledger.run_id,
                    ledger.cursor.task_index + 1,
                    ledger.queue.len(),
                    ledger.cursor.page_number,
                    ledger.emitted_count
                );
                ledger
            }
            None => {
                let tasks = expand(&config.search)?;
                let run_id = storage.create_run(&fingerprint)?;
                let ledger = RunLedger::new(run_id, &fingerprint, tasks);
                storage.save_ledger(&ledger)?;
                tracing::info!("Starting run {} with {} task(s)", run_id, ledger.queue.len());
                ledger
            }
        };

        let rate = RateController::new(&config.crawler);

        Ok(Self {
            config,
            client,
            sink,
            storage,
            ledger,
            rate,
            cancel: CancellationToken::new(),
        })
    }

    /// Uses the given token for cancellation instead of a private one
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The current ledger
    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    /// Runs the main crawl loop
    ///
    /// Tasks run strictly one after another and pages within a task strictly
    /// in order. The loop ends when the queue is exhausted, the result limit
    /// is reached or cancellation is requested; in every case the ledger on
    /// disk is a consistent resume point.
    pub async fn run(&mut self) -> Result<RunReport, CrawlError> {
        let limit = self.config.search.limit_result;
        let start_time = std::time::Instant::now();
        let mut pages_fetched: u64 = 0;

        let status = loop {
            if self.ledger.limit_reached(limit) {
                tracing::info!("Result limit of {} reached", limit);
                break RunStatus::LimitReached;
            }

            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping between pages");
                break RunStatus::Interrupted;
            }

            let task = match self.ledger.current_task() {
                Some(task) => task.clone(),
                None => {
                    tracing::info!("Task queue exhausted, crawl complete");
                    break RunStatus::Completed;
                }
            };

            if !self.process_page(&task).await? {
                tracing::info!("Cancellation requested, stopping between pages");
                break RunStatus::Interrupted;
            }

            pages_fetched += 1;
            if pages_fetched % 10 == 0 {
                tracing::info!(
                    "Progress: {} pages, {} records emitted, task {}/{}, {:.1} pages/min",
                    pages_fetched,
                    self.ledger.emitted_count,
                    self.ledger.cursor.task_index + 1,
                    self.ledger.queue.len(),
                    pages_fetched as f64 / start_time.elapsed().as_secs_f64().max(1.0) * 60.0
                );
            }
        };

        self.storage.finish_run(self.ledger.run_id, status)?;
        self.sink.flush()?;

        let report = RunReport::from_ledger(&self.ledger, status);
        tracing::info!(
            "Run {} {}: {} tasks completed ({} truncated), {} blocked, {} records emitted in {:?}",
            report.run_id,
            report.status,
            report.tasks_completed,
            report.tasks_truncated,
            report.blocked_tasks,
            report.records_emitted,
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Fetches and handles the page under the cursor
    ///
    /// Returns false if cancellation stopped the page before it was fetched.
    async fn process_page(&mut self, task: &SearchTask) -> Result<bool, CrawlError> {
        let page = self.ledger.cursor.page_number;
        let max_pages = self.config.crawler.max_pages_per_query;
        let limit = self.config.search.limit_result;

        let parsed = match self.fetch_with_retry(task, page).await {
            PageAttempt::Parsed(parsed) => parsed,
            PageAttempt::Cancelled => return Ok(false),
            PageAttempt::Blocked => {
                tracing::warn!(
                    "Abandoning {} after {} blocked attempts on page {}",
                    task,
                    self.config.crawler.block_retry_limit,
                    page
                );
                self.ledger.finish_task(TaskStatus::Blocked);
                self.commit(Vec::new())?;
                return Ok(true);
            }
        };

        if parsed.posts.is_empty() {
            tracing::debug!("{} page {} is empty, task done", task, page);
            self.ledger.finish_task(TaskStatus::Done);
            self.commit(Vec::new())?;
            return Ok(true);
        }

        if page == 1 && parsed.advertised_pages.is_some_and(|n| n >= max_pages) {
            if let Some((left, right)) = split(task) {
                tracing::info!(
                    "{} advertises {} pages on page 1, splitting before paging",
                    task,
                    parsed.advertised_pages.unwrap_or(max_pages)
                );
                self.ledger.split_current(left, right);
                self.commit(Vec::new())?;
                return Ok(true);
            }
        }

        let candidates = parsed.posts.len();
        let mut accepted: Vec<PostRecord> = Vec::new();
        let mut stopped_by_limit = false;
        for post in parsed.posts {
            if self.ledger.limit_reached(limit) {
                stopped_by_limit = true;
                break;
            }
            if self.ledger.accept(&post) {
                accepted.push(post);
            }
        }

        tracing::debug!(
            "{} page {}: {} candidates, {} accepted",
            task,
            page,
            candidates,
            accepted.len()
        );

        if !stopped_by_limit {
            let last_advertised = parsed
                .advertised_pages
                .is_some_and(|n| n < max_pages && page >= n);

            if last_advertised {
                self.ledger.finish_task(TaskStatus::Done);
            } else if page >= max_pages {
                match split(task) {
                    Some((left, right)) => {
                        tracing::info!("{} saturated at page {}, splitting", task, page);
                        self.ledger.split_current(left, right);
                    }
                    None => {
                        tracing::warn!(
                            "{} still fills {} pages at single-day granularity; results are truncated",
                            task,
                            max_pages
                        );
                        self.ledger.finish_task(TaskStatus::Truncated);
                    }
                }
            } else {
                self.ledger.next_page();
            }
        }

        self.commit(accepted)?;
        Ok(true)
    }

    /// Fetches and parses one page, retrying blocked attempts up to the bound
    async fn fetch_with_retry(&mut self, task: &SearchTask, page: u32) -> PageAttempt {
        let attempts = self.config.crawler.block_retry_limit.max(1);

        for attempt in 1..=attempts {
            if self.cancel.is_cancelled() {
                return PageAttempt::Cancelled;
            }

            let wait = self.rate.before_request();
            if !wait.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return PageAttempt::Cancelled,
                    _ = tokio::time::sleep(wait) => {}
                }
            }

            let outcome = match self.client.fetch_page(task, page).await {
                Ok(body) => extract(&body, &task.keyword).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(parsed) => {
                    self.rate.on_success();
                    return PageAttempt::Parsed(parsed);
                }
                Err(reason) => {
                    self.rate.on_failure();
                    tracing::warn!(
                        "Attempt {}/{} for {} page {} failed: {}",
                        attempt,
                        attempts,
                        task,
                        page,
                        reason
                    );
                }
            }
        }

        PageAttempt::Blocked
    }

    /// Saves the ledger, then forwards the page's accepted records
    ///
    /// Records count as emitted once the save commits. A hard kill between
    /// the save and the sink flush loses at most this page's records from the
    /// output file: the resumed run treats their ids as seen and skips them.
    fn commit(&mut self, accepted: Vec<PostRecord>) -> Result<(), CrawlError> {
        self.storage.save_ledger(&self.ledger)?;
        self.ledger.mark_saved();

        for record in &accepted {
            self.sink.emit(record)?;
        }
        if !accepted.is_empty() {
            self.sink.flush()?;
        }
        Ok(())
    }
}

/// Runs a complete crawl against the live endpoint
///
/// Opens the ledger at `output.ledger-path`, appends records to
/// `output.records-path` and returns the final report.
///
/// # Example
///
/// ```no_run
/// use weibo_search::config::load_config;
/// use tokio_util::sync::CancellationToken;
/// use weibo_search::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_crawl(config, false, CancellationToken::new()).await?;
/// println!("{} records", report.records_emitted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<RunReport, CrawlError> {
    let storage = SqliteStorage::new(Path::new(&config.output.ledger_path))?;
    let client = HttpSearchClient::new(&config.http)?;
    let sink = JsonLinesSink::create(Path::new(&config.output.records_path))?;

    let mut coordinator =
        Coordinator::new(config, client, Box::new(sink), storage, fresh)?.with_cancel(cancel);
    coordinator.run().await
}
