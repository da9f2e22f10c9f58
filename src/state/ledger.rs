//! In-memory run ledger
//!
//! The ledger is the unit of crash recovery: the task queue with a status per
//! task, the page cursor, the emitted-record count and the seen-id set. The
//! coordinator mutates it page by page and the storage layer persists it after
//! every page.

use crate::query::SearchTask;
use crate::state::{dedup, PostRecord, SeenSet, TaskStatus};

/// One queued search task and its completion flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    pub task: SearchTask,
    pub status: TaskStatus,
}

impl TaskEntry {
    pub fn pending(task: SearchTask) -> Self {
        Self {
            task,
            status: TaskStatus::Pending,
        }
    }
}

/// Position within the task queue
///
/// `page_number` is 1-based and names the next page to fetch for the task at
/// `task_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub task_index: usize,
    pub page_number: u32,
    pub results_seen_on_task: u64,
}

impl PageCursor {
    /// Cursor at the first page of the given task
    pub fn at_task(task_index: usize) -> Self {
        Self {
            task_index,
            page_number: 1,
            results_seen_on_task: 0,
        }
    }
}

/// Counts of queue entries by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub pending: u64,
    pub done: u64,
    pub truncated: u64,
    pub split: u64,
    pub blocked: u64,
}

/// Durable run state
#[derive(Debug, Clone)]
pub struct RunLedger {
    pub run_id: i64,
    pub fingerprint: String,
    pub queue: Vec<TaskEntry>,
    pub cursor: PageCursor,
    pub emitted_count: u64,
    pub seen: SeenSet,

    /// Ids accepted since the last save
    unsaved_seen: Vec<String>,

    /// First queue position changed since the last save
    unsaved_queue_from: Option<usize>,
}

impl RunLedger {
    /// Creates a ledger for a fresh run over the given task queue
    pub fn new(run_id: i64, fingerprint: &str, tasks: Vec<SearchTask>) -> Self {
        Self {
            run_id,
            fingerprint: fingerprint.to_string(),
            queue: tasks.into_iter().map(TaskEntry::pending).collect(),
            cursor: PageCursor::at_task(0),
            emitted_count: 0,
            seen: SeenSet::new(),
            unsaved_seen: Vec::new(),
            unsaved_queue_from: Some(0),
        }
    }

    /// Rebuilds a ledger from persisted parts
    pub fn restore(
        run_id: i64,
        fingerprint: String,
        queue: Vec<TaskEntry>,
        cursor: PageCursor,
        emitted_count: u64,
        seen: SeenSet,
    ) -> Self {
        Self {
            run_id,
            fingerprint,
            queue,
            cursor,
            emitted_count,
            seen,
            unsaved_seen: Vec::new(),
            unsaved_queue_from: None,
        }
    }

    /// The task under the cursor, if the queue is not exhausted
    pub fn current_task(&self) -> Option<&SearchTask> {
        self.queue
            .get(self.cursor.task_index)
            .filter(|entry| entry.status == TaskStatus::Pending)
            .map(|entry| &entry.task)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_task().is_none()
    }

    /// Runs a candidate through dedup and advances the counters if it is new
    pub fn accept(&mut self, candidate: &PostRecord) -> bool {
        let accepted = dedup(candidate, &mut self.seen);
        if accepted {
            self.unsaved_seen.push(candidate.content_id.clone());
        }
        self.advance(accepted);
        accepted
    }

    /// Records the outcome of one candidate on the current page
    pub fn advance(&mut self, record_emitted: bool) {
        if record_emitted {
            self.emitted_count += 1;
            self.cursor.results_seen_on_task += 1;
        }
    }

    /// Moves the cursor to the next page of the current task
    pub fn next_page(&mut self) {
        self.cursor.page_number += 1;
    }

    /// Closes the current task and moves to the next queue entry
    pub fn finish_task(&mut self, status: TaskStatus) {
        if let Some(entry) = self.queue.get_mut(self.cursor.task_index) {
            entry.status = status;
        }
        self.touch_queue(self.cursor.task_index);
        self.cursor = PageCursor::at_task(self.cursor.task_index + 1);
    }

    /// Replaces the current task with its two halves
    ///
    /// The halves go directly after the split task so they run before any
    /// sibling task still waiting in the queue.
    pub fn split_current(&mut self, left: SearchTask, right: SearchTask) {
        let index = self.cursor.task_index;
        if let Some(entry) = self.queue.get_mut(index) {
            entry.status = TaskStatus::Split;
        }
        self.queue.insert(index + 1, TaskEntry::pending(left));
        self.queue.insert(index + 2, TaskEntry::pending(right));
        self.touch_queue(index);
        self.cursor = PageCursor::at_task(index + 1);
    }

    /// True once `limit` records have been emitted; 0 means unlimited
    pub fn limit_reached(&self, limit: u64) -> bool {
        limit > 0 && self.emitted_count >= limit
    }

    /// Ids accepted since the last successful save
    pub fn unsaved_seen(&self) -> &[String] {
        &self.unsaved_seen
    }

    /// First queue position whose row has to be rewritten on the next save
    ///
    /// Entries before it are unchanged since the last save. `None` means the
    /// stored queue is current.
    pub fn unsaved_queue_from(&self) -> Option<usize> {
        self.unsaved_queue_from
    }

    fn touch_queue(&mut self, position: usize) {
        self.unsaved_queue_from = Some(match self.unsaved_queue_from {
            Some(from) => from.min(position),
            None => position,
        });
    }

    /// Called once the storage transaction for this ledger has committed
    pub fn mark_saved(&mut self) {
        self.unsaved_seen.clear();
        self.unsaved_queue_from = None;
    }

    pub fn task_counts(&self) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for entry in &self.queue {
            match entry.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Done => counts.done += 1,
                TaskStatus::Truncated => counts.truncated += 1,
                TaskStatus::Split => counts.split += 1,
                TaskStatus::Blocked => counts.blocked += 1,
            }
        }
        counts
    }

    /// Checks the structural invariants of a loaded ledger
    ///
    /// Every entry before the cursor is terminal, every entry from the cursor
    /// on is pending, the cursor lies inside the queue (or one past its end)
    /// and each emitted record has exactly one seen id.
    pub fn validate(&self) -> Result<(), String> {
        if self.cursor.task_index > self.queue.len() {
            return Err(format!(
                "cursor task index {} is outside a queue of {} tasks",
                self.cursor.task_index,
                self.queue.len()
            ));
        }

        if self.cursor.page_number < 1 {
            return Err("cursor page number must be >= 1".to_string());
        }

        for (position, entry) in self.queue.iter().enumerate() {
            let before_cursor = position < self.cursor.task_index;
            if before_cursor && !entry.status.is_terminal() {
                return Err(format!(
                    "task {} before the cursor is still {}",
                    position, entry.status
                ));
            }
            if !before_cursor && entry.status.is_terminal() {
                return Err(format!(
                    "task {} at or after the cursor is already {}",
                    position, entry.status
                ));
            }
        }

        if self.emitted_count != self.seen.len() as u64 {
            return Err(format!(
                "emitted count {} does not match {} seen ids",
                self.emitted_count,
                self.seen.len()
            ));
        }

        Ok(())
    }
}
