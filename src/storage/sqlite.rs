//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::query::{ContainType, SearchTask, WeiboType};
use crate::state::{PageCursor, RunLedger, SeenSet, TaskEntry, TaskStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, fingerprint, status, emitted_count";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Raw connection, for tests that tamper with stored rows
    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query_run(&self, sql: &str, param: Option<i64>) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raw = match param {
            Some(value) => stmt.query_row(params![value], raw_run).optional()?,
            None => stmt.query_row([], raw_run).optional()?,
        };
        raw.map(RawRun::into_record).transpose()
    }

    fn load_queue(&self, run_id: i64) -> StorageResult<Vec<TaskEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT position, keyword, date_start, date_end, region, weibo_type, contain_type, status
             FROM tasks WHERE run_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok(RawTask {
                position: row.get(0)?,
                keyword: row.get(1)?,
                date_start: row.get(2)?,
                date_end: row.get(3)?,
                region: row.get(4)?,
                weibo_type: row.get(5)?,
                contain_type: row.get(6)?,
                status: row.get(7)?,
            })
        })?;

        let mut queue = Vec::new();
        for (expected, raw) in rows.enumerate() {
            let raw = raw?;
            if raw.position != expected as i64 {
                return Err(StorageError::Corrupt(format!(
                    "task queue has a gap at position {}",
                    expected
                )));
            }
            queue.push(raw.into_entry()?);
        }
        Ok(queue)
    }

    fn load_cursor(&self, run_id: i64) -> StorageResult<PageCursor> {
        let raw: Option<(i64, i64, i64)> = self
            .conn
            .query_row(
                "SELECT task_index, page_number, results_seen_on_task FROM cursors WHERE run_id = ?1",
                params![run_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (task_index, page_number, results_seen_on_task) = raw.ok_or_else(|| {
            StorageError::Corrupt(format!("run {} has no stored cursor", run_id))
        })?;

        Ok(PageCursor {
            task_index: to_unsigned(task_index, "cursor task index")?,
            page_number: to_unsigned(page_number, "cursor page number")?,
            results_seen_on_task: to_unsigned(results_seen_on_task, "cursor result count")?,
        })
    }

    fn load_seen(&self, run_id: i64) -> StorageResult<SeenSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT content_id FROM seen_ids WHERE run_id = ?1")?;
        let ids = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SeenSet::from_ids(ids))
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, fingerprint: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, fingerprint, status) VALUES (?1, ?2, ?3)",
            params![now, fingerprint, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.query_run(
            &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
            Some(run_id),
        )?
        .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.query_run(
            &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
            None,
        )
    }

    fn get_resumable_run(&self) -> StorageResult<Option<RunRecord>> {
        self.query_run(
            &format!(
                "SELECT {} FROM runs WHERE status IN ('{}', '{}', '{}') ORDER BY id DESC LIMIT 1",
                RUN_COLUMNS,
                RunStatus::Running.to_db_string(),
                RunStatus::Interrupted.to_db_string(),
                RunStatus::LimitReached.to_db_string()
            ),
            None,
        )
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn abandon_open_runs(&mut self) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let abandoned = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE status IN (?3, ?4, ?5)",
            params![
                RunStatus::Abandoned.to_db_string(),
                now,
                RunStatus::Running.to_db_string(),
                RunStatus::Interrupted.to_db_string(),
                RunStatus::LimitReached.to_db_string()
            ],
        )?;
        Ok(abandoned)
    }

    // ===== Ledger Persistence =====

    fn save_ledger(&mut self, ledger: &RunLedger) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE runs SET emitted_count = ?1 WHERE id = ?2",
            params![ledger.emitted_count as i64, ledger.run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(ledger.run_id));
        }

        // Splits shift every later position, so the queue is rewritten from
        // the first changed entry on
        if let Some(from) = ledger.unsaved_queue_from() {
            tx.execute(
                "DELETE FROM tasks WHERE run_id = ?1 AND position >= ?2",
                params![ledger.run_id, from as i64],
            )?;

            let mut insert = tx.prepare(
                "INSERT INTO tasks (run_id, position, keyword, date_start, date_end, region,
                 weibo_type, contain_type, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (position, entry) in ledger.queue.iter().enumerate().skip(from) {
                let task = &entry.task;
                insert.execute(params![
                    ledger.run_id,
                    position as i64,
                    task.keyword,
                    task.date_start.to_string(),
                    task.date_end.to_string(),
                    task.region,
                    task.weibo_type.code(),
                    task.contain_type.code(),
                    entry.status.to_db_string()
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO cursors (run_id, task_index, page_number, results_seen_on_task)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(run_id) DO UPDATE SET
                task_index = excluded.task_index,
                page_number = excluded.page_number,
                results_seen_on_task = excluded.results_seen_on_task",
            params![
                ledger.run_id,
                ledger.cursor.task_index as i64,
                ledger.cursor.page_number,
                ledger.cursor.results_seen_on_task as i64
            ],
        )?;

        {
            let mut insert =
                tx.prepare("INSERT OR IGNORE INTO seen_ids (run_id, content_id) VALUES (?1, ?2)")?;
            for content_id in ledger.unsaved_seen() {
                insert.execute(params![ledger.run_id, content_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load_ledger(&self, run_id: i64) -> StorageResult<RunLedger> {
        let run = self.get_run(run_id)?;
        let queue = self.load_queue(run_id)?;
        let cursor = self.load_cursor(run_id)?;
        let seen = self.load_seen(run_id)?;

        let ledger = RunLedger::restore(
            run.id,
            run.fingerprint,
            queue,
            cursor,
            run.emitted_count,
            seen,
        );
        ledger.validate().map_err(StorageError::Corrupt)?;
        Ok(ledger)
    }
}

/// Run row as stored, before status parsing
struct RawRun {
    id: i64,
    started_at: String,
    finished_at: Option<String>,
    fingerprint: String,
    status: String,
    emitted_count: i64,
}

fn raw_run(row: &Row<'_>) -> rusqlite::Result<RawRun> {
    Ok(RawRun {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        fingerprint: row.get(3)?,
        status: row.get(4)?,
        emitted_count: row.get(5)?,
    })
}

impl RawRun {
    fn into_record(self) -> StorageResult<RunRecord> {
        let status = RunStatus::from_db_string(&self.status).ok_or_else(|| {
            StorageError::Corrupt(format!("run {} has unknown status '{}'", self.id, self.status))
        })?;
        Ok(RunRecord {
            id: self.id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            fingerprint: self.fingerprint,
            status,
            emitted_count: to_unsigned(self.emitted_count, "emitted count")?,
        })
    }
}

/// Task row as stored, before field parsing
struct RawTask {
    position: i64,
    keyword: String,
    date_start: String,
    date_end: String,
    region: Option<String>,
    weibo_type: u8,
    contain_type: u8,
    status: String,
}

impl RawTask {
    fn into_entry(self) -> StorageResult<TaskEntry> {
        let position = self.position;
        let corrupt = |what: &str, value: &str| {
            StorageError::Corrupt(format!("task {} has invalid {} '{}'", position, what, value))
        };

        let date_start = NaiveDate::parse_from_str(&self.date_start, "%Y-%m-%d")
            .map_err(|_| corrupt("start date", &self.date_start))?;
        let date_end = NaiveDate::parse_from_str(&self.date_end, "%Y-%m-%d")
            .map_err(|_| corrupt("end date", &self.date_end))?;
        if date_start > date_end {
            return Err(corrupt("date range", &format!("{}..{}", date_start, date_end)));
        }

        let weibo_type = WeiboType::from_code(self.weibo_type)
            .ok_or_else(|| corrupt("weibo type", &self.weibo_type.to_string()))?;
        let contain_type = ContainType::from_code(self.contain_type)
            .ok_or_else(|| corrupt("contain type", &self.contain_type.to_string()))?;
        let status =
            TaskStatus::from_db_string(&self.status).ok_or_else(|| corrupt("status", &self.status))?;

        Ok(TaskEntry {
            task: SearchTask {
                keyword: self.keyword,
                date_start,
                date_end,
                region: self.region,
                weibo_type,
                contain_type,
            },
            status,
        })
    }
}

fn to_unsigned<T: TryFrom<i64>>(value: i64, what: &str) -> StorageResult<T> {
    T::try_from(value).map_err(|_| StorageError::Corrupt(format!("{} {} is out of range", what, value)))
}
