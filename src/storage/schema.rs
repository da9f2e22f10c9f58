//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the run ledger database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    fingerprint TEXT NOT NULL,
    status TEXT NOT NULL,
    emitted_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

-- Task queue of a run, in execution order
CREATE TABLE IF NOT EXISTS tasks (
    run_id INTEGER NOT NULL REFERENCES runs(id),
    position INTEGER NOT NULL,
    keyword TEXT NOT NULL,
    date_start TEXT NOT NULL,
    date_end TEXT NOT NULL,
    region TEXT,
    weibo_type INTEGER NOT NULL,
    contain_type INTEGER NOT NULL,
    status TEXT NOT NULL,
    PRIMARY KEY (run_id, position)
);

-- Page cursor of a run
CREATE TABLE IF NOT EXISTS cursors (
    run_id INTEGER PRIMARY KEY REFERENCES runs(id),
    task_index INTEGER NOT NULL,
    page_number INTEGER NOT NULL,
    results_seen_on_task INTEGER NOT NULL
);

-- Content ids emitted during a run
CREATE TABLE IF NOT EXISTS seen_ids (
    run_id INTEGER NOT NULL REFERENCES runs(id),
    content_id TEXT NOT NULL,
    PRIMARY KEY (run_id, content_id)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
