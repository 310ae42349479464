//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the GraphStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{GraphStore, StoreError, StoreResult};
use crate::storage::{PageNeighborhood, PageNode, PageSummary, RunRecord, RunStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another connection's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PAGE_COLUMNS: &str =
    "url, title, content, level, last_scanned_at, error, error_message";

/// SQLite graph store backend
///
/// One instance wraps one connection. Crawl invocations open their own
/// instance and drop it when they finish.
pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Opens (or creates) a graph store database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteGraphStore)` - Successfully opened/created database
    /// * `Err(StoreError::Open)` - The database could not be opened
    pub fn open(path: &Path) -> StoreResult<Self> {
        let open_err = |source| StoreError::Open {
            path: path.display().to_string(),
            source,
        };

        let conn = Connection::open(path).map_err(open_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(open_err)?;

        // WAL lets concurrent crawl runs read while one of them writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )
        .map_err(open_err)?;

        initialize_schema(&conn).map_err(open_err)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn summaries(&self, sql: &str, url: &str) -> StoreResult<Vec<PageSummary>> {
        let mut stmt = self.conn.prepare(sql)?;
        let pages = stmt
            .query_map(params![url], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }
}

/// Current time in a fixed-width RFC 3339 form, so stored timestamps
/// compare correctly as text
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageNode> {
    let last_scanned_at: Option<String> = row.get(4)?;
    Ok(PageNode {
        url: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        level: row.get(3)?,
        last_scanned_at: last_scanned_at.and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        error: row.get(5)?,
        error_message: row.get(6)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<PageSummary> {
    Ok(PageSummary {
        url: row.get(0)?,
        title: row.get(1)?,
        level: row.get(2)?,
        error: row.get(3)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        seed_url: row.get(1)?,
        max_depth: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Failed),
        nodes_scanned: row.get::<_, i64>(6)? as u64,
        config_hash: row.get(7)?,
    })
}

impl GraphStore for SqliteGraphStore {
    // ===== Upserts =====

    fn upsert_error(&mut self, url: &str, message: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO pages (url, last_scanned_at, error, error_message) VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(url) DO UPDATE SET
                last_scanned_at = MAX(COALESCE(pages.last_scanned_at, ''), excluded.last_scanned_at),
                error = 1,
                error_message = excluded.error_message",
            params![url, now_timestamp(), message],
        )?;
        Ok(())
    }

    fn upsert_page(
        &mut self,
        url: &str,
        title: &str,
        level: u32,
        content: &str,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO pages (url, title, content, level, last_scanned_at, error, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                level = excluded.level,
                last_scanned_at = MAX(COALESCE(pages.last_scanned_at, ''), excluded.last_scanned_at),
                error = 0,
                error_message = NULL",
            params![url, title, content, level, now_timestamp()],
        )?;
        Ok(())
    }

    fn upsert_edge(&mut self, source: &str, target: &str) -> StoreResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT OR IGNORE INTO pages (url) VALUES (?1)",
            params![source],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO pages (url) VALUES (?1)",
            params![target],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO links_to (source_url, target_url) VALUES (?1, ?2)",
            params![source, target],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ===== Reads =====

    fn get_page(&self, url: &str) -> StoreResult<Option<PageNode>> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS),
                params![url],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn outgoing_links(&self, url: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT target_url FROM links_to WHERE source_url = ?1 ORDER BY target_url",
        )?;
        let targets = stmt
            .query_map(params![url], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(targets)
    }

    fn root_pages(&self) -> StoreResult<Vec<PageSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, title, level, error FROM pages WHERE level = 0 ORDER BY url",
        )?;
        let roots = stmt
            .query_map([], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roots)
    }

    fn page_with_neighbors(&self, url: &str) -> StoreResult<Option<PageNeighborhood>> {
        let page = match self.get_page(url)? {
            Some(page) => page,
            None => return Ok(None),
        };

        let links_to = self.summaries(
            "SELECT p.url, p.title, p.level, p.error FROM links_to l
             JOIN pages p ON p.url = l.target_url
             WHERE l.source_url = ?1 ORDER BY p.url",
            url,
        )?;
        let linked_from = self.summaries(
            "SELECT p.url, p.title, p.level, p.error FROM links_to l
             JOIN pages p ON p.url = l.source_url
             WHERE l.target_url = ?1 ORDER BY p.url",
            url,
        )?;

        Ok(Some(PageNeighborhood {
            page,
            links_to,
            linked_from,
        }))
    }

    fn count_pages(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM pages")
    }

    fn count_scanned_pages(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM pages WHERE last_scanned_at IS NOT NULL")
    }

    fn count_error_pages(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM pages WHERE error = 1")
    }

    fn count_edges(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM links_to")
    }

    fn reset(&mut self) -> StoreResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM links_to", [])?;
        tx.execute("DELETE FROM pages", [])?;
        tx.commit()?;
        Ok(())
    }

    // ===== Run History =====

    fn begin_run(
        &mut self,
        seed_url: &str,
        max_depth: u32,
        config_hash: &str,
    ) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (seed_url, max_depth, started_at, status, config_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                seed_url,
                max_depth,
                now_timestamp(),
                RunStatus::Running.to_db_string(),
                config_hash
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        nodes_scanned: u64,
    ) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, nodes_scanned = ?3 WHERE id = ?4",
            params![
                status.to_db_string(),
                now_timestamp(),
                nodes_scanned as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    fn count_runs(&self) -> StoreResult<u64> {
        self.count("SELECT COUNT(*) FROM runs")
    }

    fn list_runs(&self, limit: u32) -> StoreResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed_url, max_depth, started_at, finished_at, status, nodes_scanned, config_hash
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map(params![limit], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}
