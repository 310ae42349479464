//! Graph store trait and error types

use crate::storage::{PageNeighborhood, PageNode, PageSummary, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during graph store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open graph store at {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for graph store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for graph store backends
///
/// Writes follow MERGE semantics: each call creates the node or edge if it
/// is missing and then sets fields, inside a single transaction. The crawler
/// does no locking of its own and relies on the backend to serialize
/// concurrent upserts to the same node.
pub trait GraphStore {
    // ===== Upserts =====

    /// Records a failed scan of `url`
    ///
    /// Ensures the node exists and sets `last_scanned_at = now`,
    /// `error = true` and `error_message`. Title, content and level are left
    /// as they were, so an earlier successful scan keeps its data.
    fn upsert_error(&mut self, url: &str, message: &str) -> StoreResult<()>;

    /// Records a successful scan of `url`
    ///
    /// Ensures the node exists and overwrites title, level and content, sets
    /// `last_scanned_at = now` and clears any error.
    fn upsert_page(&mut self, url: &str, title: &str, level: u32, content: &str)
        -> StoreResult<()>;

    /// Ensures a `LINKS_TO` edge from `source` to `target` exists
    ///
    /// Both nodes are created as placeholders if absent. Repeating the call
    /// never creates a second edge.
    fn upsert_edge(&mut self, source: &str, target: &str) -> StoreResult<()>;

    // ===== Reads =====

    /// Gets a page by URL
    fn get_page(&self, url: &str) -> StoreResult<Option<PageNode>>;

    /// Gets the targets of all outgoing edges of a page, sorted by URL
    fn outgoing_links(&self, url: &str) -> StoreResult<Vec<String>>;

    /// Lists pages recorded at level 0 (crawl seeds)
    fn root_pages(&self) -> StoreResult<Vec<PageSummary>>;

    /// Gets a page with its direct neighbours
    fn page_with_neighbors(&self, url: &str) -> StoreResult<Option<PageNeighborhood>>;

    /// Counts all page nodes
    fn count_pages(&self) -> StoreResult<u64>;

    /// Counts page nodes that have been scanned at least once
    fn count_scanned_pages(&self) -> StoreResult<u64>;

    /// Counts page nodes flagged with an error
    fn count_error_pages(&self) -> StoreResult<u64>;

    /// Counts all `LINKS_TO` edges
    fn count_edges(&self) -> StoreResult<u64>;

    /// Deletes every page and edge
    ///
    /// Run history is kept.
    fn reset(&mut self) -> StoreResult<()>;

    // ===== Run History =====

    /// Records the start of a crawl run and returns its ID
    fn begin_run(&mut self, seed_url: &str, max_depth: u32, config_hash: &str)
        -> StoreResult<i64>;

    /// Marks a run as finished
    fn finish_run(&mut self, run_id: i64, status: RunStatus, nodes_scanned: u64)
        -> StoreResult<()>;

    /// Counts recorded runs
    fn count_runs(&self) -> StoreResult<u64>;

    /// Lists the most recent runs, newest first
    fn list_runs(&self, limit: u32) -> StoreResult<Vec<RunRecord>>;
}
