//! Graph store for pages and links
//!
//! This module persists the link graph built by the crawler:
//! - `Page` nodes keyed by canonical URL, with title, content, level and
//!   error annotations
//! - `LINKS_TO` edges between pages, at most one per ordered pair
//! - A history of crawl runs
//!
//! Every write is an upsert (create-if-absent, then set fields) executed in
//! its own transaction, so concurrent crawls can share one database.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteGraphStore;
pub use traits::{GraphStore, StoreError, StoreResult};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A page node as stored in the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageNode {
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    /// BFS depth from the seed of the run that last scanned this page
    pub level: Option<u32>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub error: bool,
    pub error_message: Option<String>,
}

impl PageNode {
    /// Returns true if this node only exists as a link target
    pub fn is_placeholder(&self) -> bool {
        self.last_scanned_at.is_none()
    }
}

/// Lightweight view of a page used in listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub url: String,
    pub title: Option<String>,
    pub level: Option<u32>,
    pub error: bool,
}

/// A page together with its direct neighbours in the graph
#[derive(Debug, Clone, Serialize)]
pub struct PageNeighborhood {
    pub page: PageNode,
    /// Targets of this page's outgoing `LINKS_TO` edges
    pub links_to: Vec<PageSummary>,
    /// Sources of incoming `LINKS_TO` edges
    pub linked_from: Vec<PageSummary>,
}

/// Represents a crawl run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub seed_url: String,
    pub max_depth: u32,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub nodes_scanned: u64,
    pub config_hash: String,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
