//! Crawler module for building the link graph
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of raw page bytes
//! - Encoding detection and content extraction
//! - Same-host link extraction
//! - The breadth-first frontier
//! - Overall crawl coordination

mod content;
mod coordinator;
mod fetcher;
mod frontier;
mod links;

pub use content::{
    check_content_type, decode_html, detect_encoding, extract_content, ExtractedPage, ParseError,
    MIN_BLOCK_CHARS,
};
pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher};
pub use frontier::{Frontier, QueuedUrl};
pub use links::{extract_links, MAX_LINKS_PER_PAGE};

use crate::config::Config;
use crate::storage::SqliteGraphStore;
use crate::Result;
use std::path::Path;

/// Runs a complete crawl against the configured store
///
/// This is the main entry point for one crawl invocation. It will:
/// 1. Open the graph store at `config.store.database_path`
/// 2. Build the HTTP client
/// 3. Crawl breadth-first from `seed` down to `max_depth`
///
/// Only steps 1 and 2 can fail. Once the crawl starts, per-URL failures
/// are recorded in the graph and reflected in the returned report.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seed` - The seed URL, as given by the caller
/// * `max_depth` - Maximum BFS depth to fetch
/// * `config_hash` - Configuration hash recorded with the run
pub async fn crawl(
    config: &Config,
    seed: &str,
    max_depth: u32,
    config_hash: &str,
) -> Result<CrawlReport> {
    let store = SqliteGraphStore::open(Path::new(&config.store.database_path))?;
    let fetcher = Fetcher::new(config)?;

    let mut coordinator = Coordinator::new(store, fetcher, config_hash);
    Ok(coordinator.crawl(seed, max_depth).await)
}
