//! Statistics generation from the graph store
//!
//! This module provides functionality for extracting and displaying
//! graph statistics through the `GraphStore` trait.

use crate::storage::{GraphStore, RunRecord, StoreResult};
use serde::Serialize;

/// Graph statistics summary
#[derive(Debug, Clone, Serialize)]
pub struct GraphStatistics {
    /// Total number of page nodes, placeholders included
    pub total_pages: u64,

    /// Pages that have been scanned at least once
    pub scanned_pages: u64,

    /// Pages whose last scan failed
    pub error_pages: u64,

    /// Total number of `LINKS_TO` edges
    pub total_edges: u64,

    /// Number of crawl runs recorded
    pub total_runs: u64,

    /// Most recent crawl run, if any
    pub last_run: Option<RunRecord>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The graph store to query
pub fn load_statistics(store: &dyn GraphStore) -> StoreResult<GraphStatistics> {
    let total_pages = store.count_pages()?;
    let scanned_pages = store.count_scanned_pages()?;
    let error_pages = store.count_error_pages()?;
    let total_edges = store.count_edges()?;
    let total_runs = store.count_runs()?;
    let last_run = store.list_runs(1)?.into_iter().next();

    Ok(GraphStatistics {
        total_pages,
        scanned_pages,
        error_pages,
        total_edges,
        total_runs,
        last_run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &GraphStatistics) {
    println!("=== Graph Statistics ===\n");

    println!("Overview:");
    println!("  Total pages: {}", stats.total_pages);
    println!(
        "  Scanned pages: {} ({} placeholders)",
        stats.scanned_pages,
        stats.total_pages.saturating_sub(stats.scanned_pages)
    );
    println!("  Error pages: {}", stats.error_pages);
    println!("  Total links: {}", stats.total_edges);
    println!("  Crawl runs: {}", stats.total_runs);
    println!();

    if let Some(run) = &stats.last_run {
        println!("Last Run:");
        println!("  #{} {} (max depth {})", run.id, run.seed_url, run.max_depth);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Pages scanned: {}", run.nodes_scanned);
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} scanned pages without error)",
        success_rate(stats),
        stats.scanned_pages.saturating_sub(stats.error_pages),
        stats.scanned_pages
    );
}

/// Percentage of scanned pages whose last scan succeeded
pub fn success_rate(stats: &GraphStatistics) -> f64 {
    if stats.scanned_pages == 0 {
        return 0.0;
    }
    let ok = stats.scanned_pages.saturating_sub(stats.error_pages);
    (ok as f64 / stats.scanned_pages as f64) * 100.0
}
