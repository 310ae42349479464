//! Output module for printing crawl reports and graph queries
//!
//! This module handles:
//! - Human-readable reports for the CLI
//! - JSON output of any result for `--json`
//! - Graph statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, success_rate, GraphStatistics};

use crate::crawler::CrawlReport;
use crate::jobs::JobId;
use crate::storage::{PageNeighborhood, PageSummary, RunRecord};
use serde::Serialize;

/// Prints a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints the report of a finished crawl job
pub fn print_report(id: JobId, report: &CrawlReport) {
    println!(
        "{} {} [{}] max depth {}: {} scanned, {} failed",
        id,
        report.seed_url,
        report.status.to_db_string(),
        report.max_depth,
        report.nodes_scanned,
        report.nodes_failed
    );
}

/// Prints the root pages of the graph
pub fn print_roots(roots: &[PageSummary]) {
    if roots.is_empty() {
        println!("No root pages. Run `sitegraph scan <URL>` first.");
        return;
    }

    println!("=== Root Pages ({}) ===\n", roots.len());
    for page in roots {
        print_summary_line(page);
    }
}

/// Prints one page with its incoming and outgoing links
pub fn print_neighborhood(neighborhood: &PageNeighborhood) {
    let page = &neighborhood.page;

    println!("URL: {}", page.url);
    if let Some(title) = &page.title {
        println!("Title: {}", title);
    }
    match page.level {
        Some(level) => println!("Level: {}", level),
        None => println!("Level: -"),
    }
    match &page.last_scanned_at {
        Some(at) => println!("Last scanned: {}", at.to_rfc3339()),
        None => println!("Last scanned: never (placeholder)"),
    }
    if page.error {
        println!(
            "Error: {}",
            page.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    if let Some(content) = page.content.as_deref().filter(|c| !c.is_empty()) {
        println!("\nContent:\n{}", content);
    }

    println!("\nLinks to ({}):", neighborhood.links_to.len());
    for target in &neighborhood.links_to {
        print_summary_line(target);
    }

    println!("\nLinked from ({}):", neighborhood.linked_from.len());
    for source in &neighborhood.linked_from {
        print_summary_line(source);
    }
}

/// Prints the run history table
pub fn print_runs(runs: &[RunRecord]) {
    if runs.is_empty() {
        println!("No crawl runs recorded.");
        return;
    }

    println!(
        "{:>5}  {:<10}  {:>5}  {:>8}  {:<27}  {}",
        "ID", "STATUS", "DEPTH", "SCANNED", "STARTED", "SEED"
    );
    for run in runs {
        println!(
            "{:>5}  {:<10}  {:>5}  {:>8}  {:<27}  {}",
            run.id,
            run.status.to_db_string(),
            run.max_depth,
            run.nodes_scanned,
            run.started_at,
            run.seed_url
        );
    }
}

fn print_summary_line(page: &PageSummary) {
    let marker = if page.error { " [error]" } else { "" };
    match &page.title {
        Some(title) if title != &page.url => println!("  - {} ({}){}", page.url, title, marker),
        _ => println!("  - {}{}", page.url, marker),
    }
}
