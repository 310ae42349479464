//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop for one invocation:
//! - Seeding the frontier and recording the run
//! - Fetching pages one at a time in breadth-first order
//! - Extracting content and same-host links
//! - Writing pages, edges and per-URL failures to the graph store
//!
//! A crawl never fails once it has a store. Every per-URL problem is
//! recorded on that URL's node and the loop moves on.

use crate::crawler::content::{check_content_type, decode_html, extract_content};
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::links::extract_links;
use crate::storage::{GraphStore, RunStatus};
use crate::url::canonicalize;
use scraper::Html;
use serde::Serialize;
use std::time::Instant;
use url::Url;

/// Summary of one crawl invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// `Completed` for every traversal that ran; `Failed` if the seed was unusable
    pub status: RunStatus,
    pub seed_url: String,
    pub max_depth: u32,
    /// URLs fetched, parsed and written without error
    pub nodes_scanned: u64,
    /// URLs recorded as error nodes
    pub nodes_failed: u64,
    /// Run history ID, if the run could be recorded
    pub run_id: Option<i64>,
}

/// Drives one crawl against a graph store
pub struct Coordinator<S: GraphStore> {
    store: S,
    fetcher: Fetcher,
    config_hash: String,
}

impl<S: GraphStore> Coordinator<S> {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `store` - An open graph store, owned for the duration of the crawl
    /// * `fetcher` - The HTTP fetcher
    /// * `config_hash` - Hash of the configuration, recorded in run history
    pub fn new(store: S, fetcher: Fetcher, config_hash: impl Into<String>) -> Self {
        Self {
            store,
            fetcher,
            config_hash: config_hash.into(),
        }
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the coordinator and returns the store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Crawls breadth-first from `seed` down to `max_depth`
    ///
    /// The seed is processed at depth 0. Links found on a page at depth `d`
    /// are written as edges regardless of depth, but only queued for
    /// fetching if `d + 1 <= max_depth`.
    pub async fn crawl(&mut self, seed: &str, max_depth: u32) -> CrawlReport {
        let run_id = match self.store.begin_run(seed, max_depth, &self.config_hash) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to record run start for {}: {}", seed, e);
                None
            }
        };

        let mut report = CrawlReport {
            status: RunStatus::Completed,
            seed_url: seed.to_string(),
            max_depth,
            nodes_scanned: 0,
            nodes_failed: 0,
            run_id,
        };

        match canonicalize(seed) {
            Ok(seed_url) => {
                tracing::info!(
                    "Starting crawl of {} (max depth {}, run {:?})",
                    seed_url,
                    max_depth,
                    run_id
                );
                report.seed_url = seed_url.to_string();
                self.traverse(seed_url, max_depth, &mut report).await;
            }
            Err(e) => {
                tracing::warn!("Invalid seed URL {:?}: {}", seed, e);
                self.record_error(seed, &format!("Invalid URL: {}", e));
                report.nodes_failed = 1;
                report.status = RunStatus::Failed;
            }
        }

        if let Some(id) = run_id {
            if let Err(e) = self
                .store
                .finish_run(id, report.status, report.nodes_scanned)
            {
                tracing::warn!("Failed to record run end for run {}: {}", id, e);
            }
        }

        tracing::info!(
            "Crawl of {} finished: {} scanned, {} failed",
            report.seed_url,
            report.nodes_scanned,
            report.nodes_failed
        );

        report
    }

    async fn traverse(&mut self, seed: Url, max_depth: u32, report: &mut CrawlReport) {
        let mut frontier = Frontier::new(seed, max_depth);
        let start_time = Instant::now();
        let mut processed: u64 = 0;

        while let Some(queued) = frontier.next() {
            tracing::debug!("Processing {} at depth {}", queued.url, queued.depth);

            match self.fetcher.fetch(&queued.url).await {
                Ok(page) => match self.process_page(&queued.url, queued.depth, &page) {
                    Ok(links) => {
                        report.nodes_scanned += 1;
                        frontier.enqueue_children(links, queued.depth);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to process {}: {}", queued.url, e);
                        self.record_error(queued.url.as_str(), &e.to_string());
                        report.nodes_failed += 1;
                    }
                },
                Err(e) => {
                    if e.is_transport() {
                        tracing::warn!("Could not reach {}: {}", queued.url, e);
                    } else {
                        tracing::warn!("Fetch of {} rejected: {}", queued.url, e);
                    }
                    self.record_error(queued.url.as_str(), &e.to_string());
                    report.nodes_failed += 1;
                }
            }

            processed += 1;
            if processed % 10 == 0 {
                let rate = processed as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages processed, {} in frontier, {:.2} pages/sec",
                    processed,
                    frontier.len(),
                    rate
                );
            }
        }
    }

    /// Extracts a fetched page and writes its node and outgoing edges
    ///
    /// Returns the links to enqueue. The parsed document never outlives this
    /// call.
    fn process_page(
        &mut self,
        url: &Url,
        depth: u32,
        page: &FetchedPage,
    ) -> crate::Result<Vec<Url>> {
        check_content_type(page.content_type.as_deref())?;

        let (extracted, links) = {
            let html = decode_html(&page.body);
            let document = Html::parse_document(&html);
            (extract_content(&document), extract_links(&document, url))
        };

        let title = if extracted.title.is_empty() {
            url.as_str()
        } else {
            extracted.title.as_str()
        };

        self.store
            .upsert_page(url.as_str(), title, depth, &extracted.content())?;

        for link in &links {
            self.store.upsert_edge(url.as_str(), link.as_str())?;
        }

        tracing::debug!(
            "Stored {} ({} blocks, {} links)",
            url,
            extracted.blocks.len(),
            links.len()
        );

        Ok(links)
    }

    fn record_error(&mut self, url: &str, message: &str) {
        if let Err(e) = self.store.upsert_error(url, message) {
            tracing::error!("Failed to record error for {}: {}", url, e);
        }
    }
}
