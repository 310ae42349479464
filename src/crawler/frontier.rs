//! Breadth-first crawl frontier
//!
//! The frontier is local to one crawl invocation: a FIFO queue of
//! `(url, depth)` pairs plus the set of URLs already taken off it.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL taken off the frontier for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    pub url: Url,
    pub depth: u32,
}

/// FIFO queue with a visited set and a depth bound
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<QueuedUrl>,
    visited: HashSet<String>,
    max_depth: u32,
}

impl Frontier {
    /// Creates a frontier holding only the seed at depth 0
    pub fn new(seed: Url, max_depth: u32) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(QueuedUrl {
            url: seed,
            depth: 0,
        });

        Self {
            queue,
            visited: HashSet::new(),
            max_depth,
        }
    }

    /// Pops the next URL to process
    ///
    /// Entries already visited are skipped. Each popped URL is marked
    /// visited before the depth check, so an entry beyond `max_depth` is
    /// consumed without being returned.
    pub fn next(&mut self) -> Option<QueuedUrl> {
        while let Some(queued) = self.queue.pop_front() {
            if !self.visited.insert(queued.url.as_str().to_string()) {
                tracing::trace!("Skipping already visited {}", queued.url);
                continue;
            }

            if queued.depth > self.max_depth {
                tracing::trace!("Skipping {} beyond max depth", queued.url);
                continue;
            }

            return Some(queued);
        }

        None
    }

    /// Enqueues the children of a page processed at `parent_depth`
    ///
    /// Returns the number of URLs actually queued; visited URLs and children
    /// that would exceed `max_depth` are not queued.
    pub fn enqueue_children(&mut self, links: Vec<Url>, parent_depth: u32) -> usize {
        let depth = parent_depth.saturating_add(1);
        if depth > self.max_depth {
            return 0;
        }

        let mut queued = 0;
        for url in links {
            if self.visited.contains(url.as_str()) {
                continue;
            }
            self.queue.push_back(QueuedUrl { url, depth });
            queued += 1;
        }
        queued
    }

    /// Number of entries waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of distinct URLs taken off the queue so far
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
