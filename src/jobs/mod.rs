//! Asynchronous crawl jobs
//!
//! A caller submits a `ScanRequest` and gets a `JobId` back immediately.
//! Each job runs one crawl invocation as a tokio task; the number of jobs
//! running at once is bounded by `jobs.max-concurrent-jobs`. Job status is
//! published on a watch channel per job and can be polled or awaited.

mod dispatcher;

pub use dispatcher::JobDispatcher;

use crate::crawler::CrawlReport;
use serde::Serialize;
use std::fmt;

/// Identifier of a submitted job, unique within one dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// A request to crawl from one seed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub url: String,
    pub max_depth: u32,
}

impl ScanRequest {
    pub fn new(url: impl Into<String>, max_depth: u32) -> Self {
        Self {
            url: url.into(),
            max_depth,
        }
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "result", rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a concurrency permit
    Queued,
    Running,
    Completed(CrawlReport),
    /// The crawl could not start (e.g. the store could not be opened)
    Failed(String),
}

impl JobStatus {
    /// Returns true once the job will not change state again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}
