//! Job dispatcher running crawls as tokio tasks

use crate::config::Config;
use crate::crawler::crawl;
use crate::jobs::{JobId, JobStatus, ScanRequest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};

/// Schedules crawl invocations and tracks their status
///
/// Jobs share nothing in memory: each one opens its own store connection
/// and drops it when the crawl ends. A job that fails is not retried.
pub struct JobDispatcher {
    config: Arc<Config>,
    config_hash: Arc<str>,
    permits: Arc<Semaphore>,
    jobs: Mutex<HashMap<JobId, watch::Receiver<JobStatus>>>,
    next_id: AtomicU64,
}

impl JobDispatcher {
    /// Creates a dispatcher
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration shared by every job
    /// * `config_hash` - Configuration hash recorded with each run
    pub fn new(config: Config, config_hash: impl Into<String>) -> Self {
        let max_jobs = config.jobs.max_concurrent_jobs.max(1) as usize;
        let config_hash: String = config_hash.into();

        Self {
            config: Arc::new(config),
            config_hash: Arc::from(config_hash),
            permits: Arc::new(Semaphore::new(max_jobs)),
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Schedules a crawl and returns its ID without waiting
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, request: ScanRequest) -> JobId {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = watch::channel(JobStatus::Queued);

        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, rx);

        let config = Arc::clone(&self.config);
        let config_hash = Arc::clone(&self.config_hash);
        let permits = Arc::clone(&self.permits);

        tracing::debug!("Submitted {} for {}", id, request.url);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tx.send_replace(JobStatus::Failed(e.to_string()));
                    return;
                }
            };

            tx.send_replace(JobStatus::Running);
            tracing::info!("Running {}: {} (max depth {})", id, request.url, request.max_depth);

            let status = match crawl(&config, &request.url, request.max_depth, &config_hash).await
            {
                Ok(report) => JobStatus::Completed(report),
                Err(e) => {
                    tracing::error!("{} failed: {}", id, e);
                    JobStatus::Failed(e.to_string())
                }
            };

            tx.send_replace(status);
        });

        id
    }

    /// Returns the current status of a job, or None for an unknown ID
    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.receiver(id).map(|rx| rx.borrow().clone())
    }

    /// Waits until a job reaches a terminal state
    ///
    /// Returns None for an unknown ID. A job whose task ended without
    /// publishing a result is reported as failed.
    pub async fn wait(&self, id: JobId) -> Option<JobStatus> {
        let mut rx = self.receiver(id)?;

        let waited = rx
            .wait_for(JobStatus::is_terminal)
            .await
            .map(|status| status.clone());
        let status = match waited {
            Ok(status) => status,
            Err(_) => rx.borrow().clone(),
        };

        if status.is_terminal() {
            Some(status)
        } else {
            Some(JobStatus::Failed(format!("{} ended unexpectedly", id)))
        }
    }

    /// IDs of every job submitted so far, in submission order
    pub fn job_ids(&self) -> Vec<JobId> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<JobId> = jobs.keys().copied().collect();
        ids.sort();
        ids
    }

    fn receiver(&self, id: JobId) -> Option<watch::Receiver<JobStatus>> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }
}
