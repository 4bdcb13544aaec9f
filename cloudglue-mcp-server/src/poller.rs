//! Job polling.
//!
//! Every asynchronous Cloudglue resource (analysis jobs, uploaded files, videos
//! being indexed into a collection) reports `pending`/`processing` until it
//! settles. [`JobPoller`] re-fetches such a resource at a fixed interval until
//! its status is anything else.

use crate::client::{CloudGlueApi, FetchOptions, Job, JobKind, Pollable};
use cloudglue_mcp_common::config::{Config, DEFAULT_POLL_INTERVAL_MS};
use cloudglue_mcp_common::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Interval and optional ceiling for status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Maximum number of re-fetches; `None` waits for as long as the job takes.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: None,
        }
    }
}

impl From<&Config> for PollPolicy {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.poll_interval,
            max_attempts: config.poll_max_attempts,
        }
    }
}

/// Drives pollable resources to a terminal state.
///
/// Sleeps go through `tokio::time`, so tests can run the poller under a paused
/// clock and observe exactly how long it waited.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobPoller {
    policy: PollPolicy,
}

impl JobPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll until `initial` (or a later snapshot) is terminal.
    ///
    /// Returns the terminal snapshot whatever its status; callers decide what a
    /// non-`completed` outcome means. Errors from `fetch` are returned as-is on
    /// the first occurrence.
    pub async fn poll_until_terminal<T, F, Fut>(&self, initial: T, mut fetch: F) -> Result<T>
    where
        T: Pollable,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut current = initial;
        let mut attempts: u32 = 0;

        while !current.status().is_terminal() {
            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return Err(Error::PollTimeout {
                        job_id: current.poll_id().to_string(),
                        attempts,
                    });
                }
            }

            tokio::time::sleep(self.policy.interval).await;
            attempts += 1;

            let id = current.poll_id().to_string();
            current = fetch(id).await?;
            debug!(
                id = %current.poll_id(),
                attempt = attempts,
                status = %current.status(),
                "Polled status"
            );
        }

        info!(id = %current.poll_id(), status = %current.status(), attempts, "Reached terminal state");
        Ok(current)
    }

    /// Fetch a job by id and wait for it to settle.
    pub async fn wait_for_job(
        &self,
        api: &dyn CloudGlueApi,
        kind: JobKind,
        job_id: &str,
        options: &FetchOptions,
    ) -> Result<Job> {
        let initial = api.get_job(kind, job_id, options).await?;
        self.poll_until_terminal(initial, |id| async move {
            api.get_job(kind, &id, options).await
        })
        .await
    }

    /// Wait for an uploaded file to finish processing.
    pub async fn wait_for_file(
        &self,
        api: &dyn CloudGlueApi,
        file: crate::client::FileRecord,
    ) -> Result<crate::client::FileRecord> {
        self.poll_until_terminal(file, |id| async move { api.get_file(&id).await })
            .await
    }

    /// Wait for a video to finish indexing into a collection.
    pub async fn wait_for_collection_video(
        &self,
        api: &dyn CloudGlueApi,
        collection_id: &str,
        video: crate::client::CollectionVideo,
    ) -> Result<crate::client::CollectionVideo> {
        self.poll_until_terminal(video, |file_id| async move {
            api.get_collection_video(collection_id, &file_id).await
        })
        .await
    }
}

/// Require a terminal job to have completed, forwarding the remote error otherwise.
pub fn ensure_completed(kind: JobKind, job: Job) -> Result<Job> {
    if job.status.is_completed() {
        return Ok(job);
    }
    let message = job
        .error_message()
        .unwrap_or_else(|| "job did not complete successfully".to_string());
    Err(Error::job_failed(kind.as_str(), job.job_id, job.status.as_str(), message))
}
