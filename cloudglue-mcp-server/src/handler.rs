//! Shared state and helpers for the Cloudglue tools.
//!
//! The tool implementations live in [`crate::tools`] as `impl CloudGlueHandler`
//! blocks; this module holds the handler itself, the reuse-then-create job
//! helpers and the small formatting utilities the tools share.

use crate::client::{CloudGlueApi, CloudGlueClient, FetchOptions, Job, JobKind, JobQuery, JobRequest};
use crate::poller::{ensure_completed, JobPoller, PollPolicy};
use crate::youtube::{is_youtube_url, YoutubeFeeds};
use cloudglue_mcp_common::config::Config;
use cloudglue_mcp_common::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const CLOUDGLUE_FILE_PREFIX: &str = "cloudglue://files/";

/// Validation error details for tool parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Fold a list of field errors into one [`Error::Validation`].
pub fn validation_failure(errors: Vec<ValidationError>) -> Error {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    Error::validation(messages.join("; "))
}

/// Push an error unless `value` lies in `min..=max`.
pub(crate) fn check_range(errors: &mut Vec<ValidationError>, field: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(ValidationError::new(
            field,
            format!("must be between {} and {}, got {}", min, max, value),
        ));
    }
}

/// Push an error if `value` is blank.
pub(crate) fn check_not_empty(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "cannot be empty"));
    }
}

/// File id of a `cloudglue://files/<id>` URL.
pub fn file_id_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(CLOUDGLUE_FILE_PREFIX).filter(|id| !id.is_empty())
}

pub fn is_cloudglue_url(url: &str) -> bool {
    url.starts_with("cloudglue://")
}

/// Analysis flags for describe and transcribe jobs.
///
/// Summaries are only requested for YouTube; on-screen text and visual scene
/// descriptions only for files stored in Cloudglue.
pub fn analysis_config(url: &str) -> Map<String, Value> {
    let cloudglue = is_cloudglue_url(url);
    let mut config = Map::new();
    config.insert("enable_summary".into(), Value::Bool(is_youtube_url(url)));
    config.insert("enable_speech".into(), Value::Bool(true));
    config.insert("enable_scene_text".into(), Value::Bool(cloudglue));
    config.insert("enable_visual_scene_description".into(), Value::Bool(cloudglue));
    config
}

/// Pretty-printed JSON for tool output.
pub fn to_pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// `{"error": message, ..context}` as pretty JSON.
pub fn error_json(message: impl Into<String>, context: Value) -> String {
    let mut body = Map::new();
    body.insert("error".into(), Value::String(message.into()));
    if let Value::Object(extra) = context {
        for (key, value) in extra {
            body.entry(key).or_insert(value);
        }
    }
    to_pretty(&Value::Object(body))
}

/// `MM:SS`, or `HH:MM:SS` from one hour on.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// `m:ss` as shown next to file durations.
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = (seconds % 60.0).round() as u64;
    format!("{}:{:02}", minutes, rest)
}

/// Handler shared by every Cloudglue tool.
#[derive(Clone)]
pub struct CloudGlueHandler {
    /// Remote API.
    pub api: Arc<dyn CloudGlueApi>,
    /// Drives jobs, uploads and collection videos to completion.
    pub poller: JobPoller,
    /// Playlist and channel expansion.
    pub youtube: YoutubeFeeds,
    /// Base for relative upload paths.
    pub working_dir: PathBuf,
}

impl fmt::Debug for CloudGlueHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudGlueHandler")
            .field("poller", &self.poller)
            .field("working_dir", &self.working_dir)
            .finish_non_exhaustive()
    }
}

impl CloudGlueHandler {
    /// Create a handler talking to the configured Cloudglue endpoint.
    #[instrument(level = "debug", name = "cloudglue_handler_new", skip_all)]
    pub fn new(config: &Config) -> Result<Self> {
        debug!(base_url = %config.base_url, "Initializing CloudGlueHandler");
        let client = CloudGlueClient::new(config)?;
        Ok(Self::with_deps(
            Arc::new(client),
            JobPoller::new(PollPolicy::from(config)),
            YoutubeFeeds::new(),
            config.working_dir.clone(),
        ))
    }

    /// Create a handler from explicit dependencies.
    pub fn with_deps(
        api: Arc<dyn CloudGlueApi>,
        poller: JobPoller,
        youtube: YoutubeFeeds,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            api,
            poller,
            youtube,
            working_dir,
        }
    }

    /// Most recent job matching `query`, if any.
    ///
    /// A failed lookup is a miss: the caller falls through to creating a job.
    pub async fn find_completed(&self, kind: JobKind, query: &JobQuery) -> Option<Job> {
        match self.api.list_jobs(kind, query).await {
            Ok(list) => list.data.into_iter().next(),
            Err(e) => {
                debug!(kind = %kind, error = %e, "Reuse lookup failed, treating as a miss");
                None
            }
        }
    }

    /// Submit a job and wait for it to complete.
    #[instrument(level = "debug", skip(self, request, options), fields(kind = %request.kind, url = %request.url))]
    pub async fn run_job(&self, request: JobRequest, options: &FetchOptions) -> Result<Job> {
        let kind = request.kind;
        let submitted = self.api.submit_job(&request).await?;
        info!(kind = %kind, job_id = %submitted.job_id, "Submitted job");

        let done = self
            .poller
            .wait_for_job(self.api.as_ref(), kind, &submitted.job_id, options)
            .await?;
        ensure_completed(kind, done)
    }
}
