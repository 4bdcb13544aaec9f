//! Segmentation into chapters and camera shots, plus job listing.

use crate::client::{Job, JobKind, JobQuery, JobRequest, JobStatus, Segment};
use crate::handler::{check_not_empty, check_range, error_json, format_timestamp, to_pretty, validation_failure, CloudGlueHandler, ValidationError};
use crate::youtube::is_youtube_url;
use cloudglue_mcp_common::error::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::instrument;

const YOUTUBE_UNSUPPORTED: &str = "YouTube URLs are not supported for video segmentation. Please use Cloudglue URLs or direct HTTP video URLs instead.";

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SegmentVideoChaptersParams {
    /// Video URL: cloudglue://files/<id> or a direct HTTP(S) video URL. YouTube is not supported.
    pub url: String,
    /// Guidance for chapter detection, e.g. "Segment by speaker changes and topics"
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SegmentVideoCameraShotsParams {
    /// Video URL: cloudglue://files/<id> or a direct HTTP(S) video URL. YouTube is not supported.
    pub url: String,
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListJobsParams {
    /// Job family: describe, transcribe, extract or segment
    pub kind: JobKind,
    /// Maximum number of jobs to return (1-100)
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Only jobs for this URL
    #[serde(default)]
    pub url: Option<String>,
    /// Only jobs with this status, e.g. completed or failed
    #[serde(default)]
    pub status: Option<String>,
}

impl ListJobsParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_range(&mut errors, "limit", self.limit, 1, 100);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Segmentation strategy and the wording used in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Criteria {
    Narrative,
    Shot,
}

impl Criteria {
    fn as_str(self) -> &'static str {
        match self {
            Criteria::Narrative => "narrative",
            Criteria::Shot => "shot",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Criteria::Narrative => "chapter",
            Criteria::Shot => "camera shot",
        }
    }

    fn total_label(self) -> &'static str {
        match self {
            Criteria::Narrative => "Total chapters",
            Criteria::Shot => "Total shots",
        }
    }

    fn line(self, index: usize, segment: &Segment) -> String {
        let n = index + 1;
        match self {
            Criteria::Narrative => format!(
                "Chapter {}: {} - {}",
                n,
                format_timestamp(segment.start_time),
                segment
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("Chapter {}", n))
            ),
            Criteria::Shot => format!(
                "Shot {}: {} - {} ({:.1}s)",
                n,
                format_timestamp(segment.start_time),
                format_timestamp(segment.end_time),
                segment.end_time - segment.start_time
            ),
        }
    }

    /// Listing text, or `None` when the job produced no segments.
    fn render(self, job: &Job, reused: bool) -> Option<String> {
        let segments = job.segments.as_deref().filter(|s| !s.is_empty())?;
        let lines: Vec<String> = segments
            .iter()
            .enumerate()
            .map(|(i, s)| self.line(i, s))
            .collect();
        let heading = if reused {
            format!("Found existing {} segmentation:", self.noun())
        } else {
            format!("New {} segmentation created:", self.noun())
        };
        Some(format!(
            "{}\n\n{}\n\n{}: {}",
            heading,
            lines.join("\n"),
            self.total_label(),
            segments.len()
        ))
    }
}

impl CloudGlueHandler {
    async fn segment(&self, url: &str, criteria: Criteria, config: Option<(&str, Value)>) -> Result<String> {
        if is_youtube_url(url) {
            return Ok(error_json(YOUTUBE_UNSUPPORTED, json!({ "url": url })));
        }

        let lookup = JobQuery {
            criteria: Some(criteria.as_str().to_string()),
            ..JobQuery::latest_completed(url)
        };
        if let Some(existing) = self.find_completed(JobKind::Segment, &lookup).await {
            if let Some(text) = criteria.render(&existing, true) {
                return Ok(text);
            }
        }

        let mut request = JobRequest::new(JobKind::Segment, url).with("criteria", criteria.as_str());
        if let Some((key, value)) = config {
            request = request.with(key, value);
        }

        match self.run_job(request, &Default::default()).await {
            Ok(job) => Ok(criteria.render(&job, false).unwrap_or_else(|| {
                error_json(
                    format!("Failed to create {} segmentation - no segments were returned", criteria.noun()),
                    json!({ "url": url }),
                )
            })),
            Err(e) => Ok(error_json(e.to_string(), json!({ "url": url }))),
        }
    }

    /// Split a video into narrative chapters.
    #[instrument(level = "info", name = "segment_video_chapters", skip(self, params), fields(url = %params.url))]
    pub async fn segment_video_chapters(&self, params: SegmentVideoChaptersParams) -> Result<String> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "url", &params.url);
        if !errors.is_empty() {
            return Err(validation_failure(errors));
        }

        let mut narrative = Map::new();
        if let Some(prompt) = params.prompt.filter(|p| !p.trim().is_empty()) {
            narrative.insert("prompt".into(), Value::String(prompt));
        }
        self.segment(&params.url, Criteria::Narrative, Some(("narrative_config", Value::Object(narrative))))
            .await
    }

    /// Split a video into camera shots.
    #[instrument(level = "info", name = "segment_video_camera_shots", skip(self, params), fields(url = %params.url))]
    pub async fn segment_video_camera_shots(&self, params: SegmentVideoCameraShotsParams) -> Result<String> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "url", &params.url);
        if !errors.is_empty() {
            return Err(validation_failure(errors));
        }
        self.segment(&params.url, Criteria::Shot, None).await
    }

    /// Recent jobs of one kind.
    #[instrument(level = "info", name = "list_jobs", skip(self, params), fields(kind = %params.kind, limit = params.limit))]
    pub async fn list_jobs(&self, params: ListJobsParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let query = JobQuery {
            limit: params.limit,
            status: params.status.map(JobStatus::from),
            url: params.url,
            criteria: None,
        };
        let jobs = self.api.list_jobs(params.kind, &query).await?;
        Ok(to_pretty(&jobs))
    }
}
