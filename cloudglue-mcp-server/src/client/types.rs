//! Wire types for the Cloudglue REST API.
//!
//! Only the fields the tools read are modelled; everything else is kept in an
//! `extra` map so payloads can be passed through to the caller untouched.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Asynchronous analysis job families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Describe,
    Transcribe,
    Extract,
    Segment,
}

impl JobKind {
    /// REST collection path for this job family.
    pub fn path(self) -> &'static str {
        match self {
            JobKind::Describe => "describe",
            JobKind::Transcribe => "transcribe",
            JobKind::Extract => "extract",
            JobKind::Segment => "segments",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Describe => "describe",
            JobKind::Transcribe => "transcribe",
            JobKind::Extract => "extract",
            JobKind::Segment => "segment",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state reported by the remote for jobs, files and collection videos.
///
/// Unrecognised values are preserved in `Other` and count as terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl JobStatus {
    /// Anything other than `pending` or `processing` is final.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Other(s) => s,
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Other("unknown".to_string())
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => JobStatus::Pending,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the poller can drive to a terminal state.
pub trait Pollable {
    fn status(&self) -> &JobStatus;
    /// Identifier used in logs and timeout errors.
    fn poll_id(&self) -> &str;
}

/// Extraction settings echoed back on extract jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_video_level_entities: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_segment_level_entities: Option<bool>,
}

/// One time span produced by a segmentation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A describe, transcribe, extract or segment job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_config: Option<ExtractConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// Markdown/text content, when the job was fetched with a text format.
    pub fn content(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Text content, or the raw data serialised as JSON.
    pub fn content_or_data(&self) -> String {
        match self.content() {
            Some(content) => content.to_string(),
            None => self
                .data
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_default(),
        }
    }

    /// Remote error detail, if the remote sent one.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(Value::Object(obj.clone()).to_string())),
            other => Some(other.to_string()),
        }
    }
}

impl Pollable for Job {
    fn status(&self) -> &JobStatus {
        &self.status
    }

    fn poll_id(&self) -> &str {
        &self.job_id
    }
}

/// Technical details of an uploaded video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_audio: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A file stored in Cloudglue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_info: Option<VideoInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileRecord {
    pub fn duration_seconds(&self) -> Option<f64> {
        self.video_info.as_ref().and_then(|v| v.duration_seconds)
    }
}

impl Pollable for FileRecord {
    fn status(&self) -> &JobStatus {
        &self.status
    }

    fn poll_id(&self) -> &str {
        &self.id
    }
}

/// Membership of a file in a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionVideo {
    #[serde(default)]
    pub collection_id: String,
    pub file_id: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pollable for CollectionVideo {
    fn status(&self) -> &JobStatus {
        &self.status
    }

    fn poll_id(&self) -> &str {
        &self.file_id
    }
}

/// A named group of videos sharing one analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Paged list envelope used by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        let total = data.len() as u64;
        Self {
            data,
            total: Some(total),
            limit: None,
            offset: None,
        }
    }
}

/// Representation requested when fetching job results or collection artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Json,
    Markdown,
}

/// Query parameters for result fetches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl FetchOptions {
    pub fn markdown() -> Self {
        Self {
            response_format: Some(ResponseFormat::Markdown),
            ..Default::default()
        }
    }

    pub fn with_window(mut self, start: f64, end: f64) -> Self {
        self.start_time_seconds = Some(start);
        self.end_time_seconds = Some(end);
        self
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// Filters for listing jobs of one kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobQuery {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
}

impl JobQuery {
    /// The single most recent completed job for a URL.
    pub fn latest_completed(url: &str) -> Self {
        Self {
            limit: 1,
            status: Some(JobStatus::Completed),
            url: Some(url.to_string()),
            criteria: None,
        }
    }
}

/// Submission of a new analysis job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub kind: JobKind,
    pub url: String,
    /// Kind-specific settings merged into the request body next to `url`.
    pub config: Map<String, Value>,
}

impl JobRequest {
    pub fn new(kind: JobKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            config: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }

    /// JSON body sent to the remote.
    pub fn body(&self) -> Value {
        let mut body = self.config.clone();
        body.insert("url".to_string(), Value::String(self.url.clone()));
        Value::Object(body)
    }
}

/// Per-video artifacts a collection produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    MediaDescriptions,
    RichTranscripts,
    Entities,
}

impl ArtifactKind {
    pub fn path(self) -> &'static str {
        match self {
            ArtifactKind::MediaDescriptions => "media-descriptions",
            ArtifactKind::RichTranscripts => "rich-transcripts",
            ArtifactKind::Entities => "entities",
        }
    }
}

/// How a video is added to a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    FileId(String),
    Url(String),
}

impl VideoSource {
    pub fn body(&self) -> Value {
        match self {
            VideoSource::FileId(id) => serde_json::json!({ "file_id": id }),
            VideoSource::Url(url) => serde_json::json!({ "url": url }),
        }
    }
}

/// Body for creating a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    pub collection_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type-specific configuration objects such as `describe_config`.
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

/// Query for listing collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionQuery {
    pub limit: u32,
    pub offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_type: Option<String>,
}

/// A local file ready for multipart upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub metadata: Value,
}

/// Granularity of semantic search hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    Segment,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub collections: Vec<String>,
    pub query: String,
    pub limit: u32,
    pub scope: SearchScope,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub collections: Vec<String>,
    pub force_search: bool,
    pub include_citations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    #[serde(default)]
    pub citations: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletion {
    /// Content and citations of the first choice, if it carries any text.
    pub fn first_answer(&self) -> Option<(&str, &[Value])> {
        let choice = self.choices.first()?;
        if choice.message.content.is_empty() {
            return None;
        }
        Some((
            choice.message.content.as_str(),
            choice.citations.as_deref().unwrap_or(&[]),
        ))
    }
}
