//! Describe, transcribe and entity extraction.
//!
//! Each tool looks for an existing result before paying for a new job: first
//! the artifact a collection already produced for the file, then the latest
//! completed job for the same URL, and only then a fresh submission.

use crate::batch::{run_batched, tally, URL_BATCH_SIZE};
use crate::client::{ArtifactKind, FetchOptions, Job, JobKind, JobQuery, JobRequest, JobStatus};
use crate::handler::{
    analysis_config, check_not_empty, error_json, file_id_from_url, to_pretty, validation_failure, CloudGlueHandler,
    ValidationError,
};
use crate::pagination::{EntityPage, TimeWindow};
use cloudglue_mcp_common::error::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

/// Most URLs accepted by one multi-URL call.
pub const MAX_URLS: usize = 50;

/// Completed extract jobs inspected when looking for a prompt match.
const EXTRACT_LOOKUP_LIMIT: u32 = 10;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeVideoParams {
    /// Video URL: cloudglue://files/<id>, YouTube, or public HTTP(S) URL
    pub url: String,
    /// Collection to check for an existing media description first
    #[serde(default)]
    pub collection_id: Option<String>,
    /// Zero-based 5-minute page of the description. Omit for the whole video.
    #[serde(default)]
    pub page: Option<u32>,
    /// Skip reuse and always run a new describe job
    #[serde(default)]
    pub force_new: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TranscribeVideoParams {
    /// Single video URL. Provide either url or urls.
    #[serde(default)]
    pub url: Option<String>,
    /// Up to 50 video URLs, transcribed 10 at a time
    #[serde(default)]
    pub urls: Option<Vec<String>>,
    /// Collection to check for an existing rich transcript first
    #[serde(default)]
    pub collection_id: Option<String>,
    /// Skip reuse and always run a new transcribe job
    #[serde(default)]
    pub force_new: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExtractVideoEntitiesParams {
    /// Single video URL. Provide either url or urls.
    #[serde(default)]
    pub url: Option<String>,
    /// Up to 50 video URLs, processed 10 at a time
    #[serde(default)]
    pub urls: Option<Vec<String>>,
    /// What to extract, e.g. "people, products and brands mentioned"
    pub prompt: String,
    /// Entities collection to read existing results from
    #[serde(default)]
    pub collection_id: Option<String>,
    /// Zero-based page of segment-level entities (25 per page)
    #[serde(default)]
    pub page: u32,
}

/// Exactly one of `url` and `urls`, with `urls` bounded.
fn check_url_choice(errors: &mut Vec<ValidationError>, url: Option<&String>, urls: Option<&Vec<String>>) {
    match (url, urls) {
        (Some(_), Some(_)) => errors.push(ValidationError::new("url", "provide either url or urls, not both")),
        (None, None) => errors.push(ValidationError::new("url", "either url or urls is required")),
        (Some(url), None) => check_not_empty(errors, "url", url),
        (None, Some(urls)) => {
            if urls.is_empty() {
                errors.push(ValidationError::new("urls", "cannot be empty"));
            } else if urls.len() > MAX_URLS {
                errors.push(ValidationError::new(
                    "urls",
                    format!("at most {} URLs are allowed, got {}", MAX_URLS, urls.len()),
                ));
            }
        }
    }
}

impl DescribeVideoParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "url", &self.url);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl TranscribeVideoParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_url_choice(&mut errors, self.url.as_ref(), self.urls.as_ref());
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl ExtractVideoEntitiesParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_url_choice(&mut errors, self.url.as_ref(), self.urls.as_ref());
        check_not_empty(&mut errors, "prompt", &self.prompt);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Aggregate of a multi-URL run.
fn batch_summary<R: serde::Serialize>(items: &[crate::batch::BatchItem<String, R>]) -> String {
    let (successful, failed) = tally(items);
    to_pretty(&json!({
        "total": items.len(),
        "successful": successful,
        "failed": failed,
        "results": items,
    }))
}

/// True when a finished extract job was run with this exact prompt and both entity levels.
fn extract_job_matches(job: &Job, prompt: &str) -> bool {
    job.extract_config.as_ref().is_some_and(|config| {
        config.prompt.as_deref() == Some(prompt)
            && config.enable_video_level_entities == Some(true)
            && config.enable_segment_level_entities == Some(true)
    })
}

/// Entity payload with segment entities paged client-side.
fn entities_from_data(data: Option<&Value>, page: EntityPage) -> Value {
    let video_level = data
        .and_then(|d| d.get("entities"))
        .cloned()
        .unwrap_or_else(|| json!({}));
    let segments: &[Value] = data
        .and_then(|d| d.get("segment_entities"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    json!({
        "video_level_entities": video_level,
        "segment_level_entities": {
            "entities": page.slice(segments),
            "page": page.page,
            "total_pages": EntityPage::total_pages(segments.len() as u64),
        },
    })
}

impl CloudGlueHandler {
    /// Duration of a Cloudglue file, when the URL names one.
    async fn url_duration(&self, url: &str) -> Option<f64> {
        let file_id = file_id_from_url(url)?;
        match self.api.get_file(file_id).await {
            Ok(file) => file.duration_seconds(),
            Err(e) => {
                debug!(file_id, error = %e, "Could not read file duration");
                None
            }
        }
    }

    /// Text of a collection artifact for a `cloudglue://files/` URL.
    async fn collection_text(
        &self,
        collection_id: Option<&str>,
        url: &str,
        kind: ArtifactKind,
        options: &FetchOptions,
    ) -> Option<String> {
        let collection_id = collection_id?;
        let file_id = file_id_from_url(url)?;
        match self
            .api
            .get_video_artifact(collection_id, file_id, kind, options)
            .await
        {
            Ok(artifact) => artifact
                .get("content")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            Err(e) => {
                debug!(collection_id, file_id, kind = kind.path(), error = %e, "No collection artifact");
                None
            }
        }
    }

    /// Content of the latest completed job for `url`, re-fetched with `options`.
    async fn reused_text(&self, kind: JobKind, url: &str, options: &FetchOptions) -> Option<String> {
        let existing = self
            .find_completed(kind, &JobQuery::latest_completed(url))
            .await?;
        match self.api.get_job(kind, &existing.job_id, options).await {
            Ok(job) => job.content().map(str::to_string),
            Err(e) => {
                debug!(kind = %kind, job_id = %existing.job_id, error = %e, "Could not fetch existing job");
                None
            }
        }
    }

    async fn description_for(&self, params: &DescribeVideoParams, options: &FetchOptions) -> Result<String> {
        if !params.force_new {
            if let Some(text) = self
                .collection_text(
                    params.collection_id.as_deref(),
                    &params.url,
                    ArtifactKind::MediaDescriptions,
                    options,
                )
                .await
            {
                return Ok(text);
            }
            if let Some(text) = self.reused_text(JobKind::Describe, &params.url, options).await {
                return Ok(text);
            }
        }

        let request = JobRequest {
            config: analysis_config(&params.url),
            ..JobRequest::new(JobKind::Describe, params.url.as_str())
        };
        let job = self.run_job(request, options).await?;
        Ok(job.content_or_data())
    }

    /// Describe a video, optionally one 5-minute window at a time.
    #[instrument(level = "info", name = "describe_video", skip(self, params), fields(url = %params.url, page = ?params.page))]
    pub async fn describe_video(&self, params: DescribeVideoParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;

        let window = match params.page {
            Some(page) => {
                let duration = self.url_duration(&params.url).await.unwrap_or(0.0);
                Some(TimeWindow::for_page(page, duration)?)
            }
            None => None,
        };
        let options = match &window {
            Some(w) => FetchOptions::markdown().with_window(w.start_seconds, w.end_seconds),
            None => FetchOptions::markdown(),
        };

        let content = match self.description_for(&params, &options).await {
            Ok(content) => content,
            Err(e) => return Ok(error_json(e.to_string(), json!({ "url": params.url }))),
        };

        Ok(match window {
            Some(w) => to_pretty(&json!({
                "content": content,
                "page": w.page,
                "total_pages": w.total_pages,
                "start_time_seconds": w.start_seconds,
                "end_time_seconds": w.end_seconds,
            })),
            None => content,
        })
    }

    async fn transcript_for(&self, url: &str, collection_id: Option<&str>, force_new: bool) -> Result<String> {
        let options = FetchOptions::markdown();
        if !force_new {
            if let Some(text) = self
                .collection_text(collection_id, url, ArtifactKind::RichTranscripts, &options)
                .await
            {
                return Ok(format!("Found existing transcript in collection:\n\n{}", text));
            }
            if let Some(text) = self.reused_text(JobKind::Transcribe, url, &options).await {
                return Ok(format!("Found existing transcript:\n\n{}", text));
            }
        }

        let request = JobRequest {
            config: analysis_config(url),
            ..JobRequest::new(JobKind::Transcribe, url)
        };
        let job = self.run_job(request, &options).await?;
        Ok(format!("New transcript created:\n\n{}", job.content_or_data()))
    }

    /// Transcribe one URL, or many in batches of ten.
    #[instrument(level = "info", name = "transcribe_video", skip(self, params), fields(url = ?params.url, urls = ?params.urls.as_ref().map(Vec::len)))]
    pub async fn transcribe_video(&self, params: TranscribeVideoParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let collection_id = params.collection_id.as_deref();
        let force_new = params.force_new;

        if let Some(urls) = params.urls {
            let results = run_batched(urls, URL_BATCH_SIZE, |url: String| async move {
                self.transcript_for(&url, collection_id, force_new).await
            })
            .await;
            info!(total = results.len(), "Transcribed URLs");
            return Ok(batch_summary(&results));
        }

        let url = params.url.unwrap_or_default();
        match self.transcript_for(&url, collection_id, force_new).await {
            Ok(text) => Ok(text),
            Err(e) => Ok(error_json(e.to_string(), json!({ "url": url }))),
        }
    }

    async fn entities_for(&self, url: &str, prompt: &str, collection_id: Option<&str>, page: EntityPage) -> Result<Value> {
        if let (Some(collection_id), Some(file_id)) = (collection_id, file_id_from_url(url)) {
            let options = FetchOptions::default().with_page(page.limit(), page.offset());
            match self
                .api
                .get_video_artifact(collection_id, file_id, ArtifactKind::Entities, &options)
                .await
            {
                Ok(artifact) => {
                    let total_pages = artifact
                        .get("total")
                        .and_then(Value::as_u64)
                        .map(EntityPage::total_pages)
                        .unwrap_or(1);
                    return Ok(json!({
                        "video_level_entities": artifact.get("entities").cloned().unwrap_or_else(|| json!({})),
                        "segment_level_entities": {
                            "entities": artifact.get("segment_entities").cloned().unwrap_or_else(|| json!([])),
                            "page": page.page,
                            "total_pages": total_pages,
                        },
                    }));
                }
                Err(e) => debug!(collection_id, file_id, error = %e, "No collection entities"),
            }
        }

        let lookup = JobQuery {
            limit: EXTRACT_LOOKUP_LIMIT,
            status: Some(JobStatus::Completed),
            url: Some(url.to_string()),
            criteria: None,
        };
        let existing = match self.api.list_jobs(JobKind::Extract, &lookup).await {
            Ok(list) => list.data.into_iter().find(|job| extract_job_matches(job, prompt)),
            Err(e) => {
                debug!(error = %e, "Extract lookup failed, treating as a miss");
                None
            }
        };

        let job = match existing {
            Some(found) => {
                self.api
                    .get_job(JobKind::Extract, &found.job_id, &FetchOptions::default())
                    .await?
            }
            None => {
                let request = JobRequest::new(JobKind::Extract, url)
                    .with("prompt", prompt)
                    .with("enable_video_level_entities", true)
                    .with("enable_segment_level_entities", true);
                self.run_job(request, &FetchOptions::default()).await?
            }
        };

        Ok(entities_from_data(job.data.as_ref(), page))
    }

    /// Extract entities from one URL, or many in batches of ten.
    #[instrument(level = "info", name = "extract_video_entities", skip(self, params), fields(url = ?params.url, page = params.page))]
    pub async fn extract_video_entities(&self, params: ExtractVideoEntitiesParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let collection_id = params.collection_id.as_deref();
        let page = EntityPage::new(params.page);
        let prompt = params.prompt.as_str();

        if let Some(urls) = params.urls.clone() {
            let results = run_batched(urls, URL_BATCH_SIZE, |url: String| async move {
                self.entities_for(&url, prompt, collection_id, page).await
            })
            .await;
            return Ok(batch_summary(&results));
        }

        let url = params.url.clone().unwrap_or_default();
        match self.entities_for(&url, prompt, collection_id, page).await {
            Ok(value) => Ok(to_pretty(&value)),
            Err(e) => Ok(to_pretty(&json!({
                "video_level_entities": {},
                "segment_level_entities": { "entities": [], "page": 0, "total_pages": 0 },
                "error": e.to_string(),
            }))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    fn describe(url: &str) -> DescribeVideoParams {
        DescribeVideoParams {
            url: url.to_string(),
            collection_id: None,
            page: None,
            force_new: false,
        }
    }

    #[tokio::test]
    async fn test_describe_reuses_completed_job() {
        let fake = FakeApi::new();
        fake.add_job(
            JobKind::Describe,
            json!({ "job_id": "old", "status": "completed", "url": "https://e.com/v.mp4", "data": { "content": "cached" } }),
        );

        let out = fake.handler().describe_video(describe("https://e.com/v.mp4")).await.unwrap();

        assert_eq!(out, "cached");
        assert_eq!(fake.calls_named("submit_job"), 0);
        assert_eq!(fake.calls(), vec!["list_jobs:describe", "get_job:describe:old:None:None"]);
    }

    #[tokio::test]
    async fn test_describe_force_new_skips_reuse() {
        let fake = FakeApi::new();
        fake.add_job(
            JobKind::Describe,
            json!({ "job_id": "old", "status": "completed", "url": "https://e.com/v.mp4", "data": { "content": "cached" } }),
        );
        let mut params = describe("https://e.com/v.mp4");
        params.force_new = true;

        let out = fake.handler().describe_video(params).await.unwrap();
        assert_eq!(out, "describe of https://e.com/v.mp4");
        assert_eq!(fake.calls_named("list_jobs"), 0);
        assert_eq!(fake.calls_named("submit_job"), 1);
    }

    #[tokio::test]
    async fn test_describe_prefers_collection_description() {
        let fake = FakeApi::new();
        fake.video_artifacts.lock().unwrap().insert(
            ("c1".into(), "f1".into(), ArtifactKind::MediaDescriptions),
            json!({ "content": "from collection" }),
        );
        let mut params = describe("cloudglue://files/f1");
        params.collection_id = Some("c1".into());

        let out = fake.handler().describe_video(params).await.unwrap();
        assert_eq!(out, "from collection");
        assert_eq!(fake.calls_named("list_jobs"), 0);
    }

    #[tokio::test]
    async fn test_describe_second_page_of_450_second_video() {
        let fake = FakeApi::new();
        fake.add_file(json!({ "id": "f1", "status": "completed", "video_info": { "duration_seconds": 450.0 } }));
        let mut params = describe("cloudglue://files/f1");
        params.page = Some(1);

        let out = parse(&fake.handler().describe_video(params).await.unwrap());

        assert_eq!(out["page"], 1);
        assert_eq!(out["total_pages"], 2);
        assert_eq!(out["start_time_seconds"], 300.0);
        assert_eq!(out["end_time_seconds"], 450.0);
        assert!(fake
            .calls()
            .iter()
            .any(|c| c.starts_with("get_job:describe:") && c.ends_with("Some(300.0):Some(450.0)")));
        let submitted = fake.submitted.lock().unwrap();
        assert_eq!(submitted[0].config["enable_scene_text"], json!(true));
    }

    #[tokio::test]
    async fn test_describe_page_out_of_range() {
        let fake = FakeApi::new();
        let mut params = describe("https://e.com/v.mp4");
        params.page = Some(1);
        let err = fake.handler().describe_video(params).await.unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn test_describe_forwards_remote_failure() {
        let fake = FakeApi::new();
        *fake.job_outcome.lock().unwrap() = Some((JobStatus::Failed, Some(json!("unsupported codec"))));

        let out = parse(&fake.handler().describe_video(describe("https://e.com/v.mp4")).await.unwrap());
        assert!(out["error"].as_str().unwrap().contains("unsupported codec"));
        assert_eq!(out["url"], "https://e.com/v.mp4");
    }

    #[tokio::test]
    async fn test_transcribe_prefixes_by_source() {
        let fake = FakeApi::new();
        fake.add_job(
            JobKind::Transcribe,
            json!({ "job_id": "t1", "status": "completed", "url": "https://e.com/a.mp4", "data": { "content": "hello" } }),
        );
        let handler = fake.handler();

        let reused = handler
            .transcribe_video(TranscribeVideoParams {
                url: Some("https://e.com/a.mp4".into()),
                urls: None,
                collection_id: None,
                force_new: false,
            })
            .await
            .unwrap();
        assert_eq!(reused, "Found existing transcript:\n\nhello");

        let created = handler
            .transcribe_video(TranscribeVideoParams {
                url: Some("https://e.com/b.mp4".into()),
                urls: None,
                collection_id: None,
                force_new: false,
            })
            .await
            .unwrap();
        assert_eq!(created, "New transcript created:\n\ntranscribe of https://e.com/b.mp4");
    }

    #[tokio::test]
    async fn test_transcribe_many_urls_in_batches() {
        let fake = FakeApi::new();
        let urls: Vec<String> = (0..12).map(|i| format!("https://e.com/{}.mp4", i)).collect();

        let out = parse(
            &fake
                .handler()
                .transcribe_video(TranscribeVideoParams {
                    url: None,
                    urls: Some(urls.clone()),
                    collection_id: None,
                    force_new: true,
                })
                .await
                .unwrap(),
        );

        assert_eq!(out["total"], 12);
        assert_eq!(out["successful"], 12);
        assert_eq!(out["failed"], 0);
        assert_eq!(out["results"][11]["input"], urls[11]);
        assert_eq!(fake.calls_named("submit_job:transcribe"), 12);
    }

    #[test]
    fn test_url_choice_validation() {
        let both = TranscribeVideoParams {
            url: Some("a".into()),
            urls: Some(vec!["b".into()]),
            collection_id: None,
            force_new: false,
        };
        assert!(both.validate().is_err());

        let too_many = TranscribeVideoParams {
            url: None,
            urls: Some(vec!["u".to_string(); 51]),
            collection_id: None,
            force_new: false,
        };
        let errors = too_many.validate().unwrap_err();
        assert_eq!(errors[0].field, "urls");
    }

    fn extract(url: &str, prompt: &str, page: u32) -> ExtractVideoEntitiesParams {
        ExtractVideoEntitiesParams {
            url: Some(url.into()),
            urls: None,
            prompt: prompt.into(),
            collection_id: None,
            page,
        }
    }

    #[tokio::test]
    async fn test_extract_reuses_only_exact_prompt() {
        let fake = FakeApi::new();
        fake.add_job(
            JobKind::Extract,
            json!({
                "job_id": "x1",
                "status": "completed",
                "url": "https://e.com/v.mp4",
                "extract_config": { "prompt": "people", "enable_video_level_entities": true, "enable_segment_level_entities": true },
                "data": { "entities": { "people": ["Ada"] }, "segment_entities": [] }
            }),
        );
        let handler = fake.handler();

        let out = parse(&handler.extract_video_entities(extract("https://e.com/v.mp4", "people", 0)).await.unwrap());
        assert_eq!(out["video_level_entities"]["people"][0], "Ada");
        assert_eq!(fake.calls_named("submit_job"), 0);

        handler
            .extract_video_entities(extract("https://e.com/v.mp4", "brands", 0))
            .await
            .unwrap();
        assert_eq!(fake.calls_named("submit_job:extract"), 1);
        let submitted = fake.submitted.lock().unwrap();
        assert_eq!(submitted[0].config["prompt"], json!("brands"));
        assert_eq!(submitted[0].config["enable_segment_level_entities"], json!(true));
    }

    #[tokio::test]
    async fn test_extract_pages_segment_entities() {
        let fake = FakeApi::new();
        let out = parse(
            &fake
                .handler()
                .extract_video_entities(extract("https://e.com/v.mp4", "topics", 1))
                .await
                .unwrap(),
        );
        let segments = &out["segment_level_entities"];
        assert_eq!(segments["page"], 1);
        assert_eq!(segments["total_pages"], 2);
        assert_eq!(segments["entities"].as_array().unwrap().len(), 5);
        assert_eq!(segments["entities"][0]["n"], 25);
    }

    #[tokio::test]
    async fn test_extract_from_collection_uses_server_paging() {
        let fake = FakeApi::new();
        fake.video_artifacts.lock().unwrap().insert(
            ("c1".into(), "f1".into(), ArtifactKind::Entities),
            json!({ "entities": { "a": 1 }, "segment_entities": [{ "n": 1 }], "total": 60 }),
        );
        let mut params = extract("cloudglue://files/f1", "anything", 2);
        params.collection_id = Some("c1".into());

        let out = parse(&fake.handler().extract_video_entities(params).await.unwrap());
        assert_eq!(out["segment_level_entities"]["total_pages"], 3);
        assert_eq!(fake.calls(), vec!["get_video_artifact:c1:f1:entities:Some(50)"]);
    }

    #[tokio::test]
    async fn test_extract_failure_keeps_shape() {
        let fake = FakeApi::new();
        *fake.job_outcome.lock().unwrap() = Some((JobStatus::Failed, None));
        let out = parse(
            &fake
                .handler()
                .extract_video_entities(extract("https://e.com/v.mp4", "x", 0))
                .await
                .unwrap(),
        );
        assert_eq!(out["segment_level_entities"]["total_pages"], 0);
        assert!(out["error"].as_str().unwrap().contains("failed"));
    }
}
