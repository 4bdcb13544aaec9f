//! File listing and details.

use crate::batch::{run_batched, URL_BATCH_SIZE};
use crate::client::{CollectionVideo, FileRecord};
use crate::handler::{check_not_empty, check_range, error_json, format_duration, to_pretty, validation_failure, CloudGlueHandler, ValidationError};
use crate::pagination::{DateRange, PageRequest};
use cloudglue_mcp_common::error::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListVideosParams {
    /// Maximum number of videos to return (1-100)
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of videos to skip
    #[serde(default)]
    pub offset: u32,
    /// Only list videos in this collection
    #[serde(default)]
    pub collection_id: Option<String>,
    /// Only videos whose file was created after this date, YYYY-MM-DD
    #[serde(default)]
    pub created_after: Option<String>,
    /// Only videos whose file was created before this date, YYYY-MM-DD
    #[serde(default)]
    pub created_before: Option<String>,
}

impl ListVideosParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_range(&mut errors, "limit", self.limit, 1, 100);
        if let Some(collection_id) = &self.collection_id {
            check_not_empty(&mut errors, "collection_id", collection_id);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetVideoInfoParams {
    /// Cloudglue file ID
    pub file_id: String,
}

impl GetVideoInfoParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "file_id", &self.file_id);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

pub(crate) fn video_entry(file: &FileRecord) -> Value {
    let video_info = file.video_info.as_ref().map(|info| {
        json!({
            "duration_seconds": info.duration_seconds,
            "has_audio": info.has_audio,
        })
    });
    json!({
        "filename": file.filename,
        "uri": file.uri,
        "id": file.id,
        "created_at": file.created_at,
        "metadata": file.metadata,
        "video_info": video_info,
    })
}

impl CloudGlueHandler {
    /// List completed videos, optionally scoped to one collection.
    #[instrument(level = "info", name = "list_videos", skip(self, params), fields(limit = params.limit, offset = params.offset, collection_id = ?params.collection_id))]
    pub async fn list_videos(&self, params: ListVideosParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let range = DateRange::parse(params.created_after.as_deref(), params.created_before.as_deref())?;
        let request = PageRequest::new(params.limit, params.offset, range);

        let (videos, pagination) = match &params.collection_id {
            None => {
                let files = self.api.list_files(request.fetch_limit(), 0).await?;
                let completed: Vec<FileRecord> = files
                    .data
                    .into_iter()
                    .filter(|f| f.status.is_completed())
                    .collect();
                let page = request.paginate(completed, None);
                let pagination = page.pagination();
                (page.items.iter().map(video_entry).collect::<Vec<_>>(), pagination)
            }
            Some(collection_id) => {
                let members = self
                    .api
                    .list_collection_videos(collection_id, request.fetch_limit(), 0)
                    .await?;
                let completed: Vec<CollectionVideo> = members
                    .data
                    .into_iter()
                    .filter(|v| v.status.is_completed())
                    .collect();

                // Date filters apply to the file, so look every candidate up first.
                let enriched = run_batched(completed, URL_BATCH_SIZE, |video: CollectionVideo| async move {
                    self.api.get_file(&video.file_id).await
                })
                .await;
                let page = request.paginate(enriched, None);
                let pagination = page.pagination();

                let videos = page
                    .items
                    .into_iter()
                    .map(|item| match item.result {
                        Some(file) => {
                            let mut entry = video_entry(&file);
                            entry["collection_id"] = json!(collection_id);
                            entry["added_at"] = json!(item.input.added_at);
                            entry
                        }
                        None => json!({
                            "file_id": item.input.file_id,
                            "collection_id": collection_id,
                            "added_at": item.input.added_at,
                            "status": item.input.status,
                            "error": item.error,
                        }),
                    })
                    .collect();
                (videos, pagination)
            }
        };

        Ok(to_pretty(&json!({
            "videos": videos,
            "pagination": pagination,
        })))
    }

    /// Metadata of one file, which must have finished processing.
    #[instrument(level = "info", name = "get_video_info", skip(self, params), fields(file_id = %params.file_id))]
    pub async fn get_video_info(&self, params: GetVideoInfoParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let file = self.api.get_file(&params.file_id).await?;
        if !file.status.is_completed() {
            return Ok(error_json(
                format!("Unable to retrieve video: Video is in {} status", file.status),
                json!({ "file_id": params.file_id }),
            ));
        }

        let duration_formatted = file.duration_seconds().map(format_duration);
        let mut body = serde_json::to_value(&file).unwrap_or_default();
        body["duration_formatted"] = json!(duration_formatted);
        Ok(to_pretty(&body))
    }
}
