//! Collection management tools.

use crate::client::{CollectionQuery, CreateCollectionRequest, VideoSource};
use crate::handler::{
    check_not_empty, check_range, error_json, to_pretty, validation_failure, CloudGlueHandler, ValidationError,
};
use crate::youtube::is_youtube_url;
use cloudglue_mcp_common::error::Result;
use futures::future::join_all;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{instrument, warn};

/// Collection types Cloudglue supports.
pub const COLLECTION_TYPES: &[&str] = &["media-descriptions", "rich-transcripts", "entities"];

pub const DEFAULT_COLLECTION_TYPE: &str = "media-descriptions";

/// Videos inspected per collection when counting completed ones.
const VIDEO_COUNT_WINDOW: u32 = 100;

fn default_limit() -> u32 {
    10
}

fn default_collection_type() -> String {
    DEFAULT_COLLECTION_TYPE.to_string()
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListCollectionsParams {
    /// Maximum number of collections to return (1-100)
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of collections to skip
    #[serde(default)]
    pub offset: u32,
    /// Only list collections of this type: media-descriptions, rich-transcripts or entities
    #[serde(default)]
    pub collection_type: Option<String>,
}

impl ListCollectionsParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_range(&mut errors, "limit", self.limit, 1, 100);
        if let Some(kind) = &self.collection_type {
            if !COLLECTION_TYPES.contains(&kind.as_str()) {
                errors.push(ValidationError::new(
                    "collection_type",
                    format!("Invalid collection type '{}'. Valid options: {}", kind, COLLECTION_TYPES.join(", ")),
                ));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateCollectionParams {
    /// Name of the collection, unique within the account
    pub name: String,
    /// What the collection is for
    #[serde(default)]
    pub description: Option<String>,
    /// media-descriptions (default), rich-transcripts or entities
    #[serde(default = "default_collection_type")]
    pub collection_type: String,
    /// Extraction prompt; required for entities collections
    #[serde(default)]
    pub prompt: Option<String>,
}

impl CreateCollectionParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "name", &self.name);
        if !COLLECTION_TYPES.contains(&self.collection_type.as_str()) {
            errors.push(ValidationError::new(
                "collection_type",
                format!(
                    "Invalid collection type '{}'. Valid options: {}",
                    self.collection_type,
                    COLLECTION_TYPES.join(", ")
                ),
            ));
        }
        if self.collection_type == "entities" && self.prompt.as_deref().is_none_or(|p| p.trim().is_empty()) {
            errors.push(ValidationError::new("prompt", "is required for entities collections"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Type-specific configuration with every analysis enabled.
    fn config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        match self.collection_type.as_str() {
            "entities" => {
                config.insert(
                    "extract_config".into(),
                    json!({
                        "prompt": self.prompt,
                        "enable_video_level_entities": true,
                        "enable_segment_level_entities": true,
                    }),
                );
            }
            kind => {
                let key = if kind == "rich-transcripts" { "transcribe_config" } else { "describe_config" };
                config.insert(
                    key.into(),
                    json!({
                        "enable_summary": true,
                        "enable_scene_text": true,
                        "enable_speech": true,
                        "enable_visual_scene_description": true,
                    }),
                );
            }
        }
        config
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteCollectionParams {
    /// Collection ID without the 'cloudglue://collections/' prefix
    pub collection_id: String,
}

impl DeleteCollectionParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "collection_id", &self.collection_id);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveVideoFromCollectionParams {
    /// Collection the video belongs to
    pub collection_id: String,
    /// Cloudglue file ID of the video
    pub file_id: String,
}

impl RemoveVideoFromCollectionParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "collection_id", &self.collection_id);
        check_not_empty(&mut errors, "file_id", &self.file_id);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddVideoToCollectionParams {
    /// Collection to add the video to
    pub collection_id: String,
    /// Video URL: cloudglue://files/<id>, public HTTP(S) URL or data connector URL. YouTube is not supported.
    pub url: String,
}

impl CloudGlueHandler {
    /// List collections with a count of their completed videos.
    #[instrument(level = "info", name = "list_collections", skip(self, params), fields(limit = params.limit, offset = params.offset))]
    pub async fn list_collections(&self, params: ListCollectionsParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;

        let collections = self
            .api
            .list_collections(&CollectionQuery {
                limit: params.limit,
                offset: params.offset,
                collection_type: params.collection_type.clone(),
            })
            .await?;

        let processed = join_all(collections.data.iter().map(|collection| async move {
            let completed = match self
                .api
                .list_collection_videos(&collection.id, VIDEO_COUNT_WINDOW, 0)
                .await
            {
                Ok(videos) => Some(videos.data.iter().filter(|v| v.status.is_completed()).count()),
                Err(e) => {
                    warn!(collection_id = %collection.id, error = %e, "Failed to count collection videos");
                    None
                }
            };

            let mut entry = json!({
                "id": collection.id,
                "name": collection.name,
                "collection_type": collection.collection_type.as_deref().unwrap_or("rich-transcripts"),
                "created_at": collection.created_at,
                "completed_video_count": completed,
            });
            if let Some(description) = &collection.description {
                entry["description"] = json!(description);
            }
            entry
        }))
        .await;

        let returned = processed.len() as u64;
        let has_more = match collections.total {
            Some(total) => u64::from(params.offset) + returned < total,
            None => returned == u64::from(params.limit),
        };

        Ok(to_pretty(&json!({
            "collections": processed,
            "pagination": {
                "offset": params.offset,
                "limit": params.limit,
                "total": collections.total,
                "has_more": has_more,
            },
        })))
    }

    #[instrument(level = "info", name = "create_collection", skip(self, params), fields(name = %params.name, collection_type = %params.collection_type))]
    pub async fn create_collection(&self, params: CreateCollectionParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;

        let collection = self
            .api
            .create_collection(&CreateCollectionRequest {
                name: params.name.clone(),
                collection_type: params.collection_type.clone(),
                description: params.description.clone(),
                config: params.config(),
            })
            .await?;

        let mut body = json!({
            "id": collection.id,
            "name": collection.name,
            "collection_type": collection.collection_type,
            "created_at": collection.created_at,
        });
        if let Some(description) = collection.description {
            body["description"] = json!(description);
        }
        Ok(to_pretty(&body))
    }

    #[instrument(level = "info", name = "delete_collection", skip(self, params), fields(collection_id = %params.collection_id))]
    pub async fn delete_collection(&self, params: DeleteCollectionParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        match self.api.delete_collection(&params.collection_id).await {
            Ok(()) => Ok(to_pretty(&json!({
                "collection_id": params.collection_id,
                "status": "deleted",
            }))),
            Err(e) => Ok(error_json(e.to_string(), json!({ "collection_id": params.collection_id }))),
        }
    }

    #[instrument(level = "info", name = "remove_video_from_collection", skip(self, params), fields(collection_id = %params.collection_id, file_id = %params.file_id))]
    pub async fn remove_video_from_collection(&self, params: RemoveVideoFromCollectionParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let context = json!({ "collection_id": params.collection_id, "file_id": params.file_id });
        match self
            .api
            .remove_video(&params.collection_id, &params.file_id)
            .await
        {
            Ok(()) => {
                let mut body = context;
                body["status"] = json!("removed");
                Ok(to_pretty(&body))
            }
            Err(e) => Ok(error_json(e.to_string(), context)),
        }
    }

    /// Add a video by URL and wait until the collection has processed it.
    #[instrument(level = "info", name = "add_video_to_collection", skip(self, params), fields(collection_id = %params.collection_id, url = %params.url))]
    pub async fn add_video_to_collection(&self, params: AddVideoToCollectionParams) -> Result<String> {
        let context = json!({ "collection_id": params.collection_id, "url": params.url });

        if is_youtube_url(&params.url) {
            return Ok(error_json(
                "YouTube URLs are not supported for adding videos to collections. Please use Cloudglue URLs, public HTTP video URLs, or data connector URLs instead.",
                context,
            ));
        }

        let outcome = async {
            let added = self
                .api
                .add_video(&params.collection_id, &VideoSource::Url(params.url.clone()))
                .await?;
            self.poller
                .wait_for_collection_video(self.api.as_ref(), &params.collection_id, added)
                .await
        }
        .await;

        match outcome {
            Ok(video) => Ok(to_pretty(&json!({
                "collection_id": params.collection_id,
                "file_id": video.file_id,
                "url": params.url,
                "status": video.status,
            }))),
            Err(e) => Ok(error_json(e.to_string(), context)),
        }
    }
}
