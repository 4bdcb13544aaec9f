//! Bulk retrieval of collection artifacts with date filters.

use crate::client::ArtifactKind;
use crate::handler::{check_not_empty, check_range, error_json, to_pretty, validation_failure, CloudGlueHandler, ValidationError};
use crate::pagination::{filter_fetch, DateRange, PageRequest};
use cloudglue_mcp_common::error::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

fn default_description_limit() -> u32 {
    2
}

fn default_summary_limit() -> u32 {
    25
}

fn default_entity_limit() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RetrieveDescriptionsParams {
    /// Collection ID without the 'cloudglue://collections/' prefix
    pub collection_id: String,
    /// Number of descriptions to return (1-10)
    #[serde(default = "default_description_limit")]
    pub limit: u32,
    /// Number of descriptions to skip
    #[serde(default)]
    pub offset: u32,
    /// Only videos added after this date, YYYY-MM-DD
    #[serde(default)]
    pub created_after: Option<String>,
    /// Only videos added before this date, YYYY-MM-DD
    #[serde(default)]
    pub created_before: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RetrieveSummariesParams {
    /// Collection ID without the 'cloudglue://collections/' prefix
    pub collection_id: String,
    /// Number of summaries to return (1-50)
    #[serde(default = "default_summary_limit")]
    pub limit: u32,
    /// Number of summaries to skip
    #[serde(default)]
    pub offset: u32,
    /// Only videos added after this date, YYYY-MM-DD
    #[serde(default)]
    pub created_after: Option<String>,
    /// Only videos added before this date, YYYY-MM-DD
    #[serde(default)]
    pub created_before: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RetrieveCollectionEntitiesParams {
    /// Entities collection ID without the 'cloudglue://collections/' prefix
    pub collection_id: String,
    /// Number of entity records to return (1-10)
    #[serde(default = "default_entity_limit")]
    pub limit: u32,
    /// Number of entity records to skip
    #[serde(default)]
    pub offset: u32,
    /// Only entities extracted after this date, YYYY-MM-DD
    #[serde(default)]
    pub created_after: Option<String>,
    /// Only entities extracted before this date, YYYY-MM-DD
    #[serde(default)]
    pub created_before: Option<String>,
}

fn check_collection_page(collection_id: &str, limit: u32, max: u32) -> std::result::Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_not_empty(&mut errors, "collection_id", collection_id);
    check_range(&mut errors, "limit", limit, 1, max);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

impl RetrieveDescriptionsParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        check_collection_page(&self.collection_id, self.limit, 10)
    }
}

impl RetrieveSummariesParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        check_collection_page(&self.collection_id, self.limit, 50)
    }
}

impl RetrieveCollectionEntitiesParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        check_collection_page(&self.collection_id, self.limit, 10)
    }
}

/// Title and summary of a description or transcript record.
fn summary_of(record: Value) -> Value {
    let data = record.get("data");
    let text = |key: &str| {
        data.and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    json!({
        "title": text("title").or_else(|| text("filename")).unwrap_or_else(|| "Untitled".to_string()),
        "summary": text("summary").unwrap_or_else(|| "No summary available".to_string()),
        "file_id": record.get("file_id").cloned().unwrap_or(Value::Null),
    })
}

/// Outcome of checking that a collection holds descriptions or transcripts.
enum Described {
    Kind(ArtifactKind, String),
    Rejected(String),
}

impl CloudGlueHandler {
    async fn described_collection(&self, collection_id: &str) -> Result<Described> {
        let collection = match self.api.get_collection(collection_id).await {
            Ok(collection) => collection,
            Err(e) if e.is_not_found() => {
                return Ok(Described::Rejected("Collection not found or invalid collection ID".to_string()));
            }
            Err(e) => return Err(e),
        };

        Ok(match collection.collection_type.as_deref() {
            None => Described::Rejected("Collection not found or invalid collection ID".to_string()),
            Some("rich-transcripts") => Described::Kind(ArtifactKind::RichTranscripts, "rich-transcripts".to_string()),
            Some("media-descriptions") => {
                Described::Kind(ArtifactKind::MediaDescriptions, "media-descriptions".to_string())
            }
            Some(other) => Described::Rejected(format!(
                "Collection type '{}' is not supported. This tool works with rich-transcripts and media-descriptions collections only.",
                other
            )),
        })
    }

    /// Full descriptions (or transcripts) of a collection's videos.
    #[instrument(level = "info", name = "retrieve_descriptions", skip(self, params), fields(collection_id = %params.collection_id, limit = params.limit, offset = params.offset))]
    pub async fn retrieve_descriptions(&self, params: RetrieveDescriptionsParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let range = DateRange::parse(params.created_after.as_deref(), params.created_before.as_deref())?;

        let (kind, collection_type) = match self.described_collection(&params.collection_id).await? {
            Described::Kind(kind, collection_type) => (kind, collection_type),
            Described::Rejected(message) => {
                return Ok(error_json(
                    message,
                    json!({ "collection_id": params.collection_id, "descriptions": [] }),
                ));
            }
        };

        let request = PageRequest::new(params.limit, params.offset, range);
        let page = filter_fetch(&request, |limit, offset| {
            self.api.list_artifacts(&params.collection_id, kind, limit, offset)
        })
        .await?;

        Ok(to_pretty(&json!({
            "descriptions": page.items,
            "collection_type": collection_type,
            "pagination": page.pagination(),
            "collection_id": params.collection_id,
        })))
    }

    /// Titles and summaries of a collection's videos.
    #[instrument(level = "info", name = "retrieve_summaries", skip(self, params), fields(collection_id = %params.collection_id, limit = params.limit, offset = params.offset))]
    pub async fn retrieve_summaries(&self, params: RetrieveSummariesParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let range = DateRange::parse(params.created_after.as_deref(), params.created_before.as_deref())?;

        let (kind, collection_type) = match self.described_collection(&params.collection_id).await? {
            Described::Kind(kind, collection_type) => (kind, collection_type),
            Described::Rejected(message) => {
                return Ok(error_json(
                    message,
                    json!({ "collection_id": params.collection_id, "summaries": [] }),
                ));
            }
        };

        let request = PageRequest::new(params.limit, params.offset, range);
        let page = filter_fetch(&request, |limit, offset| {
            self.api.list_artifacts(&params.collection_id, kind, limit, offset)
        })
        .await?
        .map(summary_of);

        Ok(to_pretty(&json!({
            "summaries": page.items,
            "collection_type": collection_type,
            "pagination": page.pagination(),
            "collection_id": params.collection_id,
        })))
    }

    /// Entity records of an entities collection.
    #[instrument(level = "info", name = "retrieve_collection_entities", skip(self, params), fields(collection_id = %params.collection_id, limit = params.limit, offset = params.offset))]
    pub async fn retrieve_collection_entities(&self, params: RetrieveCollectionEntitiesParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;
        let range = DateRange::parse(params.created_after.as_deref(), params.created_before.as_deref())?;

        let request = PageRequest::new(params.limit, params.offset, range);
        let page = filter_fetch(&request, |limit, offset| {
            self.api
                .list_artifacts(&params.collection_id, ArtifactKind::Entities, limit, offset)
        })
        .await?;

        Ok(to_pretty(&json!({
            "entities": page.items,
            "pagination": page.pagination(),
            "collection_id": params.collection_id,
        })))
    }
}
