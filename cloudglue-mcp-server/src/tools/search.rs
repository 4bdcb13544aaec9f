//! Semantic search and chat over a collection.

use crate::client::{ChatMessage, ChatRequest, SearchRequest, SearchScope};
use crate::handler::{check_not_empty, check_range, error_json, to_pretty, validation_failure, CloudGlueHandler, ValidationError};
use cloudglue_mcp_common::error::Result;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

/// Chat model used for collection Q&A.
pub const CHAT_MODEL: &str = "nimbus-001";

fn default_max_results() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Collection to search, without the 'cloudglue://collections/' prefix
    pub collection_id: String,
    /// Natural language query, e.g. "product demo with pricing discussion"
    pub query: String,
    /// Maximum number of results (1-20)
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl SearchParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "collection_id", &self.collection_id);
        check_not_empty(&mut errors, "query", &self.query);
        check_range(&mut errors, "max_results", self.max_results, 1, 20);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ChatWithVideoCollectionParams {
    /// Collection to ask about
    pub collection_id: String,
    /// Question or instruction answered from the collection's videos
    pub prompt: String,
}

impl CloudGlueHandler {
    async fn run_search(&self, params: SearchParams, scope: SearchScope) -> Result<String> {
        params.validate().map_err(validation_failure)?;

        let request = SearchRequest {
            collections: vec![params.collection_id.clone()],
            query: params.query.clone(),
            limit: params.max_results,
            scope,
        };

        match self.api.search(&request).await {
            Ok(response) => Ok(to_pretty(&json!({
                "query": params.query,
                "collection_id": params.collection_id,
                "total_results": response.results.len(),
                "results": response.results,
            }))),
            Err(e) => Ok(error_json(
                format!("Failed to search: {}", e),
                json!({
                    "query": params.query,
                    "collection_id": params.collection_id,
                    "results": [],
                    "total_results": 0,
                }),
            )),
        }
    }

    /// Find the moments (segments) that match a query.
    #[instrument(level = "info", name = "search_video_moments", skip(self, params), fields(collection_id = %params.collection_id))]
    pub async fn search_video_moments(&self, params: SearchParams) -> Result<String> {
        self.run_search(params, SearchScope::Segment).await
    }

    /// Find whole videos whose summaries match a query.
    #[instrument(level = "info", name = "search_video_summaries", skip(self, params), fields(collection_id = %params.collection_id))]
    pub async fn search_video_summaries(&self, params: SearchParams) -> Result<String> {
        self.run_search(params, SearchScope::File).await
    }

    /// Ask a question answered from a collection, with citations.
    #[instrument(level = "info", name = "chat_with_video_collection", skip(self, params), fields(collection_id = %params.collection_id))]
    pub async fn chat_with_video_collection(&self, params: ChatWithVideoCollectionParams) -> Result<String> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "collection_id", &params.collection_id);
        check_not_empty(&mut errors, "prompt", &params.prompt);
        if !errors.is_empty() {
            return Err(validation_failure(errors));
        }

        let completion = self
            .api
            .chat_completion(&ChatRequest {
                model: CHAT_MODEL.to_string(),
                messages: vec![ChatMessage {
                    role: "user".to_string(),
                    content: params.prompt,
                }],
                collections: vec![params.collection_id.clone()],
                force_search: true,
                include_citations: true,
            })
            .await?;

        match completion.first_answer() {
            Some((content, citations)) => {
                let citations = serde_json::to_string(citations).unwrap_or_else(|_| "[]".to_string());
                Ok(["Chat completion response: ", content, "\n\nCitations:", citations.as_str()].join("\n"))
            }
            None => Ok(error_json(
                "Failed to chat with video collection",
                json!({ "collection_id": params.collection_id }),
            )),
        }
    }
}
