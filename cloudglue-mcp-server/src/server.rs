//! MCP Server implementation for Cloudglue.
//!
//! Exposes the Cloudglue tools (collections, videos, analysis, segmentation,
//! retrieval, search and ingestion) and the `cloudglue://collections`
//! resources. Tool failures are reported as `{"error": ...}` text inside a
//! successful result; only malformed arguments and unknown tool names become
//! protocol errors.

use crate::handler::{error_json, CloudGlueHandler};
use crate::resources;
use crate::tools::*;
use cloudglue_mcp_common::config::Config;
use cloudglue_mcp_common::error::Result;
use rmcp::{
    model::{
        CallToolResult, Content, Implementation, JsonObject, ListResourcesResult, ReadResourceResult,
        ResourceContents, ServerCapabilities, ServerInfo, Tool,
    },
    ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SERVER_NAME: &str = "cloudglue-mcp-server";

const INSTRUCTIONS: &str = "Cloudglue video intelligence server. \
    Organise videos with list_collections, create_collection, delete_collection, \
    add_video_to_collection, remove_video_from_collection, add_file and add_youtube. \
    Browse with list_videos and get_video_info. \
    Analyse with describe_video, transcribe_video, extract_video_entities, \
    segment_video_chapters and segment_video_camera_shots (completed results are reused; \
    pass force_new to redo them) and inspect jobs with list_jobs. \
    Read collection-level results with retrieve_descriptions, retrieve_summaries and \
    retrieve_collection_entities, and query them with search_video_moments, \
    search_video_summaries and chat_with_video_collection.";

/// Tool name and description, in listing order.
const TOOLS: [(&str, &str); 21] = [
    ("list_collections", "List video collections with their completed video counts. Filter by collection_type and page with limit/offset."),
    ("list_videos", "List processed videos, optionally within one collection and between created_after/created_before dates (YYYY-MM-DD)."),
    ("get_video_info", "Get metadata for one uploaded video: filename, status, duration and technical details."),
    ("describe_video", "Describe what is shown and said in a video. Uses the collection's description when collection_id is given, otherwise reuses a previous description unless force_new is set. Pass page to read a 5-minute window of long videos."),
    ("transcribe_video", "Get the transcript of one video (url) or up to 50 videos (urls). Uses collection transcripts when collection_id is given and reuses previous transcripts unless force_new is set."),
    ("extract_video_entities", "Extract structured entities described by a prompt from one video (url) or up to 50 videos (urls). Segment-level entities are paged 25 at a time via page."),
    ("segment_video_chapters", "Split a video into narrative chapters with start times. YouTube URLs are not supported."),
    ("segment_video_camera_shots", "Split a video into camera shots with start/end times and durations. YouTube URLs are not supported."),
    ("list_jobs", "List recent describe, transcribe, extract or segment jobs, optionally filtered by url and status."),
    ("retrieve_descriptions", "Page through the full media descriptions of a rich-transcripts or media-descriptions collection, with optional date filters."),
    ("retrieve_summaries", "Page through title and summary of every video in a rich-transcripts or media-descriptions collection, with optional date filters."),
    ("retrieve_collection_entities", "Page through the extracted entities of an entities collection, with optional date filters."),
    ("search_video_moments", "Semantic search for specific moments (segments) inside a collection's videos."),
    ("search_video_summaries", "Semantic search for whole videos in a collection by their summaries."),
    ("chat_with_video_collection", "Ask a question answered from a collection's videos; the answer includes citations."),
    ("create_collection", "Create a collection of type media-descriptions (default), rich-transcripts or entities. Entities collections need a prompt."),
    ("delete_collection", "Delete a collection. The videos themselves are kept."),
    ("remove_video_from_collection", "Remove one video from a collection."),
    ("add_video_to_collection", "Add a Cloudglue file or direct video URL to a collection and wait until it is processed. Use add_youtube for YouTube links."),
    ("add_file", "Upload a local file (absolute or relative to the working directory) or reuse an existing file_id, wait for processing and optionally add it to a collection."),
    ("add_youtube", "Add YouTube videos to a collection from a list of URLs, a playlist or a channel (up to limit most recent videos), five at a time."),
];

/// MCP Server for Cloudglue.
#[derive(Clone)]
pub struct CloudGlueServer {
    handler: Arc<CloudGlueHandler>,
}

/// JSON schema of a parameter struct as an MCP input schema.
fn input_schema<P: JsonSchema>() -> Arc<JsonObject> {
    let schema = schemars::schema_for!(P);
    match serde_json::to_value(&schema).unwrap_or_default() {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

fn schema_of(name: &str) -> Arc<JsonObject> {
    match name {
        "list_collections" => input_schema::<ListCollectionsParams>(),
        "list_videos" => input_schema::<ListVideosParams>(),
        "get_video_info" => input_schema::<GetVideoInfoParams>(),
        "describe_video" => input_schema::<DescribeVideoParams>(),
        "transcribe_video" => input_schema::<TranscribeVideoParams>(),
        "extract_video_entities" => input_schema::<ExtractVideoEntitiesParams>(),
        "segment_video_chapters" => input_schema::<SegmentVideoChaptersParams>(),
        "segment_video_camera_shots" => input_schema::<SegmentVideoCameraShotsParams>(),
        "list_jobs" => input_schema::<ListJobsParams>(),
        "retrieve_descriptions" => input_schema::<RetrieveDescriptionsParams>(),
        "retrieve_summaries" => input_schema::<RetrieveSummariesParams>(),
        "retrieve_collection_entities" => input_schema::<RetrieveCollectionEntitiesParams>(),
        "search_video_moments" | "search_video_summaries" => input_schema::<SearchParams>(),
        "chat_with_video_collection" => input_schema::<ChatWithVideoCollectionParams>(),
        "create_collection" => input_schema::<CreateCollectionParams>(),
        "delete_collection" => input_schema::<DeleteCollectionParams>(),
        "remove_video_from_collection" => input_schema::<RemoveVideoFromCollectionParams>(),
        "add_video_to_collection" => input_schema::<AddVideoToCollectionParams>(),
        "add_file" => input_schema::<AddFileParams>(),
        "add_youtube" => input_schema::<AddYoutubeParams>(),
        _ => Arc::new(JsonObject::new()),
    }
}

/// Every tool this server exposes.
pub fn tools() -> Vec<Tool> {
    TOOLS
        .iter()
        .map(|(name, description)| Tool {
            name: Cow::Borrowed(*name),
            description: Some(Cow::Borrowed(*description)),
            input_schema: schema_of(name),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        })
        .collect()
}

/// Absent arguments read as `{}`; required fields still fail in serde.
fn parse_args<P: DeserializeOwned>(arguments: Option<JsonObject>) -> std::result::Result<P, McpError> {
    serde_json::from_value(serde_json::Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))
}

/// Tool text as a single-content result; errors become the JSON error envelope.
fn into_result(tool: &str, outcome: Result<String>) -> CallToolResult {
    let text = outcome.unwrap_or_else(|e| {
        warn!(tool, error = %e, "Tool failed");
        error_json(e.to_string(), json!({ "tool": tool }))
    });
    CallToolResult::success(vec![Content::text(text)])
}

impl CloudGlueServer {
    /// Create a server talking to the configured Cloudglue endpoint.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::from_handler(CloudGlueHandler::new(&config)?))
    }

    pub fn from_handler(handler: CloudGlueHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Run one tool by name.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> std::result::Result<CallToolResult, McpError> {
        let h = &self.handler;
        let outcome = match name {
            "list_collections" => h.list_collections(parse_args(arguments)?).await,
            "list_videos" => h.list_videos(parse_args(arguments)?).await,
            "get_video_info" => h.get_video_info(parse_args(arguments)?).await,
            "describe_video" => h.describe_video(parse_args(arguments)?).await,
            "transcribe_video" => h.transcribe_video(parse_args(arguments)?).await,
            "extract_video_entities" => h.extract_video_entities(parse_args(arguments)?).await,
            "segment_video_chapters" => h.segment_video_chapters(parse_args(arguments)?).await,
            "segment_video_camera_shots" => h.segment_video_camera_shots(parse_args(arguments)?).await,
            "list_jobs" => h.list_jobs(parse_args(arguments)?).await,
            "retrieve_descriptions" => h.retrieve_descriptions(parse_args(arguments)?).await,
            "retrieve_summaries" => h.retrieve_summaries(parse_args(arguments)?).await,
            "retrieve_collection_entities" => h.retrieve_collection_entities(parse_args(arguments)?).await,
            "search_video_moments" => h.search_video_moments(parse_args(arguments)?).await,
            "search_video_summaries" => h.search_video_summaries(parse_args(arguments)?).await,
            "chat_with_video_collection" => h.chat_with_video_collection(parse_args(arguments)?).await,
            "create_collection" => h.create_collection(parse_args(arguments)?).await,
            "delete_collection" => h.delete_collection(parse_args(arguments)?).await,
            "remove_video_from_collection" => h.remove_video_from_collection(parse_args(arguments)?).await,
            "add_video_to_collection" => h.add_video_to_collection(parse_args(arguments)?).await,
            "add_file" => h.add_file(parse_args(arguments)?).await,
            "add_youtube" => h.add_youtube(parse_args(arguments)?).await,
            _ => return Err(McpError::invalid_params(format!("Unknown tool: {}", name), None)),
        };
        Ok(into_result(name, outcome))
    }

    /// Text of a `cloudglue://collections` resource.
    pub async fn resource_text(&self, uri: &str) -> std::result::Result<String, McpError> {
        let api = self.handler.api.as_ref();
        let outcome = if uri == resources::COLLECTIONS_URI {
            resources::collections_resource_json(api).await
        } else if let Some(collection_id) = resources::collection_id_from_uri(uri) {
            resources::collection_resource_json(api, collection_id).await
        } else {
            return Err(McpError::resource_not_found(format!("Unknown resource: {}", uri), None));
        };

        outcome.map_err(|e| {
            if e.is_not_found() {
                McpError::resource_not_found(format!("Resource not found: {}", uri), None)
            } else {
                McpError::internal_error(format!("Failed to read {}: {}", uri, e), None)
            }
        })
    }

    /// The index resource plus one resource per listed collection.
    pub async fn resources(&self) -> Vec<rmcp::model::Resource> {
        let entry = |uri: String, name: String, description: Option<String>| rmcp::model::Resource {
            raw: rmcp::model::RawResource {
                uri,
                name,
                title: None,
                description,
                mime_type: Some("application/json".to_string()),
                size: None,
                icons: None,
                meta: None,
            },
            annotations: None,
        };

        let mut listed = vec![entry(
            resources::COLLECTIONS_URI.to_string(),
            "Cloudglue Collections".to_string(),
            Some("Collections in this Cloudglue account".to_string()),
        )];

        match resources::list_collections(self.handler.api.as_ref()).await {
            Ok(collections) => listed.extend(collections.into_iter().map(|c| {
                let name = c.name.clone().unwrap_or_else(|| c.id.clone());
                entry(resources::collection_uri(&c.id), name, c.description)
            })),
            Err(e) => warn!(error = %e, "Failed to list collections for resources"),
        }
        listed
    }
}

impl ServerHandler for CloudGlueServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = std::result::Result<rmcp::model::ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(rmcp::model::ListToolsResult {
                tools: tools(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = std::result::Result<CallToolResult, McpError>> + Send + '_ {
        async move { self.dispatch(params.name.as_ref(), params.arguments).await }
    }

    fn list_resources(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = std::result::Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            debug!("Listing resources");
            Ok(ListResourcesResult {
                resources: self.resources().await,
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn read_resource(
        &self,
        params: rmcp::model::ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = std::result::Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = &params.uri;
            debug!(uri = %uri, "Reading resource");

            let content = self.resource_text(uri).await?;
            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(content, uri.clone())],
            })
        }
    }
}
