//! Cloudglue REST client.
//!
//! [`CloudGlueApi`] is the seam the tools are written against; [`CloudGlueClient`]
//! implements it over HTTPS with bearer authentication. Tests substitute their
//! own implementation.

pub mod types;

use async_trait::async_trait;
use cloudglue_mcp_common::config::Config;
use cloudglue_mcp_common::error::{Error, Result};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

pub use types::*;

/// Operations the tools need from Cloudglue.
#[async_trait]
pub trait CloudGlueApi: Send + Sync {
    async fn submit_job(&self, request: &JobRequest) -> Result<Job>;
    async fn get_job(&self, kind: JobKind, job_id: &str, options: &FetchOptions) -> Result<Job>;
    async fn list_jobs(&self, kind: JobKind, query: &JobQuery) -> Result<ListResponse<Job>>;

    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<Collection>;
    async fn get_collection(&self, collection_id: &str) -> Result<Collection>;
    async fn list_collections(&self, query: &CollectionQuery) -> Result<ListResponse<Collection>>;
    async fn delete_collection(&self, collection_id: &str) -> Result<()>;
    async fn add_video(&self, collection_id: &str, source: &VideoSource) -> Result<CollectionVideo>;
    async fn get_collection_video(&self, collection_id: &str, file_id: &str) -> Result<CollectionVideo>;
    async fn remove_video(&self, collection_id: &str, file_id: &str) -> Result<()>;
    async fn list_collection_videos(
        &self,
        collection_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ListResponse<CollectionVideo>>;
    async fn get_video_artifact(
        &self,
        collection_id: &str,
        file_id: &str,
        kind: ArtifactKind,
        options: &FetchOptions,
    ) -> Result<Value>;
    async fn list_artifacts(
        &self,
        collection_id: &str,
        kind: ArtifactKind,
        limit: u32,
        offset: u32,
    ) -> Result<ListResponse<Value>>;

    async fn upload_file(&self, upload: FileUpload) -> Result<FileRecord>;
    async fn get_file(&self, file_id: &str) -> Result<FileRecord>;
    async fn list_files(&self, limit: u32, offset: u32) -> Result<ListResponse<FileRecord>>;

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatCompletion>;
}

/// HTTPS implementation of [`CloudGlueApi`].
#[derive(Clone)]
pub struct CloudGlueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CloudGlueClient {
    /// Build a client from the loaded configuration.
    #[instrument(level = "debug", name = "cloudglue_client_new", skip_all)]
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(&config.api_key, &config.base_url)
    }

    /// Build a client against an explicit base URL (used by tests with a mock server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .user_agent(concat!("cloudglue-mcp-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::api(&base_url, 0, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send_raw(&self, request: RequestBuilder, endpoint: &str) -> Result<reqwest::Response> {
        debug!(endpoint = %endpoint, "Calling Cloudglue API");

        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::api(endpoint, 0, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(endpoint, status.as_u16(), body));
        }
        Ok(response)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> Result<T> {
        let response = self.send_raw(request, endpoint).await?;
        let status = response.status();
        response.json::<T>().await.map_err(|e| {
            Error::api(endpoint, status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &impl serde::Serialize) -> Result<T> {
        let endpoint = self.url(path);
        self.send(self.http.get(&endpoint).query(query), &endpoint).await
    }

    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let endpoint = self.url(path);
        self.send(self.http.get(&endpoint), &endpoint).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl serde::Serialize) -> Result<T> {
        let endpoint = self.url(path);
        self.send(self.http.post(&endpoint).json(body), &endpoint).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let endpoint = self.url(path);
        self.send_raw(self.http.delete(&endpoint), &endpoint).await?;
        Ok(())
    }
}

#[derive(serde::Serialize)]
struct Page {
    limit: u32,
    offset: u32,
}

#[async_trait]
impl CloudGlueApi for CloudGlueClient {
    #[instrument(level = "debug", skip(self, request), fields(kind = %request.kind, url = %request.url))]
    async fn submit_job(&self, request: &JobRequest) -> Result<Job> {
        self.post(request.kind.path(), &request.body()).await
    }

    async fn get_job(&self, kind: JobKind, job_id: &str, options: &FetchOptions) -> Result<Job> {
        self.get(&format!("{}/{}", kind.path(), job_id), options).await
    }

    async fn list_jobs(&self, kind: JobKind, query: &JobQuery) -> Result<ListResponse<Job>> {
        self.get(kind.path(), query).await
    }

    #[instrument(level = "debug", skip(self, request), fields(name = %request.name))]
    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<Collection> {
        self.post("collections", request).await
    }

    async fn get_collection(&self, collection_id: &str) -> Result<Collection> {
        self.get_one(&format!("collections/{}", collection_id)).await
    }

    async fn list_collections(&self, query: &CollectionQuery) -> Result<ListResponse<Collection>> {
        self.get("collections", query).await
    }

    async fn delete_collection(&self, collection_id: &str) -> Result<()> {
        self.delete(&format!("collections/{}", collection_id)).await
    }

    async fn add_video(&self, collection_id: &str, source: &VideoSource) -> Result<CollectionVideo> {
        self.post(&format!("collections/{}/videos", collection_id), &source.body())
            .await
    }

    async fn get_collection_video(&self, collection_id: &str, file_id: &str) -> Result<CollectionVideo> {
        self.get_one(&format!("collections/{}/videos/{}", collection_id, file_id))
            .await
    }

    async fn remove_video(&self, collection_id: &str, file_id: &str) -> Result<()> {
        self.delete(&format!("collections/{}/videos/{}", collection_id, file_id))
            .await
    }

    async fn list_collection_videos(
        &self,
        collection_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ListResponse<CollectionVideo>> {
        self.get(
            &format!("collections/{}/videos", collection_id),
            &Page { limit, offset },
        )
        .await
    }

    async fn get_video_artifact(
        &self,
        collection_id: &str,
        file_id: &str,
        kind: ArtifactKind,
        options: &FetchOptions,
    ) -> Result<Value> {
        self.get(
            &format!("collections/{}/videos/{}/{}", collection_id, file_id, kind.path()),
            options,
        )
        .await
    }

    async fn list_artifacts(
        &self,
        collection_id: &str,
        kind: ArtifactKind,
        limit: u32,
        offset: u32,
    ) -> Result<ListResponse<Value>> {
        self.get(
            &format!("collections/{}/{}", collection_id, kind.path()),
            &Page { limit, offset },
        )
        .await
    }

    #[instrument(level = "debug", skip(self, upload), fields(filename = %upload.filename, bytes = upload.bytes.len()))]
    async fn upload_file(&self, upload: FileUpload) -> Result<FileRecord> {
        use reqwest::multipart::{Form, Part};

        let endpoint = self.url("files");
        let part = Part::bytes(upload.bytes)
            .file_name(upload.filename)
            .mime_str(&upload.mime_type)
            .map_err(|e| Error::validation(format!("Invalid MIME type '{}': {}", upload.mime_type, e)))?;
        let form = Form::new()
            .part("file", part)
            .text("metadata", upload.metadata.to_string());

        // Some deployments wrap the created file in `data`.
        let body: Value = self
            .send(self.http.post(&endpoint).multipart(form), &endpoint)
            .await?;
        let record = match body.get("data") {
            Some(inner) if inner.get("id").is_some() => inner.clone(),
            _ => body,
        };
        serde_json::from_value(record)
            .map_err(|e| Error::api(&endpoint, 200, format!("Unexpected upload response: {}", e)))
    }

    async fn get_file(&self, file_id: &str) -> Result<FileRecord> {
        self.get_one(&format!("files/{}", file_id)).await
    }

    async fn list_files(&self, limit: u32, offset: u32) -> Result<ListResponse<FileRecord>> {
        self.get("files", &Page { limit, offset }).await
    }

    #[instrument(level = "debug", skip(self, request), fields(scope = ?request.scope, limit = request.limit))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.post("search", request).await
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        self.post("chat/completions", request).await
    }
}
