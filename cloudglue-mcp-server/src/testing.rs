//! In-memory [`CloudGlueApi`] used by the tool tests.

use crate::client::*;
use crate::handler::CloudGlueHandler;
use crate::pagination::Dated;
use crate::poller::{JobPoller, PollPolicy};
use crate::youtube::YoutubeFeeds;
use async_trait::async_trait;
use cloudglue_mcp_common::error::{Error, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every call and serves canned data.
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<JobRequest>>,
    /// Results of `list_jobs`, per kind.
    pub existing_jobs: Mutex<HashMap<JobKind, Vec<Job>>>,
    /// Jobs served by `get_job`.
    pub jobs: Mutex<HashMap<String, Job>>,
    pub files: Mutex<HashMap<String, FileRecord>>,
    pub collections: Mutex<HashMap<String, Collection>>,
    pub collection_videos: Mutex<HashMap<String, Vec<CollectionVideo>>>,
    pub artifacts: Mutex<HashMap<(String, ArtifactKind), Vec<Value>>>,
    pub video_artifacts: Mutex<HashMap<(String, String, ArtifactKind), Value>>,
    /// URLs that `add_video` rejects.
    pub rejected_urls: Mutex<HashSet<String>>,
    pub search_results: Mutex<Vec<Value>>,
    pub chat: Mutex<Option<ChatCompletion>>,
    pub uploads: Mutex<Vec<FileUpload>>,
    /// Status given to submitted jobs once fetched.
    pub job_outcome: Mutex<Option<(JobStatus, Option<Value>)>>,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_named(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn not_found(what: &str, id: &str) -> Error {
        Error::api(format!("fake://{}/{}", what, id), 404, format!("{} {} not found", what, id))
    }

    pub fn add_job(&self, kind: JobKind, job: Value) {
        let job: Job = serde_json::from_value(job).unwrap();
        self.jobs.lock().unwrap().insert(job.job_id.clone(), job.clone());
        self.existing_jobs.lock().unwrap().entry(kind).or_default().push(job);
    }

    pub fn add_file(&self, file: Value) {
        let file: FileRecord = serde_json::from_value(file).unwrap();
        self.files.lock().unwrap().insert(file.id.clone(), file);
    }

    pub fn add_collection(&self, collection: Value) {
        let collection: Collection = serde_json::from_value(collection).unwrap();
        self.collections
            .lock()
            .unwrap()
            .insert(collection.id.clone(), collection);
    }

    pub fn add_collection_video(&self, collection_id: &str, video: Value) {
        let video: CollectionVideo = serde_json::from_value(video).unwrap();
        self.collection_videos
            .lock()
            .unwrap()
            .entry(collection_id.to_string())
            .or_default()
            .push(video);
    }

    /// Handler over this fake with a 10 ms poll interval.
    pub fn handler(self: &Arc<Self>) -> CloudGlueHandler {
        self.handler_in(std::env::temp_dir())
    }

    pub fn handler_in(self: &Arc<Self>, working_dir: PathBuf) -> CloudGlueHandler {
        CloudGlueHandler::with_deps(
            self.clone(),
            JobPoller::new(PollPolicy {
                interval: Duration::from_millis(10),
                max_attempts: Some(50),
            }),
            YoutubeFeeds::with_base_url("http://127.0.0.1:9"),
            working_dir,
        )
    }

    async fn track<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let out = fut.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

#[async_trait]
impl CloudGlueApi for FakeApi {
    async fn submit_job(&self, request: &JobRequest) -> Result<Job> {
        self.record(format!("submit_job:{}:{}", request.kind, request.url));
        self.submitted.lock().unwrap().push(request.clone());

        let job_id = self.next_id("job");
        let (status, error) = self
            .job_outcome
            .lock()
            .unwrap()
            .clone()
            .unwrap_or((JobStatus::Completed, None));

        let mut finished = json!({
            "job_id": job_id,
            "status": status.as_str(),
            "url": request.url,
            "data": {
                "content": format!("{} of {}", request.kind, request.url),
                "entities": { "topic": "demo" },
                "segment_entities": (0..30).map(|i| json!({ "n": i })).collect::<Vec<_>>(),
            },
            "segments": [
                { "start_time": 0.0, "end_time": 62.5, "description": "Intro" },
                { "start_time": 62.5, "end_time": 3700.0 }
            ],
        });
        if let Some(error) = error {
            finished["error"] = error;
        }
        let finished: Job = serde_json::from_value(finished).unwrap();
        self.jobs.lock().unwrap().insert(job_id.clone(), finished);

        Ok(serde_json::from_value(json!({ "job_id": job_id, "status": "pending" })).unwrap())
    }

    async fn get_job(&self, kind: JobKind, job_id: &str, options: &FetchOptions) -> Result<Job> {
        self.record(format!(
            "get_job:{}:{}:{:?}:{:?}",
            kind, job_id, options.start_time_seconds, options.end_time_seconds
        ));
        self.jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| Self::not_found("job", job_id))
    }

    async fn list_jobs(&self, kind: JobKind, query: &JobQuery) -> Result<ListResponse<Job>> {
        self.record(format!("list_jobs:{}", kind));
        let jobs = self.existing_jobs.lock().unwrap().get(&kind).cloned().unwrap_or_default();
        let matching: Vec<Job> = jobs
            .into_iter()
            .filter(|j| query.url.is_none() || j.url == query.url)
            .filter(|j| query.status.as_ref().is_none_or(|s| &j.status == s))
            .filter(|j| query.criteria.is_none() || j.criteria == query.criteria)
            .take(query.limit as usize)
            .collect();
        Ok(ListResponse::new(matching))
    }

    async fn create_collection(&self, request: &CreateCollectionRequest) -> Result<Collection> {
        self.record(format!("create_collection:{}", request.name));
        let id = self.next_id("col");
        let collection: Collection = serde_json::from_value(json!({
            "id": id,
            "name": request.name,
            "collection_type": request.collection_type,
            "description": request.description,
            "created_at": "2024-06-01T00:00:00Z",
            "config": Value::Object(request.config.clone()),
        }))
        .unwrap();
        self.collections.lock().unwrap().insert(id, collection.clone());
        Ok(collection)
    }

    async fn get_collection(&self, collection_id: &str) -> Result<Collection> {
        self.record(format!("get_collection:{}", collection_id));
        self.collections
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .ok_or_else(|| Self::not_found("collection", collection_id))
    }

    async fn list_collections(&self, query: &CollectionQuery) -> Result<ListResponse<Collection>> {
        self.record("list_collections");
        let mut all: Vec<Collection> = self.collections.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        let total = all.len() as u64;
        let data = all
            .into_iter()
            .filter(|c| query.collection_type.is_none() || c.collection_type == query.collection_type)
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        let mut list = ListResponse::new(data);
        list.total = Some(total);
        Ok(list)
    }

    async fn delete_collection(&self, collection_id: &str) -> Result<()> {
        self.record(format!("delete_collection:{}", collection_id));
        self.collections
            .lock()
            .unwrap()
            .remove(collection_id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("collection", collection_id))
    }

    async fn add_video(&self, collection_id: &str, source: &VideoSource) -> Result<CollectionVideo> {
        self.track(async {
            let (label, file_id) = match source {
                VideoSource::Url(url) => {
                    if self.rejected_urls.lock().unwrap().contains(url) {
                        return Err(Error::api("fake://collections/videos", 400, format!("No transcript available for {}", url)));
                    }
                    (url.clone(), self.next_id("file"))
                }
                VideoSource::FileId(id) => (id.clone(), id.clone()),
            };
            self.record(format!("add_video:{}:{}", collection_id, label));

            self.files.lock().unwrap().entry(file_id.clone()).or_insert_with(|| {
                serde_json::from_value(json!({
                    "id": file_id,
                    "status": "completed",
                    "filename": format!("{}.mp4", file_id),
                    "uri": format!("cloudglue://files/{}", file_id),
                    "created_at": "2024-06-02T00:00:00Z",
                    "video_info": { "duration_seconds": 120.0, "has_audio": true },
                }))
                .unwrap()
            });

            let video: CollectionVideo = serde_json::from_value(json!({
                "collection_id": collection_id,
                "file_id": file_id,
                "status": "completed",
                "added_at": "2024-06-02T00:00:00Z",
            }))
            .unwrap();
            self.collection_videos
                .lock()
                .unwrap()
                .entry(collection_id.to_string())
                .or_default()
                .push(video.clone());

            let mut pending = video;
            pending.status = JobStatus::Processing;
            Ok(pending)
        })
        .await
    }

    async fn get_collection_video(&self, collection_id: &str, file_id: &str) -> Result<CollectionVideo> {
        self.record(format!("get_collection_video:{}:{}", collection_id, file_id));
        self.collection_videos
            .lock()
            .unwrap()
            .get(collection_id)
            .and_then(|videos| videos.iter().find(|v| v.file_id == file_id).cloned())
            .ok_or_else(|| Self::not_found("video", file_id))
    }

    async fn remove_video(&self, collection_id: &str, file_id: &str) -> Result<()> {
        self.record(format!("remove_video:{}:{}", collection_id, file_id));
        let mut videos = self.collection_videos.lock().unwrap();
        let list = videos
            .get_mut(collection_id)
            .ok_or_else(|| Self::not_found("collection", collection_id))?;
        let before = list.len();
        list.retain(|v| v.file_id != file_id);
        if list.len() == before {
            return Err(Self::not_found("video", file_id));
        }
        Ok(())
    }

    async fn list_collection_videos(
        &self,
        collection_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<ListResponse<CollectionVideo>> {
        self.record(format!("list_collection_videos:{}:{}", collection_id, limit));
        let all = self
            .collection_videos
            .lock()
            .unwrap()
            .get(collection_id)
            .cloned()
            .unwrap_or_default();
        let total = all.len() as u64;
        let mut list = ListResponse::new(
            all.into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
        );
        list.total = Some(total);
        Ok(list)
    }

    async fn get_video_artifact(
        &self,
        collection_id: &str,
        file_id: &str,
        kind: ArtifactKind,
        options: &FetchOptions,
    ) -> Result<Value> {
        self.record(format!(
            "get_video_artifact:{}:{}:{}:{:?}",
            collection_id,
            file_id,
            kind.path(),
            options.offset
        ));
        self.video_artifacts
            .lock()
            .unwrap()
            .get(&(collection_id.to_string(), file_id.to_string(), kind))
            .cloned()
            .ok_or_else(|| Self::not_found(kind.path(), file_id))
    }

    async fn list_artifacts(
        &self,
        collection_id: &str,
        kind: ArtifactKind,
        limit: u32,
        offset: u32,
    ) -> Result<ListResponse<Value>> {
        self.record(format!("list_artifacts:{}:{}:{}:{}", collection_id, kind.path(), limit, offset));
        let all = self
            .artifacts
            .lock()
            .unwrap()
            .get(&(collection_id.to_string(), kind))
            .cloned()
            .unwrap_or_default();
        let total = all.len() as u64;
        let mut list = ListResponse::new(
            all.into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
        );
        list.total = Some(total);
        Ok(list)
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<FileRecord> {
        self.record(format!("upload_file:{}", upload.filename));
        let id = self.next_id("file");
        let done: FileRecord = serde_json::from_value(json!({
            "id": id,
            "status": "completed",
            "filename": upload.filename,
            "uri": format!("cloudglue://files/{}", id),
            "created_at": "2024-06-03T00:00:00Z",
            "metadata": upload.metadata,
            "mime_type": upload.mime_type,
            "video_info": { "duration_seconds": 95.0, "has_audio": true, "width": 1280 },
        }))
        .unwrap();
        self.files.lock().unwrap().insert(id.clone(), done.clone());
        self.uploads.lock().unwrap().push(upload);

        let mut pending = done;
        pending.status = JobStatus::Processing;
        Ok(pending)
    }

    async fn get_file(&self, file_id: &str) -> Result<FileRecord> {
        self.record(format!("get_file:{}", file_id));
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| Self::not_found("file", file_id))
    }

    async fn list_files(&self, limit: u32, offset: u32) -> Result<ListResponse<FileRecord>> {
        self.record(format!("list_files:{}:{}", limit, offset));
        let mut all: Vec<FileRecord> = self.files.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| a.id.cmp(&b.id)));
        let total = all.len() as u64;
        let mut list = ListResponse::new(
            all.into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
        );
        list.total = Some(total);
        Ok(list)
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.record(format!("search:{:?}:{}", request.scope, request.limit));
        Ok(SearchResponse {
            results: self.search_results.lock().unwrap().clone(),
            extra: Default::default(),
        })
    }

    async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatCompletion> {
        self.record(format!("chat_completion:{}", request.model));
        Ok(self.chat.lock().unwrap().clone().unwrap_or_default())
    }
}
