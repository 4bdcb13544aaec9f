//! Getting videos into Cloudglue: local uploads and YouTube ingestion.

use crate::batch::{run_batched, BatchItem, YOUTUBE_BATCH_SIZE};
use crate::client::{CollectionVideo, FileRecord, FileUpload, VideoSource};
use crate::handler::{check_not_empty, check_range, error_json, format_duration, to_pretty, validation_failure, CloudGlueHandler, ValidationError};
use crate::tools::videos::video_entry;
use crate::youtube::{FeedSource, MAX_FEED_VIDEOS};
use cloudglue_mcp_common::error::{Error, Result};
use futures::future::join_all;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Files listed when a requested path does not exist.
const DIRECTORY_LISTING_LIMIT: usize = 50;

/// Collection videos inspected for the post-ingest snapshot.
const SNAPSHOT_LIMIT: u32 = 100;

const MAX_YOUTUBE_URLS: usize = 50;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddFileParams {
    /// Local file to upload, absolute or relative to the working directory
    #[serde(default)]
    pub local_file_path: Option<String>,
    /// Existing Cloudglue file ID to add to a collection instead of uploading
    #[serde(default)]
    pub file_id: Option<String>,
    /// Collection to add the file to once it is processed
    #[serde(default)]
    pub collection_id: Option<String>,
}

fn default_feed_limit() -> u32 {
    MAX_FEED_VIDEOS as u32
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddYoutubeParams {
    /// Collection to add the videos to
    pub collection_id: String,
    /// Up to 50 individual YouTube video URLs
    #[serde(default)]
    pub youtube_urls: Option<Vec<String>>,
    /// Playlist URL; its most recent videos are added
    #[serde(default)]
    pub playlist_url: Option<String>,
    /// Channel URL (/channel/, /@handle, /c/ or /user/); its most recent uploads are added
    #[serde(default)]
    pub channel_url: Option<String>,
    /// Videos taken from a playlist or channel feed (1-15)
    #[serde(default = "default_feed_limit")]
    pub limit: u32,
}

impl AddYoutubeParams {
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_not_empty(&mut errors, "collection_id", &self.collection_id);
        check_range(&mut errors, "limit", self.limit, 1, MAX_FEED_VIDEOS as u32);
        if let Some(urls) = &self.youtube_urls {
            if urls.len() > MAX_YOUTUBE_URLS {
                errors.push(ValidationError::new(
                    "youtube_urls",
                    format!("at most {} URLs are allowed, got {}", MAX_YOUTUBE_URLS, urls.len()),
                ));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn source_count(&self) -> usize {
        [
            self.youtube_urls.is_some(),
            self.playlist_url.is_some(),
            self.channel_url.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    fn feed_limit(&self) -> Option<u32> {
        (self.playlist_url.is_some() || self.channel_url.is_some()).then_some(self.limit)
    }
}

/// MIME type by file extension.
pub fn mime_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Human-readable size with two decimals, e.g. `1.50 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

/// Names of the files (with an extension) in `dir`: total count and the first few.
async fn directory_listing(dir: &Path) -> (usize, Vec<String>) {
    let mut names = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_file && name.contains('.') {
                names.push(name);
            }
        }
    }
    names.sort();
    let total = names.len();
    names.truncate(DIRECTORY_LISTING_LIMIT);
    (total, names)
}

fn extra(map: &Map<String, Value>, key: &str) -> Value {
    map.get(key).cloned().unwrap_or(Value::Null)
}

/// Detailed file block of an `add_file` response.
fn file_metadata(file: &FileRecord) -> Value {
    let video_info = file.video_info.as_ref().map(|info| {
        json!({
            "duration_seconds": info.duration_seconds,
            "duration_formatted": info.duration_seconds.map(format_duration),
            "has_audio": info.has_audio,
            "width": extra(&info.extra, "width"),
            "height": extra(&info.extra, "height"),
            "fps": extra(&info.extra, "fps"),
            "bitrate": extra(&info.extra, "bitrate"),
            "codec": extra(&info.extra, "codec"),
        })
    });
    json!({
        "filename": file.filename,
        "uri": file.uri,
        "status": file.status,
        "created_at": file.created_at,
        "updated_at": extra(&file.extra, "updated_at"),
        "file_size": extra(&file.extra, "file_size"),
        "mime_type": extra(&file.extra, "mime_type"),
        "metadata": file.metadata.clone().unwrap_or_else(|| json!({})),
        "video_info": video_info,
        "processing_info": {
            "upload_completed_at": extra(&file.extra, "upload_completed_at"),
            "processing_started_at": extra(&file.extra, "processing_started_at"),
            "processing_completed_at": extra(&file.extra, "processing_completed_at"),
        },
    })
}

/// A local file checked and read, ready to upload.
struct LocalFile {
    resolved: PathBuf,
    upload: FileUpload,
}

impl CloudGlueHandler {
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Read a local file for upload, or describe why it cannot be read.
    async fn read_local_file(&self, original: &str) -> std::result::Result<LocalFile, String> {
        let resolved = self.resolve_path(original);
        let working_dir = self.working_dir.display().to_string();
        let context = json!({
            "resolved_path": resolved.display().to_string(),
            "working_dir": working_dir,
            "original_path": original,
        });
        let permission_denied = || {
            error_json(
                format!("Permission denied: Cannot read file {}", resolved.display()),
                context.clone(),
            )
        };

        let meta = match tokio::fs::metadata(&resolved).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let (total, first) = directory_listing(&self.working_dir).await;
                let mut body = context.clone();
                body["directory_info"] = json!({
                    "total_files_with_extensions": total,
                    "first_50_files": first,
                    "showing_count": first.len(),
                });
                return Err(error_json(format!("File not found: {}", resolved.display()), body));
            }
            Err(_) => return Err(permission_denied()),
        };

        if !meta.is_file() {
            return Err(error_json(format!("Not a file: {}", resolved.display()), context.clone()));
        }

        let bytes = match tokio::fs::read(&resolved).await {
            Ok(bytes) => bytes,
            Err(_) => return Err(permission_denied()),
        };

        let filename = resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| original.to_string());
        let mime = mime_type(&filename);
        let size = meta.len();

        Ok(LocalFile {
            upload: FileUpload {
                filename,
                mime_type: mime.to_string(),
                bytes,
                metadata: json!({
                    "source": "mcp_local_upload",
                    "original_path": resolved.display().to_string(),
                    "working_dir": working_dir,
                    "mime_type": mime,
                    "file_size": size,
                    "file_size_formatted": format_file_size(size),
                }),
            },
            resolved,
        })
    }

    async fn ingest_file(&self, params: &AddFileParams, local: Option<LocalFile>) -> Result<Value> {
        let (file, upload_info) = match local {
            Some(local) => {
                let uploaded = self.api.upload_file(local.upload).await?;
                info!(file_id = %uploaded.id, "Uploaded file");
                let ready = self.poller.wait_for_file(self.api.as_ref(), uploaded).await?;
                if !ready.status.is_completed() {
                    return Err(Error::job_failed(
                        "file",
                        ready.id.clone(),
                        ready.status.as_str(),
                        "file processing did not complete",
                    ));
                }
                let info = json!({
                    "original_path": params.local_file_path,
                    "resolved_path": local.resolved.display().to_string(),
                    "working_dir": self.working_dir.display().to_string(),
                });
                (ready, Some(info))
            }
            None => {
                let file_id = params.file_id.as_deref().unwrap_or_default();
                (self.api.get_file(file_id).await?, None)
            }
        };

        let collection_info = match &params.collection_id {
            Some(collection_id) => {
                let added = self
                    .api
                    .add_video(collection_id, &VideoSource::FileId(file.id.clone()))
                    .await?;
                let video = self
                    .poller
                    .wait_for_collection_video(self.api.as_ref(), collection_id, added)
                    .await?;
                json!({
                    "collection_id": collection_id,
                    "added_at": video.added_at,
                    "status": video.status,
                })
            }
            None => Value::Null,
        };

        let operation = if upload_info.is_some() {
            "file_uploaded_and_processed"
        } else {
            "existing_file_processed"
        };
        let mut result = json!({
            "operation": operation,
            "file_uri": file.uri,
            "file_id": file.id,
            "file_metadata": file_metadata(&file),
            "collection_info": collection_info,
        });
        if let Some(info) = upload_info {
            result["upload_info"] = info;
        }
        Ok(result)
    }

    /// Upload a local file (or reuse an existing one) and optionally add it to a collection.
    #[instrument(level = "info", name = "add_file", skip(self, params), fields(local_file_path = ?params.local_file_path, file_id = ?params.file_id))]
    pub async fn add_file(&self, params: AddFileParams) -> Result<String> {
        match (&params.local_file_path, &params.file_id) {
            (None, None) => {
                return Ok(error_json(
                    "Must provide either local_file_path or file_id",
                    json!({ "local_file_path": null, "file_id": null, "collection_id": params.collection_id }),
                ));
            }
            (Some(path), Some(file_id)) => {
                return Ok(error_json(
                    "Cannot provide both local_file_path and file_id - choose one",
                    json!({ "local_file_path": path, "file_id": file_id, "collection_id": params.collection_id }),
                ));
            }
            _ => {}
        }

        let local = match &params.local_file_path {
            Some(path) => match self.read_local_file(path).await {
                Ok(local) => Some(local),
                Err(payload) => return Ok(payload),
            },
            None => None,
        };

        match self.ingest_file(&params, local).await {
            Ok(result) => Ok(to_pretty(&result)),
            Err(e) => Ok(error_json(
                format!("Failed to process file: {}", e),
                json!({
                    "local_file_path": params.local_file_path,
                    "file_id": params.file_id,
                    "collection_id": params.collection_id,
                    "working_dir": self.working_dir.display().to_string(),
                }),
            )),
        }
    }

    /// Add then wait, five videos at a time, and snapshot the collection.
    async fn ingest_youtube(&self, collection_id: &str, urls: Vec<String>) -> Result<Value> {
        let requested = urls.len();

        let additions: Vec<BatchItem<String, CollectionVideo>> =
            run_batched(urls, YOUTUBE_BATCH_SIZE, |url: String| async move {
                self.api.add_video(collection_id, &VideoSource::Url(url)).await
            })
            .await;

        let added: Vec<(String, CollectionVideo)> = additions
            .iter()
            .filter_map(|item| item.result.clone().map(|video| (item.input.clone(), video)))
            .collect();

        let waits = run_batched(added, YOUTUBE_BATCH_SIZE, |(_, video): (String, CollectionVideo)| async move {
            self.poller
                .wait_for_collection_video(self.api.as_ref(), collection_id, video)
                .await
        })
        .await;

        let processing_results: Vec<Value> = waits
            .iter()
            .map(|item| match &item.result {
                Some(video) if video.status.is_completed() => json!({ "url": item.input.0, "status": "completed" }),
                Some(video) => json!({
                    "url": item.input.0,
                    "status": "failed",
                    "error": format!("Video ended in {} status", video.status),
                }),
                None => json!({ "url": item.input.0, "status": "failed", "error": item.error }),
            })
            .collect();
        let completed = processing_results
            .iter()
            .filter(|r| r["status"] == "completed")
            .count();

        let videos = self.collection_snapshot(collection_id).await?;
        let successful = additions.iter().filter(|a| a.is_success()).count();
        info!(collection_id, requested, successful, completed, "Added YouTube videos");

        Ok(json!({
            "operation": "youtube_videos_added",
            "collection_id": collection_id,
            "processing_summary": {
                "total_urls_requested": requested,
                "successful_additions": successful,
                "failed_additions": requested - successful,
                "completed_processing": completed,
                "failed_processing": processing_results.len() - completed,
            },
            "addition_results": additions,
            "processing_results": processing_results,
            "collection_videos": {
                "total_videos": videos.len(),
                "videos": videos,
            },
        }))
    }

    /// Completed videos of a collection with their file details.
    async fn collection_snapshot(&self, collection_id: &str) -> Result<Vec<Value>> {
        let listing = self
            .api
            .list_collection_videos(collection_id, SNAPSHOT_LIMIT, 0)
            .await?;

        Ok(join_all(
            listing
                .data
                .into_iter()
                .filter(|v| v.status.is_completed())
                .map(|video| async move {
                    match self.api.get_file(&video.file_id).await {
                        Ok(file) => {
                            let mut entry = video_entry(&file);
                            entry["collection_id"] = json!(collection_id);
                            entry["added_at"] = json!(video.added_at);
                            entry["status"] = json!(video.status);
                            entry
                        }
                        Err(e) => {
                            warn!(file_id = %video.file_id, error = %e, "Failed to get file details");
                            json!({
                                "file_id": video.file_id,
                                "collection_id": collection_id,
                                "added_at": video.added_at,
                                "status": video.status,
                                "error": format!("Failed to get file details: {}", e),
                            })
                        }
                    }
                }),
        )
        .await)
    }

    /// Add YouTube videos, a playlist or a channel to a collection.
    #[instrument(level = "info", name = "add_youtube", skip(self, params), fields(collection_id = %params.collection_id, limit = params.limit))]
    pub async fn add_youtube(&self, params: AddYoutubeParams) -> Result<String> {
        params.validate().map_err(validation_failure)?;

        match params.source_count() {
            0 => {
                return Ok(error_json(
                    "Must provide either youtube_urls, playlist_url, or channel_url",
                    json!({
                        "collection_id": params.collection_id,
                        "provided_youtube_urls": false,
                        "provided_playlist_url": false,
                        "provided_channel_url": false,
                    }),
                ));
            }
            1 => {}
            _ => {
                return Ok(error_json(
                    "Cannot provide multiple source types - choose one: youtube_urls, playlist_url, or channel_url",
                    json!({
                        "collection_id": params.collection_id,
                        "youtube_urls_count": params.youtube_urls.as_ref().map_or(0, Vec::len),
                        "playlist_url": params.playlist_url,
                        "channel_url": params.channel_url,
                    }),
                ));
            }
        }

        let feed = match (&params.playlist_url, &params.channel_url) {
            (Some(url), _) => Some((FeedSource::Playlist, url.as_str())),
            (_, Some(url)) => Some((FeedSource::Channel, url.as_str())),
            _ => None,
        };

        let (urls, extraction) = match feed {
            Some((source, source_url)) => {
                match self
                    .youtube
                    .extract_videos(source, source_url, params.limit as usize)
                    .await
                {
                    Ok(urls) => {
                        let extraction = json!({
                            "source_type": source,
                            "source_url": source_url,
                            "limit": params.limit,
                            "videos_extracted": urls.len(),
                            "extraction_successful": true,
                        });
                        (urls, Some(extraction))
                    }
                    Err(e) => {
                        let mut context = json!({ "limit": params.limit, "collection_id": params.collection_id });
                        context[format!("{}_url", source)] = json!(source_url);
                        return Ok(error_json(
                            format!("Failed to extract videos from {}: {}", source, e),
                            context,
                        ));
                    }
                }
            }
            None => (params.youtube_urls.clone().unwrap_or_default(), None),
        };

        match self.ingest_youtube(&params.collection_id, urls).await {
            Ok(mut result) => {
                result["input_parameters"] = json!({
                    "used_youtube_urls": params.youtube_urls.is_some(),
                    "used_playlist_url": params.playlist_url.is_some(),
                    "used_channel_url": params.channel_url.is_some(),
                    "limit": params.feed_limit(),
                });
                if let Some(extraction) = extraction {
                    result["source_extraction"] = extraction;
                }
                Ok(to_pretty(&result))
            }
            Err(e) => Ok(error_json(
                format!("Failed to add YouTube videos: {}", e),
                json!({
                    "collection_id": params.collection_id,
                    "youtube_urls_count": params.youtube_urls.as_ref().map_or(0, Vec::len),
                    "playlist_url": params.playlist_url,
                    "channel_url": params.channel_url,
                    "limit": params.feed_limit(),
                }),
            )),
        }
    }
}
