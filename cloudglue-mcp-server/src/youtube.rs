//! YouTube playlist and channel expansion.
//!
//! Playlists and channels are expanded into individual watch URLs through the
//! public RSS feeds, which list at most the 15 most recent uploads.

use cloudglue_mcp_common::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, instrument};

pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// Upper bound of entries in a YouTube RSS feed.
pub const MAX_FEED_VIDEOS: usize = 15;

/// Kind of multi-video YouTube source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Playlist,
    Channel,
}

impl FeedSource {
    fn query_key(self) -> &'static str {
        match self {
            FeedSource::Playlist => "playlist_id",
            FeedSource::Channel => "channel_id",
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Playlist => f.write_str("playlist"),
            FeedSource::Channel => f.write_str("channel"),
        }
    }
}

/// True for youtube.com and youtu.be links.
pub fn is_youtube_url(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("{}/watch?v={}", YOUTUBE_BASE_URL, video_id)
}

fn playlist_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]list=([^&]+)").expect("playlist regex compiles"))
}

fn channel_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/channel/([^/?]+)").expect("channel path regex compiles"))
}

fn video_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<yt:videoId>([^<]+)</yt:videoId>").expect("video id regex compiles"))
}

/// Channel id markers in a channel page, most reliable first.
fn channel_page_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r#"<link rel="canonical" href="https://www\.youtube\.com/channel/([^"]+)""#,
            r#"<meta property="og:url" content="https://www\.youtube\.com/channel/([^"]+)""#,
            r#""channelId":"([^"]+)""#,
            r#""externalId":"([^"]+)""#,
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("channel page regex compiles"))
        .collect()
    })
}

fn first_capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Playlist id from a `list=` query parameter.
pub fn playlist_id(url: &str) -> Option<String> {
    first_capture(playlist_re(), url)
}

/// Channel id from a `/channel/<id>` URL.
pub fn direct_channel_id(url: &str) -> Option<String> {
    first_capture(channel_path_re(), url)
}

/// Channel id embedded in a channel page (handles, `/c/` and `/user/` URLs).
pub fn channel_id_from_html(html: &str) -> Option<String> {
    channel_page_res()
        .iter()
        .find_map(|re| first_capture(re, html))
}

/// Video ids of an RSS feed in document order.
pub fn video_ids_from_feed(xml: &str) -> Vec<String> {
    video_id_re()
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Fetches YouTube channel pages and RSS feeds.
#[derive(Debug, Clone)]
pub struct YoutubeFeeds {
    http: reqwest::Client,
    base_url: String,
}

impl Default for YoutubeFeeds {
    fn default() -> Self {
        Self::with_base_url(YOUTUBE_BASE_URL)
    }
}

impl YoutubeFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point feed requests at another host (tests use a mock server).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn feed_url(&self, source: FeedSource, id: &str) -> String {
        format!("{}/feeds/videos.xml?{}={}", self.base_url, source.query_key(), id)
    }

    async fn fetch_text(&self, url: &str, what: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::api(url, 0, format!("Failed to fetch {}: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api(
                url,
                status.as_u16(),
                format!("Failed to fetch {}: {}", what, status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| Error::api(url, status.as_u16(), format!("Failed to read {}: {}", what, e)))
    }

    /// Resolve any channel URL form to a channel id.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve_channel_id(&self, channel_url: &str) -> Result<String> {
        if let Some(id) = direct_channel_id(channel_url) {
            return Ok(id);
        }

        let html = self
            .fetch_text(channel_url, "channel page")
            .await
            .map_err(|e| Error::validation(format!("Failed to resolve channel ID: {}", e)))?;

        channel_id_from_html(&html).ok_or_else(|| {
            Error::validation("Failed to resolve channel ID: Could not find channel ID in page source")
        })
    }

    /// Expand a playlist or channel into at most `limit` watch URLs, newest first.
    #[instrument(level = "debug", skip(self))]
    pub async fn extract_videos(
        &self,
        source: FeedSource,
        source_url: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let id = match source {
            FeedSource::Playlist => playlist_id(source_url)
                .ok_or_else(|| Error::validation("Invalid YouTube playlist URL"))?,
            FeedSource::Channel => self.resolve_channel_id(source_url).await?,
        };

        let feed_url = self.feed_url(source, &id);
        let xml = self.fetch_text(&feed_url, &source.to_string()).await?;

        let ids = video_ids_from_feed(&xml);
        if ids.is_empty() {
            return Err(Error::validation(format!(
                "No videos found in {} or {} is private",
                source, source
            )));
        }

        debug!(source = %source, id = %id, found = ids.len(), "Extracted feed videos");
        Ok(ids
            .iter()
            .take(limit.min(MAX_FEED_VIDEOS))
            .map(|id| watch_url(id))
            .collect())
    }
}
