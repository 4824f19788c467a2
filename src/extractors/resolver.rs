use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::video::VideoMetadataExtractor;
use super::{
    browser_headers, channel, playlist, HttpFetcher, PlaylistDescriptor, ReferenceKind,
    VideoDescriptor, PLAYLIST_URL,
};
use crate::config::{DiscoveryConfig, HttpConfig};
use crate::{DigestError, Result};

/// Turns a classified reference into the ordered list of videos behind it
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    async fn resolve(&self, kind: ReferenceKind, id: &str) -> Result<Vec<VideoDescriptor>>;
}

/// Page-scraping [`VideoCatalog`] for channels, playlists and single videos
pub struct ContentResolver {
    fetcher: Arc<dyn HttpFetcher>,
    headers: HeaderMap,
    page_timeout: Duration,
    videos: VideoMetadataExtractor,
    options: DiscoveryConfig,
}

impl ContentResolver {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, http: &HttpConfig, options: DiscoveryConfig) -> Self {
        let headers = browser_headers(http);
        let videos = VideoMetadataExtractor::new(
            fetcher.clone(),
            headers.clone(),
            Duration::from_secs(http.video_timeout_secs),
        );

        Self {
            fetcher,
            headers,
            page_timeout: Duration::from_secs(http.page_timeout_secs),
            videos,
            options,
        }
    }

    /// Fetch a listing page, mapping every failure onto [`DigestError::Resolution`].
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let resolution_error = |reason: String| DigestError::Resolution {
            target: url.to_string(),
            reason,
        };

        let response = self
            .fetcher
            .get(url, &self.headers, self.page_timeout)
            .await
            .map_err(|e| resolution_error(e.to_string()))?;

        if !response.is_success() {
            return Err(resolution_error(format!("HTTP {}", response.status)).into());
        }

        Ok(response.body)
    }

    /// Playlists of a channel, in page order
    pub async fn channel_playlists(&self, handle: &str) -> Result<Vec<PlaylistDescriptor>> {
        let url = channel::playlists_url(handle);
        tracing::info!("Fetching channel playlists: {}", url);

        let html = self.fetch_page(&url).await?;
        channel::playlists_from_page(&html).map_err(|e| {
            DigestError::Resolution {
                target: url.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Videos of one playlist, deduplicated by id in first-seen order
    pub async fn playlist_videos(&self, playlist_id: &str) -> Result<Vec<VideoDescriptor>> {
        let url = format!("{}{}", PLAYLIST_URL, playlist_id);
        tracing::info!("Fetching playlist: {}", url);

        let html = self.fetch_page(&url).await?;
        let video_ids = playlist::video_ids_from_page(&html).map_err(|e| DigestError::Resolution {
            target: url.clone(),
            reason: e.to_string(),
        })?;
        tracing::info!("Found {} unique video ids in playlist {}", video_ids.len(), playlist_id);

        let mut videos = Vec::with_capacity(video_ids.len());
        for video_id in &video_ids {
            match self.videos.fetch_single(video_id).await {
                Ok(video) => videos.push(video),
                Err(e) if self.options.skip_failed_videos => {
                    tracing::warn!("Skipping video {}: {}", video_id, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(videos)
    }

    async fn channel_videos(&self, handle: &str) -> Result<Vec<VideoDescriptor>> {
        let playlists = self.channel_playlists(handle).await?;
        if playlists.is_empty() {
            tracing::info!("No playlists found for channel {}", handle);
            return Ok(Vec::new());
        }

        let mut videos = Vec::new();
        for playlist in &playlists {
            tracing::info!("Collecting videos from playlist {} ({})", playlist.title, playlist.id);
            videos.extend(self.playlist_videos(&playlist.id).await?);
        }

        if self.options.dedup_across_playlists {
            let mut seen = HashSet::new();
            videos.retain(|video| seen.insert(video.video_id.clone()));
        }

        Ok(videos)
    }
}

#[async_trait]
impl VideoCatalog for ContentResolver {
    async fn resolve(&self, kind: ReferenceKind, id: &str) -> Result<Vec<VideoDescriptor>> {
        match kind {
            ReferenceKind::Video => Ok(vec![self.videos.fetch_single(id).await?]),
            ReferenceKind::Playlist => self.playlist_videos(id).await,
            ReferenceKind::Channel => self.channel_videos(id).await,
        }
    }
}
