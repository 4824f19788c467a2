use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod channel;
pub mod json_tree;
pub mod page_state;
pub mod playlist;
pub mod reference;
pub mod resolver;
pub mod video;

pub use reference::{classify, ReferenceKind};
pub use resolver::{ContentResolver, VideoCatalog};

use crate::config::HttpConfig;
use crate::Result;

pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
pub const PLAYLIST_URL: &str = "https://www.youtube.com/playlist?list=";

/// Metadata for one discovered video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    /// YouTube video id, unique within a resolved playlist
    pub video_id: String,

    /// Page title without the site-name suffix
    pub title: String,

    /// Canonical watch URL
    pub url: String,

    /// Publish date as published by the page, if present
    pub publish_date: Option<String>,

    /// Open-graph description, empty when absent
    pub description: String,
}

/// A playlist found on a channel's playlists page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistDescriptor {
    pub id: String,
    pub url: String,
    pub title: String,
}

impl PlaylistDescriptor {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            url: format!("{}{}", PLAYLIST_URL, id),
            id,
            title: title.into(),
        }
    }
}

/// Raw page returned by an [`HttpFetcher`]
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub encoding: Option<String>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP GET capability used for every page fetch
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetch `url`. Transport errors are returned as `Err`; any HTTP status is `Ok`.
    async fn get(&self, url: &str, headers: &HeaderMap, timeout: Duration) -> Result<HttpResponse>;
}

/// [`HttpFetcher`] backed by a shared reqwest client
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str, headers: &HeaderMap, timeout: Duration) -> Result<HttpResponse> {
        tracing::debug!("GET {} (timeout {:?})", url, timeout);

        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let encoding = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|content_type| content_type.split("charset=").nth(1))
            .map(|charset| charset.trim().to_string());
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            body,
            encoding,
        })
    }
}

/// Browser-like headers sent with every page request
pub fn browser_headers(config: &HttpConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(&config.user_agent) {
        headers.insert(USER_AGENT, value);
    }
    if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );

    headers
}

/// Canonical watch URL for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL, video_id)
}
