use reqwest::header::HeaderMap;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use super::{watch_url, HttpFetcher, VideoDescriptor};
use crate::{DigestError, Result};

const TITLE_SUFFIX: &str = " - YouTube";

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector is valid"));
static DESCRIPTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:description"]"#).expect("description selector is valid")
});
static PUBLISHED_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[itemprop="datePublished"]"#).expect("date selector is valid")
});

/// Fetches a single watch page and turns it into a [`VideoDescriptor`]
#[derive(Clone)]
pub struct VideoMetadataExtractor {
    fetcher: Arc<dyn HttpFetcher>,
    headers: HeaderMap,
    timeout: Duration,
}

impl VideoMetadataExtractor {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, headers: HeaderMap, timeout: Duration) -> Self {
        Self {
            fetcher,
            headers,
            timeout,
        }
    }

    /// One GET of the watch page, no retry. Transport errors and non-2xx statuses both
    /// surface as [`DigestError::Fetch`].
    pub async fn fetch_single(&self, video_id: &str) -> Result<VideoDescriptor> {
        let url = watch_url(video_id);
        tracing::debug!("Fetching video metadata: {}", url);

        let response = self
            .fetcher
            .get(&url, &self.headers, self.timeout)
            .await
            .map_err(|e| DigestError::Fetch {
                video_id: video_id.to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(DigestError::Fetch {
                video_id: video_id.to_string(),
                reason: format!("HTTP {}", response.status),
            }
            .into());
        }

        Ok(parse_watch_page(video_id, &response.body))
    }
}

/// Read title, description and publish date out of a watch page.
pub fn parse_watch_page(video_id: &str, html: &str) -> VideoDescriptor {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|element| element.text().collect::<String>().replace(TITLE_SUFFIX, ""))
        .unwrap_or_else(|| format!("Video {}", video_id));

    let description = document
        .select(&DESCRIPTION_SELECTOR)
        .next()
        .and_then(|element| element.value().attr("content"))
        .unwrap_or_default()
        .to_string();

    let publish_date = document
        .select(&PUBLISHED_SELECTOR)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(str::to_string);

    VideoDescriptor {
        video_id: video_id.to_string(),
        title,
        url: watch_url(video_id),
        publish_date,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{HttpResponse, MockHttpFetcher};

    const WATCH_PAGE: &str = r#"<html><head>
        <title>Rust in Production - YouTube</title>
        <meta property="og:description" content="A talk about Rust.">
        <meta itemprop="datePublished" content="2024-03-01">
        </head><body></body></html>"#;

    #[test]
    fn test_parse_watch_page_full() {
        let video = parse_watch_page("abc123", WATCH_PAGE);

        assert_eq!(video.video_id, "abc123");
        assert_eq!(video.title, "Rust in Production");
        assert_eq!(video.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(video.description, "A talk about Rust.");
        assert_eq!(video.publish_date.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn test_parse_watch_page_missing_fields() {
        let video = parse_watch_page("xyz", "<html><body>nothing here</body></html>");

        assert_eq!(video.title, "Video xyz");
        assert_eq!(video.description, "");
        assert_eq!(video.publish_date, None);
    }

    #[tokio::test]
    async fn test_fetch_single_requests_watch_url() {
        let mut fetcher = MockHttpFetcher::new();
        fetcher
            .expect_get()
            .withf(|url, _, timeout| {
                url == "https://www.youtube.com/watch?v=abc123" && *timeout == Duration::from_secs(10)
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(HttpResponse {
                    status: 200,
                    body: WATCH_PAGE.to_string(),
                    encoding: Some("utf-8".to_string()),
                })
            });

        let extractor =
            VideoMetadataExtractor::new(Arc::new(fetcher), HeaderMap::new(), Duration::from_secs(10));
        let video = extractor.fetch_single("abc123").await.unwrap();

        assert_eq!(video.title, "Rust in Production");
    }

    #[tokio::test]
    async fn test_fetch_single_non_success_is_fetch_error() {
        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_get().times(1).returning(|_, _, _| {
            Ok(HttpResponse {
                status: 429,
                body: String::new(),
                encoding: None,
            })
        });

        let extractor =
            VideoMetadataExtractor::new(Arc::new(fetcher), HeaderMap::new(), Duration::from_secs(10));
        let err = extractor.fetch_single("gone").await.unwrap_err();

        assert_eq!(
            err.downcast_ref::<DigestError>(),
            Some(&DigestError::Fetch {
                video_id: "gone".to_string(),
                reason: "HTTP 429".to_string(),
            })
        );
    }

    #[test]
    fn test_fetch_single_transport_error_is_fetch_error() {
        tokio_test::block_on(async {
            let mut fetcher = MockHttpFetcher::new();
            fetcher
                .expect_get()
                .returning(|_, _, _| Err(anyhow::anyhow!("connection reset")));

            let extractor = VideoMetadataExtractor::new(
                Arc::new(fetcher),
                HeaderMap::new(),
                Duration::from_secs(10),
            );
            let err = extractor.fetch_single("v").await.unwrap_err();

            assert!(matches!(
                err.downcast_ref::<DigestError>(),
                Some(DigestError::Fetch { reason, .. }) if reason == "connection reset"
            ));
        });
    }
}
