use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use super::{TranscriptLine, TranscriptSource};
use crate::config::{HttpConfig, TranscriptConfig};
use crate::extractors::{browser_headers, json_tree, page_state, watch_url, HttpFetcher};
use crate::Result;

static TEXT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<text start="([\d.]+)"(?: dur="([\d.]+)")?[^>]*>(.*?)</text>"#)
        .expect("caption pattern is valid")
});
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#x[0-9a-fA-F]+|amp|lt|gt|quot|apos);").expect("entity pattern is valid")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// A caption track advertised by the watch page
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub base_url: String,
    pub is_generated: bool,
}

/// Reads captions the way the web player does: watch page → caption track → timed-text XML
pub struct YoutubeTranscriptSource {
    fetcher: Arc<dyn HttpFetcher>,
    headers: HeaderMap,
    timeout: Duration,
    languages: Vec<String>,
}

impl YoutubeTranscriptSource {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, http: &HttpConfig, transcript: &TranscriptConfig) -> Self {
        Self {
            fetcher,
            headers: browser_headers(http),
            timeout: Duration::from_secs(http.page_timeout_secs),
            languages: transcript.languages.clone(),
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.fetcher.get(url, &self.headers, self.timeout).await?;
        if !response.is_success() {
            anyhow::bail!("HTTP {} for {}", response.status, url);
        }
        Ok(response.body)
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    async fn get_transcript(&self, video_id: &str) -> Result<Option<Vec<TranscriptLine>>> {
        let html = self.fetch_text(&watch_url(video_id)).await?;
        let player = page_state::player_response(&html)?;

        let tracks = caption_tracks(&player);
        let Some(track) = pick_track(&tracks, &self.languages) else {
            tracing::info!("No caption tracks for {}", video_id);
            return Ok(None);
        };
        tracing::debug!(
            "Using {} captions for {} (generated: {})",
            track.language_code,
            video_id,
            track.is_generated
        );

        let xml = self.fetch_text(&track.base_url).await?;
        let lines = parse_timed_text(&xml);

        Ok(if lines.is_empty() { None } else { Some(lines) })
    }
}

/// Caption tracks listed in a player response
pub fn caption_tracks(player: &Value) -> Vec<CaptionTrack> {
    json_tree::collect(player, "captionTracks")
        .into_iter()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|track| {
            let language_code = track.get("languageCode")?.as_str()?.to_string();
            let base_url = track.get("baseUrl")?.as_str()?.replace("&fmt=srv3", "");
            let is_generated = track.get("kind").and_then(Value::as_str) == Some("asr");
            Some(CaptionTrack {
                language_code,
                base_url,
                is_generated,
            })
        })
        .collect()
}

/// First track matching the preference list, manual tracks before generated ones, else the
/// first track on offer.
pub fn pick_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    for language in languages {
        let matching = tracks.iter().filter(|t| &t.language_code == language);
        if let Some(track) = matching.clone().find(|t| !t.is_generated).or_else(|| matching.clone().next()) {
            return Some(track);
        }
    }
    tracks.first()
}

/// Parse timed-text XML (`<text start=".." dur="..">...</text>`) into lines
pub fn parse_timed_text(xml: &str) -> Vec<TranscriptLine> {
    TEXT_ELEMENT
        .captures_iter(xml)
        .filter_map(|caps| {
            let start = caps.get(1)?.as_str().parse().ok()?;
            let duration = caps
                .get(2)
                .and_then(|d| d.as_str().parse().ok())
                .unwrap_or(0.0);
            let raw = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            // Captions are escaped twice: once as XML, once as HTML inside it
            let text = decode_entities(&decode_entities(raw));
            let text = TAG.replace_all(&text, "").trim().to_string();

            (!text.is_empty()).then(|| TranscriptLine::new(text, start, duration))
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .unwrap_or_else(|| entity[1..].parse())
                    .ok()
                    .and_then(char::from_u32),
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{HttpResponse, MockHttpFetcher};
    use serde_json::json;

    fn tracks() -> Vec<CaptionTrack> {
        caption_tracks(&json!({"captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
            {"languageCode": "en", "kind": "asr", "baseUrl": "https://example.com/en-auto&fmt=srv3"},
            {"languageCode": "de", "baseUrl": "https://example.com/de"},
            {"languageCode": "en", "baseUrl": "https://example.com/en"}
        ]}}}))
    }

    #[test]
    fn test_caption_tracks_strip_format() {
        let tracks = tracks();
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].base_url, "https://example.com/en-auto");
        assert!(tracks[0].is_generated);
    }

    #[test]
    fn test_pick_track_prefers_manual_in_language_order() {
        let tracks = tracks();
        let languages = vec!["fr".to_string(), "en".to_string()];
        assert_eq!(pick_track(&tracks, &languages).unwrap().base_url, "https://example.com/en");

        let languages = vec!["ja".to_string()];
        assert_eq!(pick_track(&tracks, &languages).unwrap().language_code, "en");
        assert!(pick_track(&[], &languages).is_none());
    }

    #[test]
    fn test_parse_timed_text_decodes_entities() {
        let xml = r#"<?xml version="1.0"?><transcript>
            <text start="0.5" dur="1.2">it&amp;#39;s &lt;b&gt;fine&lt;/b&gt;</text>
            <text start="1.7">Tom &amp;amp; Jerry</text>
            <text start="3" dur="1">   </text>
        </transcript>"#;

        let lines = parse_timed_text(xml);

        assert_eq!(
            lines,
            vec![
                TranscriptLine::new("it's fine", 0.5, 1.2),
                TranscriptLine::new("Tom & Jerry", 1.7, 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_transcript_follows_caption_track() {
        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_get().times(2).returning(|url, _, _| {
            let body = if url.starts_with("https://www.youtube.com/watch") {
                r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"languageCode":"en","baseUrl":"https://www.youtube.com/api/timedtext?v=v1"}]}}};</script>"#.to_string()
            } else {
                r#"<transcript><text start="0" dur="1">hello</text><text start="1" dur="1">world</text></transcript>"#.to_string()
            };
            Ok(HttpResponse { status: 200, body, encoding: None })
        });

        let source = YoutubeTranscriptSource::new(
            Arc::new(fetcher),
            &HttpConfig::default(),
            &TranscriptConfig::default(),
        );
        let lines = source.get_transcript("v1").await.unwrap().unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "world");
    }

    #[tokio::test]
    async fn test_get_transcript_without_tracks_is_none() {
        let mut fetcher = MockHttpFetcher::new();
        fetcher.expect_get().times(1).returning(|_, _, _| {
            Ok(HttpResponse {
                status: 200,
                body: r#"var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"}};"#.to_string(),
                encoding: None,
            })
        });

        let source = YoutubeTranscriptSource::new(
            Arc::new(fetcher),
            &HttpConfig::default(),
            &TranscriptConfig::default(),
        );
        assert!(source.get_transcript("v1").await.unwrap().is_none());
    }
}
