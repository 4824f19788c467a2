use serde_json::Value;

use crate::Result;

/// Assignments that introduce the page's initial browse data
const INITIAL_DATA_MARKERS: &[&str] = &[
    "var ytInitialData = ",
    "window[\"ytInitialData\"] = ",
    "ytInitialData = ",
];

/// Assignments that introduce the player response on watch pages
const PLAYER_RESPONSE_MARKERS: &[&str] = &[
    "var ytInitialPlayerResponse = ",
    "ytInitialPlayerResponse = ",
];

/// Decode the `ytInitialData` blob embedded in a browse or playlist page.
pub fn initial_data(html: &str) -> Result<Value> {
    extract_assigned_json(html, INITIAL_DATA_MARKERS)
        .ok_or_else(|| anyhow::anyhow!("ytInitialData not found in page"))?
}

/// Decode the `ytInitialPlayerResponse` blob embedded in a watch page.
pub fn player_response(html: &str) -> Result<Value> {
    extract_assigned_json(html, PLAYER_RESPONSE_MARKERS)
        .ok_or_else(|| anyhow::anyhow!("ytInitialPlayerResponse not found in page"))?
}

/// Find the first marker in `html` and parse the single JSON object that follows it.
///
/// Returns `None` when no marker is present and `Some(Err(_))` when the blob is malformed.
/// The object is read with a streaming deserializer so a `};` inside a string value does not
/// cut it short.
fn extract_assigned_json(html: &str, markers: &[&str]) -> Option<Result<Value>> {
    let start = markers
        .iter()
        .find_map(|marker| html.find(marker).map(|idx| idx + marker.len()))?;

    let rest = html[start..].trim_start();
    let parsed = serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()?;

    Some(parsed.map_err(|e| anyhow::anyhow!("Failed to parse embedded page data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_data_reads_whole_object() {
        let html = r#"<script>var ytInitialData = {"title":"a};b","items":[{"videoId":"x"}]};</script>"#;
        let data = initial_data(html).unwrap();

        assert_eq!(data["title"], "a};b");
        assert_eq!(data["items"][0]["videoId"], "x");
    }

    #[test]
    fn test_initial_data_window_assignment() {
        let html = r#"window["ytInitialData"] = {"ok":true};"#;
        assert_eq!(initial_data(html).unwrap()["ok"], true);
    }

    #[test]
    fn test_missing_and_malformed_blobs_fail() {
        assert!(initial_data("<html></html>").is_err());
        assert!(initial_data("var ytInitialData = {\"broken\": ;").is_err());
    }

    #[test]
    fn test_player_response() {
        let html = r#"var ytInitialPlayerResponse = {"videoDetails":{"videoId":"v1"}};var meta = 1;"#;
        assert_eq!(player_response(html).unwrap()["videoDetails"]["videoId"], "v1");
    }
}
