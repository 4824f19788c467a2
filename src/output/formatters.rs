use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::ProcessingResult;

const RULE_WIDTH: usize = 50;

/// Render results with the plain-text template: one numbered block per video with its
/// summary and translated subtitles, closed by a double rule.
pub fn format_as_text(videos: &[ProcessingResult]) -> String {
    let mut output = String::new();

    for (index, video) in videos.iter().enumerate() {
        output.push_str(&format_video_block(index + 1, video));
    }

    output
}

/// One video in the plain-text template
pub fn format_video_block(number: usize, video: &ProcessingResult) -> String {
    let title = if video.video.title.is_empty() {
        "Untitled video"
    } else {
        video.video.title.as_str()
    };
    let summary = if video.summary.is_empty() {
        "No summary"
    } else {
        video.summary.as_str()
    };

    let mut block = String::new();
    block.push_str(&format!("Video {}: {}\n", number, title));
    block.push_str(&"-".repeat(RULE_WIDTH));
    block.push('\n');

    block.push_str("[Summary]\n");
    block.push_str(summary);
    block.push_str("\n\n");

    block.push_str("[Translated subtitles]\n");
    block.push_str(&video.translated_subtitles);
    block.push('\n');

    block.push('\n');
    block.push_str(&"=".repeat(RULE_WIDTH));
    block.push_str("\n\n");
    block
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generated_at: String,
    video_count: usize,
    videos: &'a [ProcessingResult],
}

/// Render results as pretty JSON with a small header
pub fn format_as_json(videos: &[ProcessingResult]) -> Result<String> {
    let export = JsonExport {
        generated_at: Utc::now().to_rfc3339(),
        video_count: videos.len(),
        videos,
    };

    Ok(serde_json::to_string_pretty(&export)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::VideoDescriptor;

    fn result(id: &str, title: &str, summary: &str) -> ProcessingResult {
        ProcessingResult::new(
            VideoDescriptor {
                video_id: id.to_string(),
                title: title.to_string(),
                url: format!("https://www.youtube.com/watch?v={}", id),
                publish_date: Some("2024-01-02".to_string()),
                description: String::new(),
            },
            "你好\n世界\n".to_string(),
            summary.to_string(),
        )
    }

    #[test]
    fn test_text_template() {
        let text = format_as_text(&[result("v1", "First", "Short summary")]);

        let rule = "-".repeat(50);
        let double_rule = "=".repeat(50);
        assert_eq!(
            text,
            format!(
                "Video 1: First\n{}\n[Summary]\nShort summary\n\n[Translated subtitles]\n你好\n世界\n\n\n{}\n\n",
                rule, double_rule
            )
        );
    }

    #[test]
    fn test_text_numbers_videos_and_fills_blanks() {
        let text = format_as_text(&[result("v1", "First", "s"), result("v2", "", "")]);

        assert!(text.contains("Video 1: First\n"));
        assert!(text.contains("Video 2: Untitled video\n"));
        assert!(text.contains("[Summary]\nNo summary\n"));
    }

    #[test]
    fn test_json_export() {
        let json = format_as_json(&[result("v1", "First", "Short summary")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["video_count"], 1);
        assert_eq!(value["videos"][0]["video_id"], "v1");
        assert_eq!(value["videos"][0]["publish_date"], "2024-01-02");
        assert_eq!(value["videos"][0]["summary"], "Short summary");
    }
}
