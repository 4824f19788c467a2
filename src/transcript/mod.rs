use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod youtube;

pub use youtube::YoutubeTranscriptSource;

use crate::Result;

/// One caption line as returned by the transcript service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
}

impl TranscriptLine {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// Transcript retrieval capability.
///
/// `Ok(None)` means the video has no usable transcript; callers skip such videos.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn get_transcript(&self, video_id: &str) -> Result<Option<Vec<TranscriptLine>>>;
}

/// Join every line into one blob, each line followed by a newline
pub fn merge_lines(lines: &[TranscriptLine]) -> String {
    lines.iter().fold(String::new(), |mut merged, line| {
        merged.push_str(&line.text);
        merged.push('\n');
        merged
    })
}

/// End time of the last line, in seconds
pub fn total_duration(lines: &[TranscriptLine]) -> f64 {
    lines
        .iter()
        .map(|line| line.start + line.duration)
        .fold(0.0, f64::max)
}
