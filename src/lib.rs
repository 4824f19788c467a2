//! Subtitle Digest - discover YouTube videos, translate their transcripts and summarize them
//!
//! This library resolves a channel, playlist or single-video reference into the videos it
//! contains, fetches each transcript, and streams translated subtitles plus a summary per
//! video through a hosted, OpenAI-compatible language model.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{PlaylistDescriptor, VideoDescriptor};
pub use llm::Provider;
pub use pipeline::{
    CancellationToken, ProcessingResult, Session, SessionEvent, SessionOutcome, SessionPipeline,
};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the digest pipeline
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DigestError {
    #[error("Unsupported URL format: {0}")]
    InvalidUrl(String),

    #[error("Failed to resolve {target}: {reason}")]
    Resolution { target: String, reason: String },

    #[error("Failed to fetch video {video_id}: {reason}")]
    Fetch { video_id: String, reason: String },

    #[error("Remote processing failed after {attempts} attempts: {cause}")]
    RemoteProcessing { attempts: u32, cause: String },

    #[error("Unknown provider: {0} (expected one of: dashscope, qiniu)")]
    UnknownProvider(String),

    #[error("A session is already running")]
    SessionActive,
}
