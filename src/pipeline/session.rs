use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::extractors::VideoDescriptor;

/// Cooperative cancellation flag shared between the caller and the worker.
///
/// Setting it never interrupts an in-flight request; the worker checks it between units of work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A video whose transcript was translated and summarized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    #[serde(flatten)]
    pub video: VideoDescriptor,

    /// Translated transcript, one caption line per line
    pub translated_subtitles: String,

    pub summary: String,

    pub processed_at: DateTime<Utc>,
}

impl ProcessingResult {
    pub fn new(video: VideoDescriptor, translated_subtitles: String, summary: String) -> Self {
        Self {
            video,
            translated_subtitles,
            summary,
            processed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionOutcome {
    Completed { processed: usize, total: usize },
    Failed { message: String },
    Cancelled { processed: usize },
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Completed { .. } => SessionState::Completed,
            SessionOutcome::Failed { .. } => SessionState::Failed,
            SessionOutcome::Cancelled { .. } => SessionState::Cancelled,
        }
    }
}

/// Worker-to-caller notifications, delivered in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Progress { status: String, fraction: f32 },
    Result(ProcessingResult),
    Finished(SessionOutcome),
}

/// One run of the pipeline. Results are append-only; only [`Session::clear`] removes them.
#[derive(Debug, Clone)]
pub struct Session {
    videos: Vec<ProcessingResult>,
    cancel: CancellationToken,
    state: SessionState,
}

impl Session {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            videos: Vec::new(),
            cancel,
            state: SessionState::Idle,
        }
    }

    pub fn videos(&self) -> &[ProcessingResult] {
        &self.videos
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn push(&mut self, result: ProcessingResult) {
        self.videos.push(result);
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// Drop every result and return to idle
    pub fn clear(&mut self) {
        self.videos.clear();
        self.state = SessionState::Idle;
    }
}
