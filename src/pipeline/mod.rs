use anyhow::Context;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

pub mod session;

pub use session::{
    CancellationToken, ProcessingResult, Session, SessionEvent, SessionOutcome, SessionState,
};

use crate::config::{Config, ProcessingConfig};
use crate::extractors::{classify, ContentResolver, HttpFetcher, ReqwestFetcher, VideoCatalog};
use crate::llm::{self, ContentProcessor, Provider, RemoteProcessor};
use crate::transcript::{self, TranscriptSource, YoutubeTranscriptSource};
use crate::utils::format_duration;
use crate::{DigestError, Result};

/// Share of the progress bar reserved for URL analysis and discovery
const DISCOVERY_FRACTION: f32 = 0.1;
/// Share of the progress bar covered by per-video processing
const PROCESSING_FRACTION: f32 = 0.8;

/// Summary settings applied to every video
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub summary_max_length: usize,
    pub chunked_summary: bool,
    pub chunk_size: usize,
}

impl From<&ProcessingConfig> for SessionOptions {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            summary_max_length: config.summary_max_length,
            chunked_summary: config.chunked_summary,
            chunk_size: config.chunk_size,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ProcessingConfig::default())
    }
}

/// Main digest pipeline: discovery, transcript, translation, summary, one video at a time
pub struct SessionPipeline {
    catalog: Arc<dyn VideoCatalog>,
    transcripts: Arc<dyn TranscriptSource>,
    processor: Arc<dyn ContentProcessor>,
    options: SessionOptions,
    state: Arc<Mutex<SessionState>>,
    cancel: Mutex<CancellationToken>,
}

/// Caller side of a running session
pub struct SessionHandle {
    events: UnboundedReceiver<SessionEvent>,
    cancel: CancellationToken,
    task: JoinHandle<Session>,
}

impl SessionHandle {
    /// Next event, or `None` once the worker has finished and every event was delivered
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the worker and take the finished session
    pub async fn finish(self) -> Result<Session> {
        self.task.await.context("Session worker panicked")
    }
}

impl SessionPipeline {
    pub fn new(
        catalog: Arc<dyn VideoCatalog>,
        transcripts: Arc<dyn TranscriptSource>,
        processor: Arc<dyn ContentProcessor>,
        options: SessionOptions,
    ) -> Self {
        Self {
            catalog,
            transcripts,
            processor,
            options,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Wire the production collaborators for one provider and API key
    pub fn from_config(config: &Config, api_key: &str, provider: Provider) -> Result<Self> {
        let fetcher: Arc<dyn HttpFetcher> = Arc::new(ReqwestFetcher::new()?);
        let catalog = ContentResolver::new(fetcher.clone(), &config.http, config.discovery.clone());
        let transcripts = YoutubeTranscriptSource::new(fetcher, &config.http, &config.transcript);

        let client = llm::create_client(provider, api_key)?;
        let processor = RemoteProcessor::new(client, provider.model(), &config.processing);

        tracing::info!("Using provider {} ({})", provider, provider.model());

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(transcripts),
            Arc::new(processor),
            SessionOptions::from(&config.processing),
        ))
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session for `reference` with a fresh cancellation token
    pub fn start(&self, reference: &str) -> Result<SessionHandle> {
        self.start_with_token(reference, CancellationToken::new())
    }

    /// Start a session observing `cancel`.
    ///
    /// Fails with [`DigestError::SessionActive`] while another session is running. The
    /// worker runs on its own task and never blocks the caller.
    pub fn start_with_token(&self, reference: &str, cancel: CancellationToken) -> Result<SessionHandle> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == SessionState::Running {
                return Err(DigestError::SessionActive.into());
            }
            *state = SessionState::Running;
        }
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = cancel.clone();

        let (sender, events) = mpsc::unbounded_channel();
        let worker = SessionWorker {
            catalog: self.catalog.clone(),
            transcripts: self.transcripts.clone(),
            processor: self.processor.clone(),
            options: self.options.clone(),
            state: self.state.clone(),
            events: sender,
            cancel: cancel.clone(),
            fraction: 0.0,
        };

        tracing::info!("Starting session for {}", reference);
        let task = tokio::spawn(worker.run(reference.to_string()));

        Ok(SessionHandle {
            events,
            cancel,
            task,
        })
    }

    /// Ask the running session to stop at its next checkpoint
    pub fn request_cancel(&self) {
        tracing::info!("Cancellation requested");
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}

/// Marks the shared state failed if the worker stops without recording an outcome
struct RunningGuard {
    state: Arc<Mutex<SessionState>>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == SessionState::Running {
            tracing::error!("Session worker stopped unexpectedly");
            *state = SessionState::Failed;
        }
    }
}

struct SessionWorker {
    catalog: Arc<dyn VideoCatalog>,
    transcripts: Arc<dyn TranscriptSource>,
    processor: Arc<dyn ContentProcessor>,
    options: SessionOptions,
    state: Arc<Mutex<SessionState>>,
    events: UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
    fraction: f32,
}

impl SessionWorker {
    async fn run(mut self, reference: String) -> Session {
        let _guard = RunningGuard {
            state: self.state.clone(),
        };
        let mut session = Session::new(self.cancel.clone());
        session.set_state(SessionState::Running);

        let outcome = match self.execute(&reference, &mut session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Session failed: {:#}", e);
                self.report(format!("Processing failed: {}", e), self.fraction);
                SessionOutcome::Failed {
                    message: e.to_string(),
                }
            }
        };

        if let SessionOutcome::Cancelled { processed } = &outcome {
            tracing::info!("Session cancelled after {} results", processed);
            self.report("Processing cancelled".to_string(), self.fraction);
        }

        session.set_state(outcome.state());
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = outcome.state();
        self.emit(SessionEvent::Finished(outcome));

        session
    }

    async fn execute(&mut self, reference: &str, session: &mut Session) -> Result<SessionOutcome> {
        let cancelled = |session: &Session| SessionOutcome::Cancelled {
            processed: session.videos().len(),
        };

        if self.cancel.is_cancelled() {
            return Ok(cancelled(session));
        }
        self.report("Analyzing URL...".to_string(), DISCOVERY_FRACTION);
        let (kind, id) = classify(reference)?;

        if self.cancel.is_cancelled() {
            return Ok(cancelled(session));
        }
        self.report(format!("Fetching {} information...", kind), DISCOVERY_FRACTION);
        let videos = self.catalog.resolve(kind, &id).await?;

        if self.cancel.is_cancelled() {
            return Ok(cancelled(session));
        }
        if videos.is_empty() {
            self.report("No videos found".to_string(), DISCOVERY_FRACTION);
            return Ok(SessionOutcome::Completed {
                processed: 0,
                total: 0,
            });
        }

        let total = videos.len();
        tracing::info!("Resolved {} videos", total);

        for (index, video) in videos.into_iter().enumerate() {
            let fraction = DISCOVERY_FRACTION + (index as f32 / total as f32) * PROCESSING_FRACTION;

            if self.cancel.is_cancelled() {
                return Ok(cancelled(session));
            }
            self.report(
                format!("Processing video {}/{}: {}", index + 1, total, video.title),
                fraction,
            );

            let lines = match self.transcripts.get_transcript(&video.video_id).await {
                Ok(Some(lines)) if !lines.is_empty() => lines,
                Ok(_) => {
                    tracing::info!("No transcript for {}, skipping", video.video_id);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Transcript unavailable for {}: {}, skipping", video.video_id, e);
                    continue;
                }
            };

            if self.cancel.is_cancelled() {
                return Ok(cancelled(session));
            }
            tracing::debug!(
                "Transcript for {} has {} lines covering {}",
                video.video_id,
                lines.len(),
                format_duration(transcript::total_duration(&lines))
            );

            let merged = transcript::merge_lines(&lines);
            let translated = self.processor.translate(&merged).await?;

            if self.cancel.is_cancelled() {
                return Ok(cancelled(session));
            }
            let summary = if self.options.chunked_summary {
                self.processor
                    .summarize_long_text(&translated, self.options.summary_max_length, self.options.chunk_size)
                    .await?
            } else {
                self.processor
                    .summarize(&translated, self.options.summary_max_length)
                    .await?
            };

            let result = ProcessingResult::new(video, translated, summary);
            session.push(result.clone());
            self.emit(SessionEvent::Result(result));
        }

        if self.cancel.is_cancelled() {
            return Ok(cancelled(session));
        }
        self.report(
            format!(
                "Processing complete: {} of {} videos processed",
                session.videos().len(),
                total
            ),
            1.0,
        );

        Ok(SessionOutcome::Completed {
            processed: session.videos().len(),
            total,
        })
    }

    fn report(&mut self, status: String, fraction: f32) {
        self.fraction = fraction;
        tracing::info!("{}", status);
        self.emit(SessionEvent::Progress { status, fraction });
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Session event dropped: receiver closed");
        }
    }
}
