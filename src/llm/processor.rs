//! Translation and summarization on top of a remote chat-completion service.
//!
//! Every call goes through one retry wrapper with exponential backoff. Batch translation is
//! the exception: by default each group is sent exactly once and a failure propagates as-is,
//! with a fixed pause between groups to stay under provider rate limits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatCompletion, ChatMessage};
use crate::config::ProcessingConfig;
use crate::utils::split_text;
use crate::{DigestError, Result};

/// Output token cap for context-aware translation
const CONTEXT_TRANSLATION_MAX_TOKENS: u32 = 1000;

/// How often and how patiently a remote call is retried
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,
    /// One backoff time unit
    pub time_unit: Duration,
}

impl RetryPolicy {
    /// Delay after the failed attempt with zero-based index `attempt_index`: `2^(index+1)` units.
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.time_unit * 2u32.saturating_pow(attempt_index + 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            time_unit: Duration::from_secs(1),
        }
    }
}

/// Blocking pause used for backoff and pacing
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// The translate/summarize operations the session pipeline depends on
#[async_trait]
pub trait ContentProcessor: Send + Sync {
    /// Translate a whole text in one request
    async fn translate(&self, text: &str) -> Result<String>;

    /// Summarize a text within `max_length` characters
    async fn summarize(&self, text: &str, max_length: usize) -> Result<String>;

    /// Two-level summary: each chunk first, then the joined chunk summaries
    async fn summarize_long_text(
        &self,
        text: &str,
        max_length: usize,
        chunk_size: usize,
    ) -> Result<String>;
}

/// A titled section of text to summarize on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub title: String,
    pub summary: String,
}

/// [`ContentProcessor`] that talks to a chat-completion model
pub struct RemoteProcessor {
    client: Arc<dyn ChatCompletion>,
    model: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    temperature: f32,
    source_language: String,
    target_language: String,
    retry_batches: bool,
}

impl RemoteProcessor {
    pub fn new(client: Arc<dyn ChatCompletion>, model: impl Into<String>, config: &ProcessingConfig) -> Self {
        Self {
            client,
            model: model.into(),
            policy: RetryPolicy {
                max_retries: config.max_retries,
                time_unit: config.time_unit(),
            },
            sleeper: Arc::new(TokioSleeper),
            temperature: config.temperature,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            retry_batches: config.retry_batches,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run `action` until it succeeds or `max_retries` attempts have failed.
    ///
    /// Attempts are all-or-nothing. After the last failure the error is wrapped in
    /// [`DigestError::RemoteProcessing`] carrying the last cause.
    pub async fn with_retry<T, F, Fut>(&self, label: &str, mut action: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let max_retries = self.policy.max_retries.max(1);
        let mut last_cause = String::new();

        for attempt in 0..max_retries {
            match action().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("{} failed (attempt {}/{}): {}", label, attempt + 1, max_retries, e);
                    last_cause = e.to_string();

                    if attempt + 1 < max_retries {
                        let delay = self.policy.backoff(attempt);
                        debug!("Backing off for {:?}", delay);
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        Err(DigestError::RemoteProcessing {
            attempts: max_retries,
            cause: last_cause,
        }
        .into())
    }

    /// One remote call under the retry policy
    pub async fn process(&self, messages: Vec<ChatMessage>, max_tokens: Option<u32>) -> Result<String> {
        self.with_retry("Chat completion", || {
            self.complete_once(messages.clone(), max_tokens)
        })
        .await
    }

    async fn complete_once(&self, messages: Vec<ChatMessage>, max_tokens: Option<u32>) -> Result<String> {
        let content = self
            .client
            .complete(&self.model, messages, self.temperature, max_tokens)
            .await?;
        Ok(content.trim().to_string())
    }

    fn translation_prompt(&self) -> String {
        format!(
            "You are a professional translation assistant. Translate the {} text into {}, keeping the meaning accurate and the language fluent and natural.",
            self.source_language, self.target_language
        )
    }

    fn summary_prompt(&self) -> String {
        format!(
            "You are a professional summarization assistant. Write a concise, accurate and fluent {} summary of the text that highlights the key points.",
            self.target_language
        )
    }

    /// Translate with surrounding context to disambiguate the text
    pub async fn translate_with_context(&self, text: &str, context: &str) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let messages = vec![
            ChatMessage::system(format!(
                "{} Use the context to make the translation more accurate.",
                self.translation_prompt()
            )),
            ChatMessage::user(format!("Context: {}\n\nText to translate: {}", context, text)),
        ];

        self.process(messages, Some(CONTEXT_TRANSLATION_MAX_TOKENS)).await
    }

    /// Translate `texts` in order-preserving groups of `batch_size`, one request per group.
    ///
    /// The model is asked for one translated line per input line and the reply is split on
    /// newlines. A one-unit pause follows every group.
    pub async fn translate_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<String>> {
        let mut translated = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size.max(1)) {
            let messages = vec![
                ChatMessage::system(format!(
                    "{} Translate each line separately and put every translation on its own line.",
                    self.translation_prompt()
                )),
                ChatMessage::user(batch.join("\n")),
            ];

            let response = if self.retry_batches {
                self.process(messages, None).await?
            } else {
                self.complete_once(messages, None).await?
            };

            let lines: Vec<String> = response.split('\n').map(str::to_string).collect();
            if lines.len() != batch.len() {
                warn!(
                    "Batch translation returned {} lines for {} inputs",
                    lines.len(),
                    batch.len()
                );
            }
            translated.extend(lines);

            self.sleeper.sleep(self.policy.time_unit).await;
        }

        Ok(translated)
    }

    /// Summarize each chapter on its own
    pub async fn summarize_chapters(&self, chapters: &[Chapter], max_length: usize) -> Result<Vec<ChapterSummary>> {
        let mut summaries = Vec::with_capacity(chapters.len());
        for chapter in chapters {
            summaries.push(ChapterSummary {
                title: chapter.title.clone(),
                summary: self.summarize(&chapter.content, max_length).await?,
            });
        }
        Ok(summaries)
    }
}

#[async_trait]
impl ContentProcessor for RemoteProcessor {
    async fn translate(&self, text: &str) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let messages = vec![
            ChatMessage::system(self.translation_prompt()),
            ChatMessage::user(text),
        ];
        self.process(messages, None).await
    }

    async fn summarize(&self, text: &str, max_length: usize) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let messages = vec![
            ChatMessage::system(self.summary_prompt()),
            ChatMessage::user(format!(
                "Summarize the following text in no more than {} characters:\n{}",
                max_length, text
            )),
        ];
        self.process(messages, None).await
    }

    async fn summarize_long_text(&self, text: &str, max_length: usize, chunk_size: usize) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let chunks = split_text(text, chunk_size);
        let chunk_budget = max_length / chunks.len().max(1);
        debug!("Summarizing {} chunks with budget {} each", chunks.len(), chunk_budget);

        let mut chunk_summaries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            chunk_summaries.push(self.summarize(chunk, chunk_budget).await?);
        }

        self.summarize(&chunk_summaries.join("\n"), max_length).await
    }
}
