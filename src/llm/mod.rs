pub mod processor;
pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use processor::{
    Chapter, ChapterSummary, ContentProcessor, RemoteProcessor, RetryPolicy, Sleeper,
    TokioSleeper,
};

use crate::{DigestError, Result};

/// Hosted, OpenAI-compatible model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Alibaba Cloud Model Studio (DashScope)
    DashScope,
    /// Qiniu Cloud AI inference
    Qiniu,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::DashScope, Provider::Qiniu];

    /// Key used in configuration and on the command line
    pub fn key(&self) -> &'static str {
        match self {
            Provider::DashScope => "dashscope",
            Provider::Qiniu => "qiniu",
        }
    }

    /// Base URL of the chat-completions API
    pub fn endpoint(&self) -> &'static str {
        match self {
            Provider::DashScope => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Provider::Qiniu => "https://api.qnaigc.com/v1",
        }
    }

    /// Model served for this provider
    pub fn model(&self) -> &'static str {
        match self {
            Provider::DashScope => "qwen-plus",
            Provider::Qiniu => "qwen-turbo",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.key() == s.trim().to_lowercase())
            .ok_or_else(|| DigestError::UnknownProvider(s.to_string()).into())
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One remote chat-completion call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String>;
}

/// Create the chat client for a provider
pub fn create_client(provider: Provider, api_key: &str) -> Result<Arc<dyn ChatCompletion>> {
    Ok(Arc::new(providers::OpenAiCompatibleClient::new(
        provider.endpoint(),
        api_key,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_mapping() {
        let provider: Provider = "dashscope".parse().unwrap();
        assert_eq!(provider.model(), "qwen-plus");
        assert_eq!(provider.endpoint(), "https://dashscope.aliyuncs.com/compatible-mode/v1");

        let provider: Provider = "Qiniu".parse().unwrap();
        assert_eq!(provider.model(), "qwen-turbo");
        assert_eq!(provider.endpoint(), "https://api.qnaigc.com/v1");
    }

    #[test]
    fn test_unknown_provider_fails_loudly() {
        let err = "openai".parse::<Provider>().unwrap_err();
        assert_eq!(
            err.downcast_ref::<DigestError>(),
            Some(&DigestError::UnknownProvider("openai".to_string()))
        );
    }

    #[test]
    fn test_provider_yaml_key() {
        assert_eq!(serde_yaml::to_string(&Provider::DashScope).unwrap().trim(), "dashscope");
    }
}
