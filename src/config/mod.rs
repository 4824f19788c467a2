use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::llm::Provider;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language model provider settings
    pub provider: ProviderConfig,

    /// Page fetch settings
    pub http: HttpConfig,

    /// Translation and summarization settings
    pub processing: ProcessingConfig,

    /// Channel and playlist discovery behaviour
    pub discovery: DiscoveryConfig,

    /// Transcript retrieval settings
    pub transcript: TranscriptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider key used when none is given on the command line
    pub default: String,

    /// API key used when none is given on the command line or environment
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for channel and playlist pages
    pub page_timeout_secs: u64,

    /// Timeout for individual watch pages
    pub video_timeout_secs: u64,

    pub user_agent: String,

    pub accept_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Attempts per translate/summarize call
    pub max_retries: u32,

    /// Length of one backoff time unit in milliseconds
    pub time_unit_ms: u64,

    pub temperature: f32,

    pub source_language: String,

    pub target_language: String,

    /// Lines per combined request in batch translation
    pub batch_size: usize,

    /// Wrap batch translation requests in the retry policy as well
    pub retry_batches: bool,

    /// Length budget handed to the summarizer
    pub summary_max_length: usize,

    /// Summarize through chunked map-reduce instead of a single call
    pub chunked_summary: bool,

    /// Chunk size for chunked summaries
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Drop videos that appear in more than one playlist of a channel
    pub dedup_across_playlists: bool,

    /// Skip videos whose watch page cannot be fetched instead of aborting
    pub skip_failed_videos: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Caption languages in order of preference
    pub languages: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: Provider::DashScope.key().to_string(),
            api_key: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: 15,
            video_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            time_unit_ms: 1000,
            temperature: 0.3,
            source_language: "en".to_string(),
            target_language: "zh".to_string(),
            batch_size: 5,
            retry_batches: false,
            summary_max_length: 300,
            chunked_summary: false,
            chunk_size: 2000,
        }
    }
}

impl ProcessingConfig {
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            languages: ["en", "en-US", "zh-Hans", "zh-CN", "zh", "ja", "ko"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Parse configuration from YAML. Missing fields take their defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("subtitle-digest").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.processing.max_retries == 0 {
            anyhow::bail!("processing.max_retries must be at least 1");
        }
        if self.processing.batch_size == 0 {
            anyhow::bail!("processing.batch_size must be at least 1");
        }
        if self.processing.chunk_size == 0 {
            anyhow::bail!("processing.chunk_size must be at least 1");
        }

        self.default_provider()?;

        Ok(())
    }

    /// The configured default provider
    pub fn default_provider(&self) -> Result<Provider> {
        self.provider.default.parse()
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Provider: {}", self.provider.default);
        println!(
            "  API Key: {}",
            if self.provider.api_key.is_some() { "configured" } else { "not set" }
        );
        println!(
            "  Languages: {} -> {}",
            self.processing.source_language, self.processing.target_language
        );
        println!("  Max Retries: {}", self.processing.max_retries);
        println!("  Summary Length: {}", self.processing.summary_max_length);
        println!("  Chunked Summary: {}", self.processing.chunked_summary);
        println!("  Dedup Across Playlists: {}", self.discovery.dedup_across_playlists);
        println!("  Skip Failed Videos: {}", self.discovery.skip_failed_videos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider().unwrap(), Provider::DashScope);
        assert_eq!(config.http.page_timeout_secs, 15);
        assert_eq!(config.http.video_timeout_secs, 10);
        assert_eq!(config.processing.time_unit(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = Config::from_yaml(
            "provider:\n  default: qiniu\nprocessing:\n  max_retries: 5\ndiscovery:\n  skip_failed_videos: true\n",
        )
        .unwrap();

        assert_eq!(config.default_provider().unwrap(), Provider::Qiniu);
        assert_eq!(config.processing.max_retries, 5);
        assert_eq!(config.processing.batch_size, 5);
        assert!(config.discovery.skip_failed_videos);
        assert!(!config.discovery.dedup_across_playlists);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.processing.max_retries = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.provider.default = "openai".to_string();
        assert!(config.validate().is_err());
    }
}
