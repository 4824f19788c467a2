use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "subdigest",
    about = "Subtitle Digest - translate and summarize YouTube transcripts with hosted language models",
    version,
    long_about = "Resolves a YouTube channel, playlist or video into its videos, fetches each transcript, and produces a translation plus a summary per video using DashScope or Qiniu hosted models."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate and summarize every video behind a URL
    Process {
        /// Channel (youtube.com/@handle), playlist (playlist?list=) or video (watch?v=) URL
        #[arg(value_name = "URL")]
        url: String,

        /// Model provider (dashscope, qiniu); defaults to the configured one
        #[arg(short, long, value_name = "PROVIDER")]
        provider: Option<String>,

        /// API key for the provider
        #[arg(long, env = "SUBDIGEST_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the videos a URL resolves to without processing them
    Resolve {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported model providers
    Providers,
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with video metadata
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_arguments() {
        let cli = Cli::try_parse_from([
            "subdigest",
            "process",
            "https://www.youtube.com/@handle",
            "--provider",
            "qiniu",
            "--api-key",
            "sk-test",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Process {
                url,
                provider,
                api_key,
                output,
                format,
            } => {
                assert_eq!(url, "https://www.youtube.com/@handle");
                assert_eq!(provider.as_deref(), Some("qiniu"));
                assert_eq!(api_key.as_deref(), Some("sk-test"));
                assert!(output.is_none());
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["subdigest", "providers", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["subdigest", "process", "u", "--format", "srt"]).is_err());
    }
}
