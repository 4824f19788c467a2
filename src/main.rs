use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subtitle_digest::cli::{Cli, Commands, OutputFormat};
use subtitle_digest::config::Config;
use subtitle_digest::extractors::{
    classify, ContentResolver, ReferenceKind, ReqwestFetcher, VideoCatalog,
};
use subtitle_digest::llm::Provider;
use subtitle_digest::output;
use subtitle_digest::pipeline::{SessionEvent, SessionOutcome, SessionPipeline};
use subtitle_digest::utils::{format_duration, sanitize_filename, truncate_chars};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "subtitle_digest=debug"
    } else if cli.quiet {
        "subtitle_digest=warn"
    } else {
        "subtitle_digest=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Process {
            url,
            provider,
            api_key,
            output,
            format,
        } => {
            let config = Config::load().await?;
            process(&config, &url, provider, api_key, output, format, cli.quiet).await?;
        }
        Commands::Resolve { url } => {
            // Reject malformed references before touching config or network
            let (kind, id) = classify(&url)?;
            let config = Config::load().await?;
            resolve(&config, kind, &id).await?;
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Edit it to set your API key, languages and retry behaviour.");
            }
        }
        Commands::Providers => {
            println!("Supported providers:");
            for provider in Provider::ALL {
                println!(
                    "  • {:<10} {} ({})",
                    provider.key(),
                    provider.model(),
                    provider.endpoint()
                );
            }
        }
    }

    Ok(())
}

async fn process(
    config: &Config,
    url: &str,
    provider: Option<String>,
    api_key: Option<String>,
    output_path: Option<PathBuf>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let provider = match provider {
        Some(name) => name.parse::<Provider>()?,
        None => config.default_provider()?,
    };
    let api_key = api_key
        .or_else(|| config.provider.api_key.clone())
        .filter(|key| !key.trim().is_empty())
        .context("No API key: pass --api-key, set SUBDIGEST_API_KEY, or add provider.api_key to the config file")?;

    let output_path = output_path.map(|path| output_file(path, url, &format));

    let pipeline = SessionPipeline::from_config(config, &api_key, provider)?;
    let mut handle = pipeline.start(url)?;

    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current step before stopping");
            cancel.cancel();
        }
    });

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")?
            .progress_chars("=> "),
    );

    // Text results stream to the console unless they go to a file
    let stream_results = output_path.is_none() && format == OutputFormat::Text;
    let started = Instant::now();
    let mut streamed = 0;
    let mut outcome = None;

    while let Some(event) = handle.next_event().await {
        match event {
            SessionEvent::Progress { status, fraction } => {
                progress.set_position((fraction * 100.0).round() as u64);
                progress.set_message(truncate_chars(&status, 60));
            }
            SessionEvent::Result(result) => {
                streamed += 1;
                if stream_results {
                    let block = output::format_video_block(streamed, &result);
                    progress.suspend(|| print!("{}", block));
                } else {
                    progress.println(format!(
                        "{} {}",
                        style("✓").green(),
                        truncate_chars(&result.video.title, 70)
                    ));
                }
            }
            SessionEvent::Finished(finished) => outcome = Some(finished),
        }
    }
    progress.finish_and_clear();

    let session = handle.finish().await?;
    let elapsed = format_duration(started.elapsed().as_secs_f64());

    match &output_path {
        Some(path) => {
            output::save_to_file(session.videos(), path, &format).await?;
            println!("Results saved to: {}", path.display());
        }
        None if !stream_results => output::print_to_console(session.videos(), &format)?,
        None => {}
    }

    match outcome {
        Some(SessionOutcome::Completed { processed, total }) => {
            eprintln!(
                "{} {} of {} videos processed in {}",
                style("Done:").green().bold(),
                processed,
                total,
                elapsed
            );
            Ok(())
        }
        Some(SessionOutcome::Cancelled { processed }) => {
            eprintln!(
                "{} kept {} results after {}",
                style("Cancelled:").yellow().bold(),
                processed,
                elapsed
            );
            Ok(())
        }
        Some(SessionOutcome::Failed { message }) => {
            eprintln!(
                "{} {} results kept",
                style("Failed:").red().bold(),
                session.videos().len()
            );
            anyhow::bail!("{}", message)
        }
        None => anyhow::bail!("Session ended without reporting an outcome"),
    }
}

/// A directory given as `--output` gets a file named after the reference
fn output_file(path: PathBuf, url: &str, format: &OutputFormat) -> PathBuf {
    if !path.is_dir() {
        return path;
    }

    let stem = classify(url)
        .map(|(kind, id)| format!("{}_{}", kind, id))
        .unwrap_or_else(|_| "digest".to_string());
    let extension = match format {
        OutputFormat::Text => "txt",
        OutputFormat::Json => "json",
    };

    path.join(format!("{}.{}", sanitize_filename(&stem), extension))
}

async fn resolve(config: &Config, kind: ReferenceKind, id: &str) -> Result<()> {
    let fetcher = Arc::new(ReqwestFetcher::new()?);
    let resolver = ContentResolver::new(fetcher, &config.http, config.discovery.clone());

    tracing::info!("Resolving {} {}", kind, id);
    let videos = resolver.resolve(kind, id).await?;

    if videos.is_empty() {
        println!("No videos found");
        return Ok(());
    }

    println!("{} {} videos", style("Resolved").bold(), videos.len());
    for (index, video) in videos.iter().enumerate() {
        println!(
            "{:>4}. {} {}",
            index + 1,
            style(&video.video_id).cyan(),
            truncate_chars(&video.title, 70)
        );
        if let Some(date) = &video.publish_date {
            println!("      published {}", date);
        }
        if !video.description.is_empty() {
            println!("      {}", style(truncate_chars(&video.description, 100)).dim());
        }
    }

    Ok(())
}
