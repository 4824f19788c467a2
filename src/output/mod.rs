use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::pipeline::ProcessingResult;

pub mod formatters;

pub use formatters::*;

/// Render results in the requested format
pub fn render(videos: &[ProcessingResult], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(videos)),
        OutputFormat::Json => format_as_json(videos),
    }
}

/// Save session results to file
pub async fn save_to_file(videos: &[ProcessingResult], path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(videos, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, content).context("Failed to write results")?;

    tracing::info!("Wrote {} results to {}", videos.len(), path.display());
    Ok(())
}

/// Print session results to console
pub fn print_to_console(videos: &[ProcessingResult], format: &OutputFormat) -> Result<()> {
    let content = render(videos, format)?;
    println!("{}", content);
    Ok(())
}
