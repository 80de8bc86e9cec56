use crate::logging;
use anyhow::{Context, Result};
use logrank_core::config::{AnalyzerConfig, LoggingOptions};
use logrank_core::runner::{RunSummary, Runner};
use std::fs;
use std::path::Path;

/// Load the configuration, set up logging and produce one report
pub fn execute(config_path: &Path, verbose: bool) -> Result<RunSummary> {
    let config = match AnalyzerConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&LoggingOptions::default(), verbose)?;
            return Err(e).with_context(|| {
                format!("Failed to load configuration {}", config_path.display())
            });
        }
    };
    logging::init(&config.logging, verbose)?;
    tracing::debug!("Configuration loaded from {}", config_path.display());

    let timestamp_file = config.timestamp_file.clone();
    let mut runner = Runner::new(config);
    let summary = runner.run().context("Analyzer failed")?;

    tracing::info!(
        "Report {} written from {} ({} rows, {} of {} lines matched)",
        summary.report_path.display(),
        summary.log_file.path.display(),
        summary.rows,
        summary.matched_lines,
        summary.total_lines
    );

    if let Some(path) = timestamp_file {
        write_timestamp(&path, summary.finished_at)?;
    }

    Ok(summary)
}

/// Record the completion time (Unix seconds) for external monitoring
fn write_timestamp(path: &Path, unix_time: i64) -> Result<()> {
    fs::write(path, unix_time.to_string())
        .with_context(|| format!("Failed to write timestamp file {}", path.display()))?;
    tracing::info!("TS file: {}", path.display());
    Ok(())
}
