use anyhow::{Context, Result};
use logrank_core::config::FileConfig;
use std::path::Path;

/// Write a configuration file with every option at its default value
pub fn execute(output: &Path) -> Result<()> {
    FileConfig::write_template(output)
        .with_context(|| format!("Failed to create configuration template {}", output.display()))?;

    tracing::info!("Configuration file template created: {}", output.display());
    Ok(())
}
