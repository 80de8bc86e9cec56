use anyhow::{Context, Result};
use logrank_core::config::{LogStyle, LoggingOptions};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Install the process-wide subscriber.
///
/// Events go to `options.file` when set (appending, no colours) and to stdout
/// otherwise. `verbose` forces DEBUG regardless of the configured level.
/// `options.style` picks the full or compact line layout.
pub fn init(options: &LoggingOptions, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { options.level };
    let filter = EnvFilter::new(directive(level));
    let timer = ChronoLocal::new(options.date_format.clone());

    let writer = match &options.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(timer)
        .with_ansi(options.file.is_none())
        .with_writer(writer);

    let installed = match options.style {
        LogStyle::Full => builder.try_init(),
        LogStyle::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))
}

fn directive(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("logrank={level},logrank_cli={level},logrank_core={level}")
}
