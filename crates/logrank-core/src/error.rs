use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "Web server log file not found in {} (nothing dated on or after {floor})",
        .dir.display()
    )]
    NotFound { dir: PathBuf, floor: String },

    #[error("Cannot parse date '{value}' with format '{format}': {reason}")]
    MalformedDate {
        value: String,
        format: String,
        reason: String,
    },

    #[error(
        "Mismatch exceeded: {mismatched} of {total} lines unparsed ({percent:.1}%). Check log format type"
    )]
    MismatchExceeded {
        mismatched: u64,
        total: u64,
        percent: f64,
    },

    #[error("No match during parsing: {matched} lines matched, total request time {total_time}")]
    NoMatches { matched: u64, total_time: f64 },

    #[error("File {} already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Template {} does not contain tag '{tag}'", .path.display())]
    InvalidTemplate { path: PathBuf, tag: String },

    #[error("Invalid configuration:\n  {}", .0.join("\n  "))]
    Config(Vec<String>),
}

pub type Result<T> = std::result::Result<T, Error>;
