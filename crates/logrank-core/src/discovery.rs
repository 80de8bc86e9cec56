use crate::date::DateCodec;
use crate::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The log file selected for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileHandle {
    pub path: PathBuf,
    pub date: NaiveDate,
}

/// Finds the newest access log in a directory tree by the date in its name.
#[derive(Debug, Clone)]
pub struct LogDiscovery {
    name_re: Regex,
    date_re: Regex,
    codec: DateCodec,
    floor: NaiveDate,
}

impl LogDiscovery {
    /// Build a discovery from raw patterns.
    ///
    /// `name_pattern` must match a whole filename; `date_pattern` locates the
    /// date substring inside it, which is then parsed with `codec`.
    pub fn new(
        name_pattern: &str,
        date_pattern: &str,
        codec: DateCodec,
        floor: NaiveDate,
    ) -> Result<Self> {
        Ok(Self::from_parts(
            name_regex(name_pattern)?,
            date_regex(date_pattern)?,
            codec,
            floor,
        ))
    }

    /// Build a discovery from already compiled patterns.
    ///
    /// `name_re` should come from [`name_regex`] so it only matches whole names.
    pub fn from_parts(
        name_re: Regex,
        date_re: Regex,
        codec: DateCodec,
        floor: NaiveDate,
    ) -> Self {
        Self {
            name_re,
            date_re,
            codec,
            floor,
        }
    }

    /// Check whether a filename follows the log naming convention
    pub fn is_candidate(&self, file_name: &str) -> bool {
        self.name_re.is_match(file_name)
    }

    /// Extract and parse the date embedded in a candidate filename
    pub fn file_date(&self, file_name: &str) -> Result<NaiveDate> {
        let found = self
            .date_re
            .find(file_name)
            .ok_or_else(|| Error::MalformedDate {
                value: file_name.to_string(),
                format: self.codec.format_str().to_string(),
                reason: "no date substring in file name".to_string(),
            })?;
        self.codec.parse(found.as_str())
    }

    /// Walk `dir` and return the newest log not older than the floor date.
    ///
    /// Entries are visited in file-name order within each directory. A later
    /// candidate with an equal date replaces an earlier one.
    pub fn find_latest(&self, dir: &Path) -> Result<LogFileHandle> {
        tracing::debug!("Searching for web server logs in: {}", dir.display());

        let mut candidates = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| match e.into_io_error() {
                Some(io) => Error::Io(io),
                None => Error::Io(std::io::Error::other("directory walk failed")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if self.is_candidate(&name) {
                candidates.push((name.into_owned(), entry.path().to_path_buf()));
            }
        }

        match self.select(candidates) {
            Some(found) => found,
            None => Err(Error::NotFound {
                dir: dir.to_path_buf(),
                floor: self.codec.format(self.floor)?,
            }),
        }
    }

    /// Pick the newest of the given `(file name, path)` candidates.
    ///
    /// Returns `None` when nothing is dated on or after the floor.
    pub fn select<I>(&self, candidates: I) -> Option<Result<LogFileHandle>>
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        let mut max_date = self.floor;
        let mut latest: Option<PathBuf> = None;

        for (name, path) in candidates {
            let date = match self.file_date(&name) {
                Ok(date) => date,
                Err(e) => return Some(Err(e)),
            };
            tracing::debug!("Candidate log {} dated {}", path.display(), date);

            if date >= max_date {
                max_date = date;
                latest = Some(path);
            }
        }

        latest.map(|path| {
            tracing::info!("Latest log: {} ({})", path.display(), max_date);
            Ok(LogFileHandle {
                path,
                date: max_date,
            })
        })
    }
}

/// Compile a log name pattern so that it has to match the whole file name
pub fn name_regex(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
        Error::InvalidPattern(format!("Invalid log name pattern '{}': {}", pattern, e))
    })
}

/// Compile the pattern that finds the date inside a log name
pub fn date_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::InvalidPattern(format!("Invalid date pattern '{}': {}", pattern, e)))
}
