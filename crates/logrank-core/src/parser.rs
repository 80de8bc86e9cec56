use crate::{Error, Result};
use regex::Regex;

/// Default structure of an nginx `ui` access log line.
///
/// Group 1 is the request target, group 2 the trailing `$request_time`.
pub const DEFAULT_LINE_PATTERN: &str = r#"^\S+\s\S+\s{2}\S+\s\[.*?\]\s"\S+\s(\S+)\s\S+"\s\S+\s\S+\s.+?\s".+?"\s\S+\s\S+\s\S+\s(\S+)"#;

/// Value nginx writes when no request time was recorded
const NO_VALUE: &str = "-";

/// One matched log line
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub url: String,
    pub duration: f64,
}

/// Extracts the request URL and request time from access log lines.
#[derive(Debug, Clone)]
pub struct LineParser {
    re: Regex,
}

impl LineParser {
    pub fn new(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|e| {
            Error::InvalidPattern(format!("Invalid log line pattern '{}': {}", pattern, e))
        })?;
        // captures_len counts the implicit whole-match group
        if re.captures_len() < 3 {
            return Err(Error::InvalidPattern(format!(
                "Log line pattern '{}' must capture the URL and the request time",
                pattern
            )));
        }
        Ok(Self { re })
    }

    /// Parse one line. `None` means the line could not be interpreted.
    pub fn parse(&self, line: &str) -> Option<ParsedRecord> {
        let caps = self.re.captures(line)?;
        // The pattern is anchored by convention; a match further in is still a mismatch
        if caps.get(0)?.start() != 0 {
            return None;
        }
        let url = caps.get(1)?.as_str();
        let duration = parse_duration(caps.get(2)?.as_str())?;

        Some(ParsedRecord {
            url: url.to_string(),
            duration,
        })
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self {
            re: Regex::new(DEFAULT_LINE_PATTERN).expect("default line pattern is valid"),
        }
    }
}

fn parse_duration(token: &str) -> Option<f64> {
    if token == NO_VALUE {
        return Some(0.0);
    }
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}
