use crate::{Error, Result};
use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use std::fmt::Write;

/// Converts between textual dates and calendar dates using a strftime format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCodec {
    format: String,
}

impl DateCodec {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    pub fn format_str(&self) -> &str {
        &self.format
    }

    /// Parse `value` into a calendar date
    pub fn parse(&self, value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value, &self.format).map_err(|e| Error::MalformedDate {
            value: value.to_string(),
            format: self.format.clone(),
            reason: e.to_string(),
        })
    }

    /// Render `date` as text.
    ///
    /// Fails when the format asks for fields a date does not have, such as `%H`.
    pub fn format(&self, date: NaiveDate) -> Result<String> {
        let mut out = String::new();
        write!(out, "{}", date.format(&self.format)).map_err(|_| Error::MalformedDate {
            value: date.to_string(),
            format: self.format.clone(),
            reason: "format needs fields a calendar date does not have".to_string(),
        })?;
        Ok(out)
    }
}

/// Check that a strftime format string contains no invalid specifiers
pub fn is_valid_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}
