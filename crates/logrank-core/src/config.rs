use crate::aggregate::MismatchPolicy;
use crate::date::{self, DateCodec};
use crate::discovery::{self, LogDiscovery};
use crate::parser::{DEFAULT_LINE_PATTERN, LineParser};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::Level;

/// Extension required for configuration files
pub const CONFIG_EXTENSION: &str = "json";

const KNOWN_KEYS: &[&str] = &[
    "REPORT_SIZE",
    "MAX_MISMATCH_PERCENT",
    "MAX_MISMATCH_COUNT",
    "DATE_FMT",
    "MIN_LOG_DATE",
    "LOG_DIR",
    "LOG_NAME_PATTERN",
    "LOG_NAME_DATE_PATTERN",
    "REPORT_DIR",
    "REPORT_DATE_FMT",
    "REPORT_TEMPLATE_PATH",
    "TEMPLATE_REPLACE_TAG",
    "WEB_SERVER_LOG_PATTERN",
    "LOG_LEVEL",
    "LOGFILE_FORMAT",
    "LOGFILE_DATE_FORMAT",
    "LOGFILE_PATH",
    "TS_F_PATH",
];

/// Configuration file contents, one field per recognised key.
///
/// Keys are upper snake case in the file; missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", deny_unknown_fields, default)]
pub struct FileConfig {
    /// Number of URLs with the largest total request time kept in the report
    pub report_size: i64,
    /// Percentage of unparsed lines tolerated (together with the count)
    pub max_mismatch_percent: i64,
    /// Number of unparsed lines tolerated (together with the percentage)
    pub max_mismatch_count: i64,
    /// Format of the date embedded in log file names
    pub date_fmt: String,
    /// Oldest log date considered, in `date_fmt`
    pub min_log_date: String,
    pub log_dir: PathBuf,
    pub log_name_pattern: String,
    pub log_name_date_pattern: String,
    pub report_dir: PathBuf,
    /// Format of the date in the report file name
    pub report_date_fmt: String,
    pub report_template_path: PathBuf,
    pub template_replace_tag: String,
    pub web_server_log_pattern: String,
    pub log_level: String,
    /// Log line layout: `full` or `compact`
    pub logfile_format: String,
    pub logfile_date_format: String,
    /// Log to this file instead of stdout when non-empty
    pub logfile_path: String,
    /// Write the completion timestamp here when non-empty
    pub ts_f_path: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            report_size: 100,
            max_mismatch_percent: 10,
            max_mismatch_count: 10,
            date_fmt: "%Y%m%d".to_string(),
            min_log_date: "19700101".to_string(),
            log_dir: PathBuf::from("log"),
            log_name_pattern: r"nginx-access-ui\.log-\d{8}(\.gz)?".to_string(),
            log_name_date_pattern: r"\d{8}".to_string(),
            report_dir: PathBuf::from("reports"),
            report_date_fmt: "%Y.%m.%d".to_string(),
            report_template_path: PathBuf::from("reports/report.html"),
            template_replace_tag: "$table_json".to_string(),
            web_server_log_pattern: DEFAULT_LINE_PATTERN.to_string(),
            log_level: "INFO".to_string(),
            logfile_format: "full".to_string(),
            logfile_date_format: "%Y.%m.%d %H:%M:%S".to_string(),
            logfile_path: String::new(),
            ts_f_path: String::new(),
        }
    }
}

impl FileConfig {
    /// Read and parse a JSON configuration file.
    ///
    /// Keys are matched case-insensitively. Unknown keys are collected and
    /// reported together with any type errors.
    pub fn from_path(path: &Path) -> Result<Self> {
        tracing::debug!("Reading configuration from: {}", path.display());

        let has_json_ext = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(CONFIG_EXTENSION));
        if !has_json_ext {
            return Err(Error::Config(vec![format!(
                "configuration file {} must have a .{} extension",
                path.display(),
                CONFIG_EXTENSION
            )]));
        }

        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let serde_json::Value::Object(raw) = value else {
            return Err(Error::Config(vec![
                "configuration must be a JSON object".to_string(),
            ]));
        };

        let mut problems = Vec::new();
        let mut known = serde_json::Map::new();
        for (key, value) in raw {
            let normalized = key.to_uppercase();
            if !KNOWN_KEYS.contains(&normalized.as_str()) {
                problems.push(format!("unknown key '{}'", key));
            } else if known.insert(normalized.clone(), value).is_some() {
                problems.push(format!("duplicate key '{}' (as {})", key, normalized));
            }
        }

        match serde_json::from_value::<FileConfig>(serde_json::Value::Object(known)) {
            Ok(config) if problems.is_empty() => Ok(config),
            Ok(_) => Err(Error::Config(problems)),
            Err(e) => {
                problems.push(e.to_string());
                Err(Error::Config(problems))
            }
        }
    }

    /// Validate every field and build the resolved configuration.
    ///
    /// All problems are gathered before failing so one run reports them all.
    pub fn resolve(&self) -> Result<AnalyzerConfig> {
        let mut problems = Vec::new();

        require_dir(&mut problems, "LOG_DIR", &self.log_dir);
        require_dir(&mut problems, "REPORT_DIR", &self.report_dir);
        if !self.report_template_path.is_file() {
            problems.push(format!(
                "REPORT_TEMPLATE_PATH: file {} not exists",
                self.report_template_path.display()
            ));
        }
        if self.template_replace_tag.is_empty() {
            problems.push("TEMPLATE_REPLACE_TAG: must not be empty".to_string());
        }

        for (key, format) in [
            ("DATE_FMT", &self.date_fmt),
            ("REPORT_DATE_FMT", &self.report_date_fmt),
            ("LOGFILE_DATE_FORMAT", &self.logfile_date_format),
        ] {
            if !date::is_valid_format(format) {
                problems.push(format!("{}: invalid date format '{}'", key, format));
            }
        }
        // Both are applied to plain dates, so time fields must fail here
        for (key, format) in [
            ("DATE_FMT", &self.date_fmt),
            ("REPORT_DATE_FMT", &self.report_date_fmt),
        ] {
            if !date::is_valid_format(format) {
                continue;
            }
            if let Err(e) = DateCodec::new(format).format(NaiveDate::default()) {
                problems.push(format!("{}: {}", key, e));
            }
        }

        let codec = DateCodec::new(&self.date_fmt);
        let min_log_date = codec
            .parse(&self.min_log_date)
            .map_err(|e| problems.push(format!("MIN_LOG_DATE: {}", e)))
            .ok();

        let name_re = discovery::name_regex(&self.log_name_pattern)
            .map_err(|e| problems.push(format!("LOG_NAME_PATTERN: {}", e)))
            .ok();
        let date_re = discovery::date_regex(&self.log_name_date_pattern)
            .map_err(|e| problems.push(format!("LOG_NAME_DATE_PATTERN: {}", e)))
            .ok();
        let parser = LineParser::new(&self.web_server_log_pattern)
            .map_err(|e| problems.push(format!("WEB_SERVER_LOG_PATTERN: {}", e)))
            .ok();

        let log_file = optional_path(&self.logfile_path);
        if let Some(file) = &log_file {
            require_parent(&mut problems, "LOGFILE_PATH", file);
        }
        let timestamp_file = optional_path(&self.ts_f_path);
        if let Some(file) = &timestamp_file {
            require_parent(&mut problems, "TS_F_PATH", file);
        }

        let (Some(name_re), Some(date_re), Some(parser), Some(min_log_date), true) =
            (name_re, date_re, parser, min_log_date, problems.is_empty())
        else {
            return Err(Error::Config(problems));
        };
        let discovery = LogDiscovery::from_parts(name_re, date_re, codec, min_log_date);

        let config = AnalyzerConfig {
            log_dir: self.log_dir.clone(),
            report_dir: self.report_dir.clone(),
            template_path: self.report_template_path.clone(),
            template_tag: self.template_replace_tag.clone(),
            report_size: self.report_size.max(1) as usize,
            mismatch: MismatchPolicy::new(self.max_mismatch_count, self.max_mismatch_percent),
            min_log_date,
            report_date: DateCodec::new(&self.report_date_fmt),
            discovery,
            parser,
            logging: LoggingOptions {
                level: parse_level(&self.log_level),
                style: parse_style(&self.logfile_format),
                date_format: self.logfile_date_format.clone(),
                file: log_file,
            },
            timestamp_file,
        };
        tracing::debug!("Configuration resolved: {:?}", config);
        Ok(config)
    }

    /// Write a configuration file holding every key at its default value
    pub fn write_template(path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&FileConfig::default())?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => Error::AlreadyExists(path.to_path_buf()),
                _ => Error::Io(e),
            })?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Validated settings for one analyzer run
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub log_dir: PathBuf,
    pub report_dir: PathBuf,
    pub template_path: PathBuf,
    pub template_tag: String,
    pub report_size: usize,
    pub mismatch: MismatchPolicy,
    pub min_log_date: NaiveDate,
    /// Date format used in report file names
    pub report_date: DateCodec,
    pub discovery: LogDiscovery,
    pub parser: LineParser,
    pub logging: LoggingOptions,
    pub timestamp_file: Option<PathBuf>,
}

impl AnalyzerConfig {
    /// Load, validate and resolve a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        FileConfig::from_path(path)?.resolve()
    }

    /// Report file for a log dated `date`, e.g. `report-2020.01.01.html`
    pub fn report_path(&self, date: NaiveDate) -> Result<PathBuf> {
        let stamp = self.report_date.format(date)?;
        Ok(self.report_dir.join(format!("report-{}.html", stamp)))
    }
}

/// Layout of emitted log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogStyle {
    #[default]
    Full,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    pub level: Level,
    pub style: LogStyle,
    /// strftime format for log timestamps
    pub date_format: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        let defaults = FileConfig::default();
        Self {
            level: parse_level(&defaults.log_level),
            style: parse_style(&defaults.logfile_format),
            date_format: defaults.logfile_date_format,
            file: None,
        }
    }
}

/// Map a level name to a tracing level. Unknown names fall back to ERROR.
pub fn parse_level(name: &str) -> Level {
    match name.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARNING" | "WARN" => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Map a `LOGFILE_FORMAT` value to a log style.
///
/// Anything other than `compact`, including printf-style layouts carried over
/// from older configuration files, gives the full layout.
pub fn parse_style(name: &str) -> LogStyle {
    if name.eq_ignore_ascii_case("compact") {
        LogStyle::Compact
    } else {
        LogStyle::Full
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn require_dir(problems: &mut Vec<String>, key: &str, dir: &Path) {
    if !dir.is_dir() {
        problems.push(format!("{}: directory {} not exists", key, dir.display()));
    }
}

fn require_parent(problems: &mut Vec<String>, key: &str, file: &Path) {
    let parent = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return,
    };
    if !parent.is_dir() {
        problems.push(format!(
            "{}: directory {} not exists",
            key,
            parent.display()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Temp dir with `log/`, `reports/` and a template
    fn workspace() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("log")).unwrap();
        fs::create_dir(tmp.path().join("reports")).unwrap();
        fs::write(tmp.path().join("reports/report.html"), "$table_json").unwrap();
        tmp
    }

    fn file_config(tmp: &TempDir) -> FileConfig {
        FileConfig {
            log_dir: tmp.path().join("log"),
            report_dir: tmp.path().join("reports"),
            report_template_path: tmp.path().join("reports/report.html"),
            ..FileConfig::default()
        }
    }

    fn problems(err: Error) -> Vec<String> {
        match err {
            Error::Config(problems) => problems,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_object_gives_defaults() {
        assert_eq!(FileConfig::from_json("{}").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let config =
            FileConfig::from_json(r#"{"report_size": 5, "Max_Mismatch_Count": 3}"#).unwrap();
        assert_eq!(config.report_size, 5);
        assert_eq!(config.max_mismatch_count, 3);
    }

    #[test]
    fn test_unknown_keys_are_all_reported() {
        let err = FileConfig::from_json(r#"{"REPORT_SIZE": 5, "COLOR": "red", "speed": 1}"#)
            .unwrap_err();
        let mut problems = problems(err);
        problems.sort();
        assert_eq!(problems, vec!["unknown key 'COLOR'", "unknown key 'speed'"]);
    }

    #[test]
    fn test_duplicate_keys_after_case_folding_are_reported() {
        let err = FileConfig::from_json(r#"{"report_size": 5, "REPORT_SIZE": 7}"#).unwrap_err();
        let problems = problems(err);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("duplicate key"), "{problems:?}");
    }

    #[test]
    fn test_logfile_format_key_is_accepted() {
        let config = FileConfig::from_json(
            r#"{"LOGFILE_FORMAT": "[%(asctime)s] %(levelname).1s %(message)s"}"#,
        )
        .unwrap();
        assert_eq!(parse_style(&config.logfile_format), LogStyle::Full);
        assert_eq!(parse_style("Compact"), LogStyle::Compact);
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let err = FileConfig::from_json(r#"{"REPORT_SIZE": "many"}"#).unwrap_err();
        assert_eq!(problems(err).len(), 1);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(matches!(
            FileConfig::from_json("[1, 2]"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_requires_json_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "{}").unwrap();
        assert!(matches!(
            FileConfig::from_path(&path),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_resolve_defaults() {
        let tmp = workspace();
        let config = file_config(&tmp).resolve().unwrap();

        assert_eq!(config.report_size, 100);
        assert_eq!(config.mismatch, MismatchPolicy::new(10, 10));
        assert_eq!(config.min_log_date, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(config.template_tag, "$table_json");
        assert_eq!(config.logging.level, Level::INFO);
        assert_eq!(config.logging.file, None);
        assert_eq!(config.timestamp_file, None);
    }

    #[test]
    fn test_resolve_clamps_numbers() {
        let tmp = workspace();
        let config = FileConfig {
            report_size: 0,
            max_mismatch_count: -3,
            max_mismatch_percent: 400,
            ..file_config(&tmp)
        }
        .resolve()
        .unwrap();

        assert_eq!(config.report_size, 1);
        assert_eq!(config.mismatch.max_count, 1);
        assert_eq!(config.mismatch.max_percent, 100);
    }

    #[test]
    fn test_resolve_collects_every_problem() {
        let tmp = TempDir::new().unwrap();
        let err = FileConfig {
            log_dir: tmp.path().join("missing-log"),
            report_dir: tmp.path().join("missing-reports"),
            report_template_path: tmp.path().join("missing.html"),
            min_log_date: "bad".to_string(),
            log_name_pattern: "(".to_string(),
            log_name_date_pattern: "[".to_string(),
            report_date_fmt: "%Y.%m.%d-%H".to_string(),
            web_server_log_pattern: "(".to_string(),
            ts_f_path: tmp.path().join("nope/ts").to_string_lossy().into_owned(),
            ..FileConfig::default()
        }
        .resolve()
        .unwrap_err();

        let problems = problems(err);
        for key in [
            "LOG_DIR",
            "REPORT_DIR",
            "REPORT_TEMPLATE_PATH",
            "MIN_LOG_DATE",
            "LOG_NAME_PATTERN",
            "LOG_NAME_DATE_PATTERN",
            "REPORT_DATE_FMT",
            "WEB_SERVER_LOG_PATTERN",
            "TS_F_PATH",
        ] {
            assert!(
                problems.iter().any(|p| p.starts_with(key)),
                "missing problem for {key}: {problems:?}"
            );
        }
    }

    #[test]
    fn test_resolve_rejects_bad_min_date() {
        let tmp = workspace();
        let err = FileConfig {
            min_log_date: "2020-01-01".to_string(),
            ..file_config(&tmp)
        }
        .resolve()
        .unwrap_err();
        assert!(problems(err)[0].starts_with("MIN_LOG_DATE"));
    }

    #[test]
    fn test_report_path_uses_display_format() {
        let tmp = workspace();
        let config = file_config(&tmp).resolve().unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(
            config.report_path(date).unwrap(),
            tmp.path().join("reports").join("report-2020.01.01.html")
        );
    }

    #[test]
    fn test_resolve_rejects_time_fields_in_date_formats() {
        let tmp = workspace();
        let err = FileConfig {
            date_fmt: "%Y%m%d%H".to_string(),
            min_log_date: "1970010100".to_string(),
            report_date_fmt: "%Y.%m.%d-%H".to_string(),
            ..file_config(&tmp)
        }
        .resolve()
        .unwrap_err();

        let problems = problems(err);
        assert!(problems.iter().any(|p| p.starts_with("DATE_FMT")), "{problems:?}");
        assert!(
            problems.iter().any(|p| p.starts_with("REPORT_DATE_FMT")),
            "{problems:?}"
        );
    }

    #[test]
    fn test_level_names() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARNING"), Level::WARN);
        assert_eq!(parse_level("critical"), Level::ERROR);
        assert_eq!(parse_level("loud"), Level::ERROR);
    }

    #[test]
    fn test_template_round_trips_and_is_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");

        FileConfig::write_template(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"REPORT_SIZE\": 100"));
        assert_eq!(FileConfig::from_path(&path).unwrap(), FileConfig::default());

        assert!(matches!(
            FileConfig::write_template(&path),
            Err(Error::AlreadyExists(_))
        ));
    }
}
