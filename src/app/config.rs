use crate::model::keyword::DEFAULT_LABELS;
use crate::pipeline::PipelineSettings;
use clap::{ArgMatches, Args, ValueEnum, parser::ValueSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable compact lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|label| (*label).to_string()).collect()
}

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Articles requested per feed
    #[arg(long, env = "FETCH_LIMIT", default_value = "25")]
    pub fetch_limit: usize,

    /// Workers in the filter pool
    #[arg(long, env = "FILTER_WORKERS", default_value = "5")]
    pub filter_workers: usize,

    /// Workers in the summarize pool
    #[arg(long, env = "SUMMARIZE_WORKERS", default_value = "2")]
    pub summarize_workers: usize,

    /// Minimum label score for an article to pass the filter
    #[arg(long, env = "CLASSIFY_THRESHOLD", default_value = "0.5")]
    pub threshold: f32,

    /// Word budget for each summary
    #[arg(long, env = "SUMMARY_MAX_WORDS", default_value = "150")]
    pub summary_max_words: usize,

    /// Candidate category labels (comma separated)
    #[arg(
        long,
        env = "CANDIDATE_LABELS",
        value_delimiter = ',',
        default_values_t = default_labels()
    )]
    pub labels: Vec<String>,

    /// Feed list file
    #[arg(long, env = "FEEDS_PATH", default_value = "feeds.json")]
    pub feeds_path: PathBuf,

    /// Article database directory
    #[arg(long, env = "STORE_PATH", default_value = "data/articles.db")]
    pub store_path: PathBuf,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "15")]
    pub http_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[serde(skip)]
    #[arg(long, env = "PULSE_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_limit: 25,
            filter_workers: 5,
            summarize_workers: 2,
            threshold: 0.5,
            summary_max_words: 150,
            labels: default_labels(),
            feeds_path: PathBuf::from("feeds.json"),
            store_path: PathBuf::from("data/articles.db"),
            http_timeout_secs: 15,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            config_file: None,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process();
        config.validate()?;
        Ok(config)
    }

    /// Resolve the final configuration from parsed command-line matches.
    ///
    /// Precedence: command line, then environment, then the config file,
    /// then built-in defaults.
    pub fn resolve(mut self, matches: &ArgMatches) -> Result<Self, ConfigError> {
        if let Some(path) = self.config_file.clone() {
            let file = Self::from_file(&path)?;
            self.merge_defaults_from(&file, |id| {
                matches!(matches.value_source(id), None | Some(ValueSource::DefaultValue))
            });
        }
        self.post_process();
        self.validate()?;
        Ok(self)
    }

    /// Take `other`'s value for every field `is_default` reports as unset.
    fn merge_defaults_from(&mut self, other: &Config, is_default: impl Fn(&str) -> bool) {
        if is_default("fetch_limit") {
            self.fetch_limit = other.fetch_limit;
        }
        if is_default("filter_workers") {
            self.filter_workers = other.filter_workers;
        }
        if is_default("summarize_workers") {
            self.summarize_workers = other.summarize_workers;
        }
        if is_default("threshold") {
            self.threshold = other.threshold;
        }
        if is_default("summary_max_words") {
            self.summary_max_words = other.summary_max_words;
        }
        if is_default("labels") {
            self.labels.clone_from(&other.labels);
        }
        if is_default("feeds_path") {
            self.feeds_path.clone_from(&other.feeds_path);
        }
        if is_default("store_path") {
            self.store_path.clone_from(&other.store_path);
        }
        if is_default("http_timeout_secs") {
            self.http_timeout_secs = other.http_timeout_secs;
        }
        if is_default("log_level") {
            self.log_level = other.log_level;
        }
        if is_default("log_format") {
            self.log_format = other.log_format;
        }
    }

    pub fn post_process(&mut self) {
        self.labels = self
            .labels
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.filter_workers == 0 {
            return Err(ConfigError::InvalidConfig(
                "Filter workers must be greater than 0".to_string(),
            ));
        }

        if self.summarize_workers == 0 {
            return Err(ConfigError::InvalidConfig(
                "Summarize workers must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidConfig(format!(
                "Classification threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }

        if self.summary_max_words == 0 {
            return Err(ConfigError::InvalidConfig(
                "Summary word budget must be greater than 0".to_string(),
            ));
        }

        if self.labels.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "At least one candidate label is required".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "HTTP timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            fetch_limit: self.fetch_limit,
            filter_workers: self.filter_workers,
            summarize_workers: self.summarize_workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.pipeline_settings(),
            PipelineSettings {
                fetch_limit: 25,
                filter_workers: 5,
                summarize_workers: 2,
            }
        );
        assert_eq!(config.labels.len(), DEFAULT_LABELS.len());
    }

    #[test]
    fn zero_workers_are_rejected() {
        let config = Config {
            summarize_workers: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let config = Config {
            threshold: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_labels_are_removed_then_rejected() {
        let mut config = Config {
            labels: vec![" ".to_string(), String::new()],
            ..Config::default()
        };
        config.post_process();
        assert!(config.labels.is_empty());
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            filter_workers = 3
            labels = ["AI", " Funding "]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.filter_workers, 3);
        assert_eq!(config.summarize_workers, 2);
        assert_eq!(config.labels, vec!["AI", "Funding"]);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "filter_workers = \"many\"").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn merge_only_touches_unset_fields() {
        let mut config = Config {
            filter_workers: 9,
            ..Config::default()
        };
        let file = Config {
            filter_workers: 3,
            summarize_workers: 4,
            ..Config::default()
        };

        config.merge_defaults_from(&file, |id| id != "filter_workers");
        assert_eq!(config.filter_workers, 9);
        assert_eq!(config.summarize_workers, 4);
    }
}
