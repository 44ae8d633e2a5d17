//! Configuration loading and typed config structures for fibertrace.
//!
//! The configuration lives in `fibertrace-config.yaml` (or the path named by
//! `FIBERTRACE_CONFIG`). Every field has a default, so an empty file, or no
//! file at all, yields a runnable configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::binning::DEFAULT_BIN_WIDTH_NS;

/// Environment variable overriding `report.output_dir`.
pub const OUTPUT_DIR_ENV: &str = "FIBERTRACE_OUTPUT_DIR";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    /// Report output settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Histogram sink settings.
    #[serde(default)]
    pub histograms: HistogramConfig,

    /// Settings of the stand-in engine.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AnalysisConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `FIBERTRACE_OUTPUT_DIR` overrides `report.output_dir` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.report.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.report.bin_width_ns;
        if !width.is_finite() || width <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!("report.bin_width_ns must be finite and positive, got {width}"),
            });
        }
        if self.engine.workers == 0 {
            return Err(ConfigError::Invalid {
                reason: "engine.workers must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Report output configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportConfig {
    /// Directory the per-run CSV reports are written into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Width of a report time bin in nanoseconds.
    #[serde(default = "default_bin_width_ns")]
    pub bin_width_ns: f64,

    /// Whether the CSV report is written at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ReportConfig {
    /// Override the output directory from `FIBERTRACE_OUTPUT_DIR` when set.
    pub fn apply_env_overrides(&mut self) {
        self.override_output_dir(std::env::var(OUTPUT_DIR_ENV).ok());
    }

    /// Replace the output directory when `value` is present and non-empty.
    pub fn override_output_dir(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|d| !d.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            bin_width_ns: default_bin_width_ns(),
            enabled: true,
        }
    }
}

/// Histogram sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistogramConfig {
    /// Whether per-step histograms are filled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Settings of the stand-in simulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Number of participant worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Number of runs to process.
    #[serde(default = "default_runs")]
    pub runs: u32,

    /// Synthetic events generated per run.
    #[serde(default = "default_events_per_run")]
    pub events_per_run: u64,

    /// Seed of the synthetic event generator.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// JSON-lines file of step events to replay instead of generating.
    #[serde(default)]
    pub replay: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            runs: default_runs(),
            events_per_run: default_events_per_run(),
            seed: default_seed(),
            replay: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

const fn default_bin_width_ns() -> f64 {
    DEFAULT_BIN_WIDTH_NS
}

const fn default_true() -> bool {
    true
}

const fn default_workers() -> usize {
    4
}

const fn default_runs() -> u32 {
    1
}

const fn default_events_per_run() -> u64 {
    1000
}

const fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.report.output_dir, PathBuf::from("."));
        assert!((config.report.bin_width_ns - 100.0).abs() < f64::EPSILON);
        assert!(config.report.enabled);
        assert!(config.histograms.enabled);
        assert_eq!(config.engine.workers, 4);
        assert_eq!(config.engine.runs, 1);
        assert_eq!(config.engine.events_per_run, 1000);
        assert!(config.engine.replay.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
report:
  output_dir: "/tmp/fibertrace"
  bin_width_ns: 25.0
  enabled: false

histograms:
  enabled: false

engine:
  workers: 8
  runs: 3
  events_per_run: 250
  seed: 7
  replay: "steps.jsonl"

logging:
  level: "debug"
"#;
        let config = AnalysisConfig::parse(yaml).unwrap();
        assert!((config.report.bin_width_ns - 25.0).abs() < f64::EPSILON);
        assert!(!config.report.enabled);
        assert!(!config.histograms.enabled);
        assert_eq!(config.engine.workers, 8);
        assert_eq!(config.engine.runs, 3);
        assert_eq!(config.engine.events_per_run, 250);
        assert_eq!(config.engine.seed, 7);
        assert_eq!(config.engine.replay, Some(PathBuf::from("steps.jsonl")));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_partial_yaml_uses_defaults() {
        let config = AnalysisConfig::parse("engine:\n  workers: 2\n").unwrap();
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.runs, 1);
        assert!(config.report.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_empty_mapping_uses_defaults() {
        let config = AnalysisConfig::parse("{}").unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.histograms, HistogramConfig::default());
    }

    #[test]
    fn zero_bin_width_is_rejected() {
        let err = AnalysisConfig::parse("report:\n  bin_width_ns: 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let err = AnalysisConfig::parse("report:\n  bin_width_ns: -5.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = AnalysisConfig::parse("engine:\n  workers: 0\n").unwrap_err();
        assert!(err.to_string().contains("engine.workers"));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = AnalysisConfig::parse("report: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AnalysisConfig::from_file(Path::new("/nonexistent/fibertrace.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn output_dir_override() {
        let mut report = ReportConfig::default();
        report.override_output_dir(None);
        assert_eq!(report.output_dir, PathBuf::from("."));
        report.override_output_dir(Some(String::new()));
        assert_eq!(report.output_dir, PathBuf::from("."));
        report.override_output_dir(Some("/data/out".to_owned()));
        assert_eq!(report.output_dir, PathBuf::from("/data/out"));
    }
}
