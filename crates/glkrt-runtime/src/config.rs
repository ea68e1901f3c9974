#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! Everything tunable about a [`Glk`](crate::Glk) session lives in one
//! [`RuntimeConfig`] that can be loaded from TOML or JSON at startup.
//!
//! ```toml
//! # glkrt.toml
//! [output]
//! buffer_units = 4096
//!
//! [logging]
//! filter = "glkrt=debug"
//! json = true
//!
//! [files]
//! temp_prefix = "story"
//! ```
//!
//! # Defaults
//!
//! `RuntimeConfig::default()` reproduces the behavior of a runtime built
//! with no configuration at all.

use std::fmt;
use std::path::Path;

use glkrt_window::DEFAULT_BUFFER_UNITS;
use serde::{Deserialize, Serialize};

/// Smallest usable output buffer: room for one surrogate pair.
const MIN_BUFFER_UNITS: usize = 2;

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Window output buffering.
    pub output: OutputConfig,

    /// Diagnostic output.
    pub logging: LoggingConfig,

    /// File references.
    pub files: FilesConfig,
}

/// Window output buffering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Per-window buffer capacity in peer string units. A window flushes
    /// when fewer than two units remain.
    pub buffer_units: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            buffer_units: DEFAULT_BUFFER_UNITS,
        }
    }
}

/// Diagnostic output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `GLKRT_LOG` is unset.
    pub filter: String,

    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_owned(),
            json: false,
        }
    }
}

/// File references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// File name prefix for temporary filerefs.
    pub temp_prefix: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            temp_prefix: "glk".to_owned(),
        }
    }
}

impl RuntimeConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load a TOML file and reject it unless [`validate`](Self::validate)
    /// finds nothing wrong.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::from_toml_file(path)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.output.buffer_units < MIN_BUFFER_UNITS {
            errors.push(format!(
                "output.buffer_units must be >= {MIN_BUFFER_UNITS}, got {}",
                self.output.buffer_units
            ));
        }

        if let Err(err) = self.logging.filter.parse::<tracing_subscriber::EnvFilter>() {
            errors.push(format!("logging.filter is not a valid directive: {err}"));
        }

        let prefix = &self.files.temp_prefix;
        if prefix.contains(['/', '\\']) {
            errors.push(format!(
                "files.temp_prefix must not contain path separators, got {prefix:?}"
            ));
        }

        errors
    }

    /// Single-line JSON rendering, suitable for a startup log record.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned())
    }
}

/// Failure to load a [`RuntimeConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    Toml(toml::de::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.output.buffer_units, 2048);
        assert_eq!(config.logging.filter, "warn");
        assert!(!config.logging.json);
        assert_eq!(config.files.temp_prefix, "glk");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = RuntimeConfig::from_toml_str("[output]\nbuffer_units = 64\n").unwrap();
        assert_eq!(config.output.buffer_units, 64);
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.files, FilesConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(RuntimeConfig::from_toml_str("").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn json_round_trips() {
        let mut config = RuntimeConfig::default();
        config.logging.json = true;
        let parsed = RuntimeConfig::from_json_str(&config.to_json()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn validate_catches_tiny_buffer() {
        let mut config = RuntimeConfig::default();
        config.output.buffer_units = 1;
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("output.buffer_units")));
    }

    #[test]
    fn validate_catches_bad_filter() {
        let mut config = RuntimeConfig::default();
        config.logging.filter = "glkrt=verbose".to_owned();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("logging.filter")));
    }

    #[test]
    fn validate_catches_separator_in_prefix() {
        let mut config = RuntimeConfig::default();
        config.files.temp_prefix = "../x".to_owned();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("files.temp_prefix")));
    }

    #[test]
    fn malformed_toml_is_a_toml_error() {
        let err = RuntimeConfig::from_toml_str("[output\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().starts_with("TOML parse error"));
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glkrt.toml");
        std::fs::write(&path, "[output]\nbuffer_units = 0\n").unwrap();
        let err = RuntimeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(matches!(
            RuntimeConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
