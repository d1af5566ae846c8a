//! Engine Configuration
//!
//! Evaluator policy and async runtime sizing. Every field has a default, so
//! an empty JSON object is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::observability::Event;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "CONFIG_IO",
            ConfigError::Parse(_) => "CONFIG_PARSE",
            ConfigError::Invalid { .. } => "CONFIG_INVALID",
        }
    }
}

/// Filter evaluation policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// String operators compare case-sensitively (default: true)
    #[serde(default = "default_true")]
    pub case_sensitive: bool,

    /// Whitespace-only strings count as blank (default: true)
    #[serde(default = "default_true")]
    pub blank_trims_whitespace: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            case_sensitive: default_true(),
            blank_trims_whitespace: default_true(),
        }
    }
}

impl EvaluatorConfig {
    pub fn case_insensitive() -> Self {
        Self {
            case_sensitive: false,
            ..Default::default()
        }
    }
}

/// Sizing of the tokio runtime used for async dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Async worker threads (default: one per core)
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Cap on the blocking pool dispatches run on (default: 64)
    #[serde(default = "default_max_blocking_threads")]
    pub max_blocking_threads: usize,

    /// Thread name prefix (default: "backplane-worker")
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_max_blocking_threads() -> usize {
    64
}

fn default_thread_name() -> String {
    "backplane-worker".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            max_blocking_threads: default_max_blocking_threads(),
            thread_name: default_thread_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        debug!(
            target: "backplane::config",
            event = Event::ConfigLoaded.as_str(),
            path = %path.display(),
            "engine config loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.worker_threads == Some(0) {
            return Err(ConfigError::Invalid {
                field: "runtime.worker_threads",
                reason: "must be at least 1".into(),
            });
        }
        if self.runtime.max_blocking_threads == 0 {
            return Err(ConfigError::Invalid {
                field: "runtime.max_blocking_threads",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.evaluator.case_sensitive);
        assert!(config.evaluator.blank_trims_whitespace);
        assert_eq!(config.runtime.max_blocking_threads, 64);
        assert_eq!(config.runtime.thread_name, "backplane-worker");
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config =
            EngineConfig::from_json_str(r#"{"evaluator": {"case_sensitive": false}}"#).unwrap();
        assert!(!config.evaluator.case_sensitive);
        assert!(config.evaluator.blank_trims_whitespace);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = EngineConfig::from_json_str(r#"{"runtime": {"max_blocking_threads": 0}}"#)
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
    }

    #[test]
    fn test_malformed_json() {
        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code(), "CONFIG_PARSE");
    }
}
