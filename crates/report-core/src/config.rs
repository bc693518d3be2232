//! Client configuration loaded from YAML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or validating [`ReportConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// A field holds a value outside its allowed range.
    #[error("invalid config field {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Reporting client settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// File backing the persisted runs-list preferences.
    pub prefs_path: PathBuf,
    /// Key of the preference blob inside the store.
    pub prefs_key: String,
    /// Path of the runs-list view; query strings are appended to it.
    pub runs_path: String,
    /// Tolerance when checking a backend summary against the recomputed one.
    pub verify_tolerance: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            prefs_path: PathBuf::from(".scm-report/prefs.json"),
            prefs_key: "runs_list.query".to_string(),
            runs_path: "/ui/runs".to_string(),
            verify_tolerance: 1e-6,
        }
    }
}

impl ReportConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: ReportConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.verify_tolerance.is_finite() || self.verify_tolerance < 0.0 {
            return Err(ConfigError::Invalid {
                field: "verify_tolerance",
                reason: "must be finite and >= 0",
            });
        }
        if self.prefs_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "prefs_key",
                reason: "must not be empty",
            });
        }
        if self.runs_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "runs_path",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ReportConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = ReportConfig::from_yaml_str("verify_tolerance: 0.001\n").unwrap();
        assert_eq!(cfg.verify_tolerance, 0.001);
        assert_eq!(cfg.runs_path, "/ui/runs");
    }

    #[test]
    fn negative_tolerance_rejected() {
        let err = ReportConfig::from_yaml_str("verify_tolerance: -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "verify_tolerance",
                ..
            }
        ));
    }
}
