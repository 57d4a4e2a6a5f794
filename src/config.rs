//! Reconstruction configuration
//!
//! Defaults match the common case of Java probes: constructor signatures are
//! normalised and call markers are matched heuristically when an exact callee
//! reference is missing.
//!
//! # Example TOML
//!
//! ```toml
//! enhance_java_constructors = true
//! enhance_call_detection = false
//! workers = 4
//! ignore_invalid_traces = true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for trace reconstruction
///
/// # Example
/// ```
/// use flowtrace::config::ReconstructionConfig;
///
/// let config = ReconstructionConfig::default();
/// assert!(config.enhance_java_constructors);
/// assert!(config.enhance_call_detection);
/// assert_eq!(config.workers, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconstructionConfig {
    /// Normalise constructor signatures before comparing them
    pub enhance_java_constructors: bool,

    /// Accept call markers whose callee only matches after signature parsing
    pub enhance_call_detection: bool,

    /// Number of traces reconstructed in parallel
    pub workers: usize,

    /// Do not treat failed traces as a fatal outcome of a run
    pub ignore_invalid_traces: bool,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            enhance_java_constructors: true,
            enhance_call_detection: true,
            workers: 1,
            ignore_invalid_traces: false,
        }
    }
}

impl ReconstructionConfig {
    /// Exact matching only: no heuristics
    pub fn strict() -> Self {
        Self {
            enhance_java_constructors: false,
            enhance_call_detection: false,
            ..Self::default()
        }
    }

    /// Load and validate configuration from a TOML file
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid(
                "workers must be >= 1, got 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_strict_disables_heuristics() {
        let config = ReconstructionConfig::strict();
        assert!(!config.enhance_java_constructors);
        assert!(!config.enhance_call_detection);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_invalid() {
        let config = ReconstructionConfig {
            workers: 0,
            ..ReconstructionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_toml_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "enhance_call_detection = false").unwrap();
        writeln!(file, "workers = 3").unwrap();

        let config = ReconstructionConfig::from_toml_file(file.path()).unwrap();
        assert!(config.enhance_java_constructors);
        assert!(!config.enhance_call_detection);
        assert_eq!(config.workers, 3);
    }

    #[test]
    fn test_from_toml_unknown_key() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "enhance_everything = true").unwrap();
        let result = ReconstructionConfig::from_toml_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_from_toml_missing_file() {
        let result = ReconstructionConfig::from_toml_file("/nonexistent/flowtrace.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_from_toml_rejects_zero_workers() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "workers = 0").unwrap();
        let result = ReconstructionConfig::from_toml_file(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
