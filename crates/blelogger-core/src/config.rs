//! Device configuration
//!
//! The firmware bakes these in as constants; on the host they can also be
//! read from a JSON file.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datalog::DEFAULT_ROTATION_THRESHOLD;

/// Default time between sensor samples
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid JSON for this type
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A field is out of range
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

/// Logger timing and rotation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Minimum time between two logged records
    pub sample_interval_ms: u64,
    /// Records per log file before rotation
    pub rotation_threshold: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            rotation_threshold: DEFAULT_ROTATION_THRESHOLD,
        }
    }
}

impl DeviceConfig {
    /// Reject settings the device cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rotation_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rotation_threshold".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Parse a JSON configuration file
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: DeviceConfig = serde_json::from_str(r#"{"sample_interval_ms": 250}"#).unwrap();
        assert_eq!(config.sample_interval_ms, 250);
        assert_eq!(config.rotation_threshold, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = DeviceConfig {
            rotation_threshold: 0,
            ..DeviceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_json_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        fs::write(&path, r#"{"rotation_threshold": 4}"#).unwrap();
        let config: DeviceConfig = load_json(&path).unwrap();
        assert_eq!(config.rotation_threshold, 4);
        assert!(load_json::<DeviceConfig, _>(dir.path().join("missing.json")).is_err());
    }
}
