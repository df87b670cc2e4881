//! Common configuration utilities
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::Error;
use crate::result::Result;

/// Base trait for all configuration types
pub trait Configuration: Serialize + for<'de> Deserialize<'de> {
    /// Validate the configuration
    fn validate(&self) -> Result<()>;

    /// Load and validate configuration from a YAML file
    fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&content)
    }

    /// Load and validate configuration from a YAML string
    fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a YAML file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::configuration(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

/// Runtime settings shared by Polity binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for rolling log files, console only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl Configuration for Environment {
    fn validate(&self) -> Result<()> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(Error::configuration(format!(
                    "Invalid log level: {}",
                    self.log_level
                )))
            }
        }

        Ok(())
    }
}

/// Helper function to create directories needed for configurations
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            Error::configuration(format!(
                "Failed to create directory '{}': {}",
                path.display(),
                e
            ))
        })?;
    }

    Ok(())
}
