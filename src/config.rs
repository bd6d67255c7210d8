//! Configuration file handling.

#[cfg(feature = "background")]
use crate::background::BackgroundTaskOptions;
#[cfg(feature = "call-ui")]
use crate::call_ui::CallUiConfig;
use crate::detection::DetectionOptions;
use crate::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionOptions,
    #[cfg(feature = "background")]
    pub background: BackgroundTaskOptions,
    #[cfg(feature = "call-ui")]
    pub call_ui: CallUiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    /// Log to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or from the user config directory when `path` is `None`
    ///
    /// A missing file in the user config directory yields the defaults; an
    /// explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// `config.toml` in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "callwatch").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.detection.prompt.message.trim().is_empty() {
            return Err(Error::Configuration {
                reason: "detection.prompt.message must not be empty".to_string(),
            });
        }

        #[cfg(feature = "background")]
        {
            if self.background.task_name.trim().is_empty() {
                return Err(Error::Configuration {
                    reason: "background.task_name must not be empty".to_string(),
                });
            }
            if self.background.delay_ms == 0 {
                return Err(Error::Configuration {
                    reason: "background.delay_ms must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.detection.capture_number = false;
        config.logging.verbose = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[detection]
capture_number = false

[detection.prompt]
title = "Phone access"
message = "Needed to identify callers."
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.detection.capture_number);
        assert_eq!(config.detection.prompt.title, "Phone access");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(Some(&temp_dir.path().join("absent.toml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[detection\ncapture_number = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::TomlParse(_))));
    }

    #[test]
    fn test_empty_prompt_is_rejected() {
        let mut config = Config::default();
        config.detection.prompt.message = "  ".to_string();

        assert!(matches!(config.validate(), Err(Error::Configuration { .. })));
    }

    #[cfg(feature = "background")]
    #[test]
    fn test_zero_delay_is_rejected() {
        let mut config = Config::default();
        config.background.delay_ms = 0;

        assert!(matches!(config.validate(), Err(Error::Configuration { .. })));
    }
}
