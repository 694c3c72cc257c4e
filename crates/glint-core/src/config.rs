//! Configuration management for glint.
//!
//! Loads configuration from ${GLINT_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `stream.endpoint`.
pub const ENDPOINT_ENV: &str = "GLINT_ENDPOINT";

/// Stream connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Endpoint answering POST requests with an event stream
    pub endpoint: Option<String>,
    /// Connect timeout in seconds (0 disables)
    pub connect_timeout_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            connect_timeout_secs: 10,
        }
    }
}

impl StreamConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }
}

/// Incremental rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Bytes searched back for a whitespace boundary before splitting mid-word
    pub word_window: usize,
    /// Wrap newly visible words of the open message for fade-in
    pub animate: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            word_window: 32,
            animate: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `GLINT_LOG` is unset
    pub level: String,
    /// Directory for a daily rolling log file; stderr when unset
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stream: StreamConfig,
    pub render: RenderConfig,
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the stream endpoint with precedence: flag > env > config.
    ///
    /// # Errors
    /// Returns an error if no endpoint is configured anywhere.
    pub fn resolve_endpoint(&self, flag: Option<&str>) -> Result<String> {
        let env = std::env::var(ENDPOINT_ENV).ok();
        [flag, env.as_deref(), self.stream.endpoint.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
            .with_context(|| {
                format!(
                    "No stream endpoint configured. Pass --endpoint, set {ENDPOINT_ENV}, or set endpoint in [stream]."
                )
            })
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for glint configuration.
    //!
    //! GLINT_HOME resolution order:
    //! 1. GLINT_HOME environment variable (if set)
    //! 2. ~/.config/glint (default)

    use std::path::PathBuf;

    use anyhow::{Context, Result};

    /// Returns the glint home directory.
    ///
    /// # Errors
    /// Returns an error if `GLINT_HOME` is unset and no home directory exists.
    pub fn glint_home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var("GLINT_HOME") {
            return Ok(PathBuf::from(home));
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("glint"))
            .context("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        Ok(glint_home()?.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[render]\nword_window = 8\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.render.word_window, 8);
        assert!(config.render.animate);
        assert_eq!(config.stream.connect_timeout_secs, 10);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::init(&path).unwrap();
        assert!(path.exists());
        assert!(Config::init(&path).is_err());
    }

    #[test]
    fn test_flag_wins_endpoint_resolution() {
        let config = Config {
            stream: StreamConfig {
                endpoint: Some("http://config".to_string()),
                ..StreamConfig::default()
            },
            ..Config::default()
        };
        assert_eq!(
            config.resolve_endpoint(Some("http://flag")).unwrap(),
            "http://flag"
        );
    }

    #[test]
    fn test_zero_timeout_disables() {
        let stream = StreamConfig {
            connect_timeout_secs: 0,
            ..StreamConfig::default()
        };
        assert_eq!(stream.connect_timeout(), None);
    }
}
