//! Configuration for termport.
//!
//! Settings are read from `~/.termport/config.toml`, or from the file named
//! with `--config`. Every field is optional:
//!
//! ```toml
//! # Directory for the per-process socket termport_<pid>.sock
//! socket_dir = "/tmp"
//!
//! # Longest wait for a terminal event per loop iteration
//! poll_timeout_ms = 10
//!
//! # Longest accepted command line, in bytes
//! receive_window = 4096
//!
//! # Terminal device to draw on
//! tty = "/dev/tty"
//!
//! # Log filter and destination (default ~/.termport/termport.log)
//! log_level = "info"
//! log_file = "/var/tmp/termport.log"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::framer::DEFAULT_WINDOW;
use crate::server::SessionConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub socket_dir: PathBuf,
    pub poll_timeout_ms: u64,
    pub receive_window: usize,
    pub tty: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_dir: PathBuf::from("/tmp"),
            poll_timeout_ms: 10,
            receive_window: DEFAULT_WINDOW,
            tty: PathBuf::from("/dev/tty"),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load the default config file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(config) = Self::load_from(&path) {
                    return config;
                }
            }
        }
        Self::default()
    }

    /// Load an explicitly named config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `~/.termport`
    pub fn config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".termport"))
    }

    fn get_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Log file path, configured or `~/.termport/termport.log`
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join("termport.log")))
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
            receive_window: self.receive_window,
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.socket_dir, PathBuf::from("/tmp"));
        assert_eq!(config.session().poll_timeout, Duration::from_millis(10));
        assert_eq!(config.session().receive_window, 4096);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_timeout_ms = 25\nsocket_dir = \"/run/termport\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.poll_timeout_ms, 25);
        assert_eq!(config.socket_dir, PathBuf::from("/run/termport"));
        assert_eq!(config.receive_window, DEFAULT_WINDOW);
        assert_eq!(config.tty, PathBuf::from("/dev/tty"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_timeout_ms = \"soon\"").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load_from(&dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_log_path_override() {
        let config = Config {
            log_file: Some(PathBuf::from("/var/tmp/t.log")),
            ..Config::default()
        };
        assert_eq!(config.log_path(), Some(PathBuf::from("/var/tmp/t.log")));
    }
}
