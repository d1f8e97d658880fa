//! Configuration loading and journal path resolution.
//!
//! The configuration file is JSON. User-tunable settings live under
//! `CONFIGURABLE`; the `files` table is a registry mapping logical names
//! (`"events"`, `"log"`) to paths. Relative registry paths resolve against the
//! directory holding the configuration file.
//!
//! ```json
//! {
//!   "CONFIGURABLE": {
//!     "poll_interval": 5,
//!     "debug": false,
//!     "max_event_file_size_in_Bytes": 1048576,
//!     "purge_policy": "keep_ledger",
//!     "rebuild": "startup"
//!   },
//!   "files": { "events": "events.jsonl", "log": "running.log" }
//! }
//! ```

use crate::{ProcessorOptions, PurgePolicy, RebuildMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Logical name of the journal file in the registry
pub const EVENTS_FILE: &str = "events";
/// Logical name of the log file in the registry
pub const LOG_FILE: &str = "log";

/// Supplies the journal location and size ceiling
pub trait PathResolver {
    /// Resolve a logical file name to a path
    fn resolve(&self, name: &str) -> Result<PathBuf, ConfigError>;

    /// Configured maximum journal size in bytes
    fn max_bytes(&self) -> Result<u64, ConfigError>;
}

/// Configuration loading or lookup failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// Config file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Config is not valid JSON or has the wrong shape
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    /// Required setting is absent
    #[error("missing config key: {0}")]
    MissingKey(&'static str),
    /// Logical file name not in the registry
    #[error("no file registered under {0:?}")]
    UnknownFile(Box<str>),
    /// Values parsed but are out of range
    #[error("config validation failed: {0}")]
    Validation(Box<str>),
}

/// User-tunable settings (`CONFIGURABLE` section)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// Minutes between polling cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Log at debug level
    #[serde(default)]
    pub debug: bool,
    /// Journal size ceiling; required to open a journal
    #[serde(rename = "max_event_file_size_in_Bytes", default)]
    pub max_event_file_size_bytes: Option<u64>,
    /// What a purge does to the ledger
    #[serde(default)]
    pub purge_policy: PurgePolicy,
    /// When the ledger is replayed
    #[serde(default)]
    pub rebuild: RebuildMode,
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            debug: false,
            max_event_file_size_bytes: None,
            purge_policy: PurgePolicy::default(),
            rebuild: RebuildMode::default(),
        }
    }
}

/// Logical-name to path registry
#[derive(Clone, Debug, Default)]
pub struct FileRegistry {
    base_dir: PathBuf,
    files: BTreeMap<String, PathBuf>,
}

impl FileRegistry {
    /// Empty registry anchored at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            files: BTreeMap::new(),
        }
    }

    /// Register a file under a logical name
    pub fn with_file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(name.into(), path.into());
        self
    }

    /// Directory relative entries resolve against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path registered under `name`, joined to the base directory if relative
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let path = self
            .files
            .get(name)
            .ok_or_else(|| ConfigError::UnknownFile(name.into()))?;
        if path.is_absolute() {
            Ok(path.clone())
        } else {
            Ok(self.base_dir.join(path))
        }
    }
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(rename = "CONFIGURABLE", default)]
    configurable: Settings,
    #[serde(default)]
    files: BTreeMap<String, PathBuf>,
}

/// Loaded configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// `CONFIGURABLE` section
    pub settings: Settings,
    /// `files` section
    pub registry: FileRegistry,
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Relative registry entries are anchored at the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let content = std::fs::read_to_string(path).map_err(io_err)?;
        let absolute = std::path::absolute(path).map_err(io_err)?;
        let base_dir = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_json(&content, base_dir)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content)?;
        let config = Self {
            settings: raw.configurable,
            registry: FileRegistry {
                base_dir: base_dir.into(),
                files: raw.files,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.poll_interval == 0 {
            return Err(ConfigError::Validation(
                "poll_interval must be at least one minute".into(),
            ));
        }
        if self.settings.max_event_file_size_bytes == Some(0) {
            return Err(ConfigError::Validation(
                "max_event_file_size_in_Bytes must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Time between polling cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.settings.poll_interval.saturating_mul(60))
    }

    /// Processor options taken from the settings
    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            purge_policy: self.settings.purge_policy,
            rebuild: self.settings.rebuild,
        }
    }

    /// Log file path, if one is registered
    pub fn log_file(&self) -> Option<PathBuf> {
        self.registry.resolve(LOG_FILE).ok()
    }
}

impl PathResolver for Config {
    fn resolve(&self, name: &str) -> Result<PathBuf, ConfigError> {
        self.registry.resolve(name)
    }

    fn max_bytes(&self) -> Result<u64, ConfigError> {
        self.settings
            .max_event_file_size_bytes
            .ok_or(ConfigError::MissingKey("max_event_file_size_in_Bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "CONFIGURABLE": {
            "poll_interval": 2,
            "debug": true,
            "max_event_file_size_in_Bytes": 4096,
            "purge_policy": "reset_ledger"
        },
        "files": {"events": "data/events.jsonl", "log": "/var/log/cases.log"}
    }"#;

    #[test]
    fn test_parse_settings() {
        let config = Config::from_json(SAMPLE, "/etc/cases").unwrap();

        assert_eq!(config.poll_interval(), Duration::from_secs(120));
        assert!(config.settings.debug);
        assert_eq!(config.max_bytes().unwrap(), 4096);
        assert_eq!(config.settings.purge_policy, PurgePolicy::ResetLedger);
        assert_eq!(config.settings.rebuild, RebuildMode::Startup);
    }

    #[test]
    fn test_relative_paths_resolve_against_base_dir() {
        let config = Config::from_json(SAMPLE, "/etc/cases").unwrap();

        assert_eq!(
            config.resolve(EVENTS_FILE).unwrap(),
            PathBuf::from("/etc/cases/data/events.jsonl")
        );
        assert_eq!(config.log_file(), Some(PathBuf::from("/var/log/cases.log")));
    }

    #[test]
    fn test_unknown_file_is_config_error() {
        let config = Config::from_json("{}", "/tmp").unwrap();
        assert!(matches!(
            config.resolve(EVENTS_FILE),
            Err(ConfigError::UnknownFile(_))
        ));
    }

    #[test]
    fn test_missing_ceiling_is_config_error() {
        let config = Config::from_json(r#"{"files": {"events": "e.jsonl"}}"#, "/tmp").unwrap();
        assert!(matches!(
            config.max_bytes(),
            Err(ConfigError::MissingKey("max_event_file_size_in_Bytes"))
        ));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = Config::from_json(r#"{"CONFIGURABLE": {"poll_interval": 0}}"#, "/tmp")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_from_file_anchors_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(
            config.resolve(EVENTS_FILE).unwrap(),
            std::path::absolute(dir.path()).unwrap().join("data/events.jsonl")
        );
    }
}
