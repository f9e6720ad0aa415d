//! Runtime configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Parse the optional JSON config file with defaults for every field.
//! - Validate values before any database or log file is opened.

use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_REMOTE_DB_PATH: &str = "fitsync_remote.sqlite3";
const DEFAULT_CACHE_DB_PATH: &str = "fitsync_cache.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    /// Value present but unusable; names the offending field.
    Invalid { field: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<String>,
    /// SQLite file backing the remote record store.
    pub remote_db_path: PathBuf,
    /// SQLite file backing the local snapshot cache.
    pub cache_db_path: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            remote_db_path: PathBuf::from(DEFAULT_REMOTE_DB_PATH),
            cache_db_path: PathBuf::from(DEFAULT_CACHE_DB_PATH),
        }
    }
}

impl CoreConfig {
    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(|message| ConfigError::Invalid {
            field: "log_level",
            message,
        })?;
        if let Some(log_dir) = &self.log_dir {
            if !Path::new(log_dir.trim()).is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "log_dir",
                    message: "must be an absolute path".to_string(),
                });
            }
        }
        if self.remote_db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "remote_db_path",
                message: "must not be empty".to_string(),
            });
        }
        if self.cache_db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "cache_db_path",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::logging::default_log_level;
    use std::path::PathBuf;

    #[test]
    fn empty_object_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.remote_db_path, PathBuf::from("fitsync_remote.sqlite3"));
    }

    #[test]
    fn rejects_unknown_level_and_relative_log_dir() {
        let err = CoreConfig::from_json_str(r#"{"log_level": "verbose"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "log_level", .. }));

        let err = CoreConfig::from_json_str(r#"{"log_dir": "logs"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "log_dir", .. }));

        let err = CoreConfig::from_json_str(r#"{"cache_db_path": ""}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "cache_db_path", .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let path = dir.path().join("fitsync.json");
        std::fs::write(&path, r#"{"log_level": "warn", "remote_db_path": "r.db"}"#).unwrap();
        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.remote_db_path, PathBuf::from("r.db"));
    }
}
