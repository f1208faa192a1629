//! Application configuration management.
//!
//! Configuration is layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`BADGER_CONFIG`, or `config.toml` in the platform config dir)
//! 3. Environment variables such as `BADGER__SERVER__PORT=8080`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::DirectoryPath;
use crate::storage::{Storage, StorageError};

/// Prefix of environment overrides (`BADGER__<SECTION>__<KEY>`).
pub const ENV_PREFIX: &str = "BADGER";

/// Errors from loading, saving, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// A configuration source could not be read or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] ::config::ConfigError),

    /// The configuration could not be serialized to TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// The configuration file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// Target file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A single field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("Configuration has {} invalid fields", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Directory backend.
    pub directory: DirectoryConfig,
    /// Guest collection settings.
    pub guests: GuestsConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Directory backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Keep the tree on disk between restarts.
    pub persist: bool,
    /// Where to keep it; the platform data directory when unset.
    pub data_dir: Option<PathBuf>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            persist: true,
            data_dir: None,
        }
    }
}

/// Guest collection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestsConfig {
    /// Directory path of the guest collection.
    pub path: String,
    /// Maximum number of results per name search.
    pub search_limit: usize,
    /// Minimum length of a registered name.
    pub min_name_length: usize,
}

impl Default for GuestsConfig {
    fn default() -> Self {
        Self {
            path: "users".to_string(),
            search_limit: 200,
            min_name_length: 3,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// JSON file logs plus compact stdout instead of pretty stdout.
    pub production: bool,
    /// Directory for log files; platform default when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            production: false,
            directory: None,
        }
    }
}

impl Config {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// With `path` set the file must exist; otherwise the platform default
    /// file is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or any source fails to parse.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = ::config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                builder = builder.add_source(::config::File::from(path).required(true));
            }
            None => {
                if let Some(default) = default_config_path() {
                    builder = builder.add_source(::config::File::from(default).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Save configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized or written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let write_error = |source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_error)
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns the single failure, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, message: &str| {
            errors.push(ConfigError::ValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.server.host.trim().is_empty() {
            invalid("server.host", "must not be empty");
        }
        if self.server.port == 0 {
            invalid("server.port", "must be between 1 and 65535");
        }
        match DirectoryPath::parse(&self.guests.path) {
            Ok(path) if path.is_root() => invalid("guests.path", "must not be the root"),
            Ok(_) => {}
            Err(_) => invalid("guests.path", "contains a forbidden character"),
        }
        if self.guests.search_limit == 0 {
            invalid("guests.search_limit", "must be at least 1");
        }
        if self.guests.min_name_length == 0 {
            invalid("guests.min_name_length", "must be at least 1");
        }
        if self.logging.level.trim().is_empty() {
            invalid("logging.level", "must not be empty");
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// `host:port` to bind the HTTP listener to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Storage for the directory tree, `None` when persistence is off.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory is configured and the platform
    /// default cannot be determined.
    pub fn storage(&self) -> Result<Option<Storage>, StorageError> {
        if !self.directory.persist {
            return Ok(None);
        }
        match &self.directory.data_dir {
            Some(dir) => Ok(Some(Storage::new(dir))),
            None => Storage::default_location().map(Some),
        }
    }
}

/// Platform default location of `config.toml`.
///
/// On Linux: `/etc/badger/config.toml`
/// Elsewhere: the user config directory for `badger`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Some(PathBuf::from("/etc/badger/config.toml"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "badger")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.guests.path, "users");
        assert_eq!(config.guests.search_limit, 200);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8080\n\n[guests]\nsearch_limit = 25\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.guests.search_limit, 25);
        assert_eq!(config.guests.path, "users");
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.guests.path = "events/gala/guests".to_string();
        config.directory.data_dir = Some(dir.path().join("data"));

        config.save(&path).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = Config::default();
        config.server.port = 0;
        config.guests.path = "users.list".to_string();
        config.guests.search_limit = 0;

        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_single_error() {
        let mut config = Config::default();
        config.guests.path = "/".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { field, .. }) if field == "guests.path"
        ));
    }

    #[test]
    fn test_storage_respects_persist_flag() {
        let mut config = Config::default();
        config.directory.persist = false;
        assert!(config.storage().unwrap().is_none());

        config.directory.persist = true;
        config.directory.data_dir = Some(PathBuf::from("/tmp/badger-test"));
        let storage = config.storage().unwrap().unwrap();
        assert_eq!(storage.data_dir(), Path::new("/tmp/badger-test"));
    }
}
