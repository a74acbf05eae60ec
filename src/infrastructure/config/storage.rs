use super::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig};
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a config directory for this platform")]
    ConfigDirNotFound,
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Owns `config.toml` in the platform config directory.
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigDirNotFound`] when no home directory is known.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::ConfigDirNotFound)?;

        Ok(Self { config_dir })
    }

    #[must_use]
    pub fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// `path_override` if given, else `config.toml` in the config directory.
    #[must_use]
    pub fn config_path(&self, path_override: Option<&Path>) -> PathBuf {
        path_override.map_or_else(|| self.config_dir.join(CONFIG_FILE_NAME), Path::to_path_buf)
    }

    /// Loads the configuration, writing defaults when the file is missing.
    ///
    /// A file that fails to parse is left untouched and defaults are used
    /// for this run.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or the default
    /// cannot be written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = self.config_path(path_override);
        match Self::read(&path) {
            Ok(Some(config)) => Ok(config),
            Ok(None) => {
                info!(path = ?path, "Config file not found, writing defaults");
                let config = AppConfig::default();
                Self::write(&path, &config)?;
                Ok(config)
            }
            Err(ConfigError::Parse { path, source }) => {
                warn!(path = ?path, error = %source, "Config file is malformed, using defaults");
                Ok(AppConfig::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Records the signed-in user's id in the config file.
    ///
    /// Only `user_id` changes; command-line overrides of this run are not
    /// written back. A malformed file is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or written.
    pub fn remember_user_id(
        &self,
        path_override: Option<&Path>,
        user_id: &str,
    ) -> Result<(), ConfigError> {
        let path = self.config_path(path_override);
        let mut config = Self::read(&path)?.unwrap_or_default();
        if config.user_id.as_deref() == Some(user_id) {
            debug!("User id already recorded");
            return Ok(());
        }
        config.user_id = Some(user_id.to_string());
        Self::write(&path, &config)?;
        info!(path = ?path, user_id, "Recorded user id");
        Ok(())
    }

    fn read(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Replaces the file atomically via a sibling temp file.
    fn write(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;

        let mut temp_file =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| ConfigError::io(parent, e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| ConfigError::io(path, e))?;
        temp_file
            .persist(path)
            .map_err(|e| ConfigError::io(path, e.error))?;

        Ok(())
    }
}
