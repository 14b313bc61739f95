//! Controller settings kept in a TOML file, one table per controller.
//!
//! ```toml
//! [bridge]
//! BRIDGE_ADDRESS = "192.168.1.20"
//! BRIDGE_USERNAME = "homelink-demo"
//! ```

use std::path::{Path, PathBuf};

use homelink_app::ports::SettingsStore;
use homelink_app::settings::{MemorySettings, SettingsMap};
use homelink_domain::controller::Setting;
use homelink_domain::error::HubError;

/// Settings file errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize settings")]
    Serialize(#[from] toml::ser::Error),
}

impl From<SettingsError> for HubError {
    fn from(err: SettingsError) -> Self {
        HubError::Settings(Box::new(err))
    }
}

/// [`MemorySettings`] loaded from and written back to a TOML file.
pub struct TomlSettingsStore {
    path: PathBuf,
    inner: MemorySettings,
}

impl TomlSettingsStore {
    /// Read `path`. A missing file starts empty and is created on persist.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the file exists but cannot be read or
    /// parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values: SettingsMap = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => SettingsMap::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), controllers = values.len(), "settings loaded");
        Ok(Self {
            path,
            inner: MemorySettings::from_map(values),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(&self.inner.snapshot())?;
        std::fs::write(&self.path, content).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl SettingsStore for TomlSettingsStore {
    fn get_string(&self, controller: &str, key: &str, default: &str) -> String {
        self.inner.get_string(controller, key, default)
    }

    fn set_string(&self, controller: &str, key: &str, value: &str) -> Result<(), HubError> {
        self.inner.set_string(controller, key, value)
    }

    fn register(&self, controller: &str, settings: &[Setting]) -> Result<(), HubError> {
        self.inner.register(controller, settings)
    }

    fn persist(&self) -> Result<(), HubError> {
        self.write()?;
        tracing::debug!(path = %self.path.display(), "settings persisted");
        Ok(())
    }
}
