//! `homelink.toml` plus `HOMELINK_*` environment overrides.
//!
//! The file is optional and every key has a default; the environment wins
//! over the file. The merged result is validated before anything starts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

const CONFIG_FILE: &str = "homelink.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub settings: SettingsConfig,
    pub integrations: IntegrationsConfig,
    /// Scenes the automation bus can activate by id or name.
    pub scenes: Vec<SceneConfig>,
}

/// Listener for the websocket and the JSON API.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx `SQLite` URL of the value history.
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives.
    pub filter: String,
}

/// Per-controller settings survive restarts in this TOML file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub path: PathBuf,
}

/// Which simulated networks to run, and how to drive them.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    pub mesh_enabled: bool,
    pub bridge_enabled: bool,
    /// Top of the RGBW dimmer channel range.
    pub rgbw_scale: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneConfig {
    pub id: String,
    pub name: String,
}

impl Config {
    /// Read [`CONFIG_FILE`] from the working directory, apply the
    /// environment and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or malformed, or
    /// the merged configuration is inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(Path::new(CONFIG_FILE))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `lookup` resolves one environment variable.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("HOMELINK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("HOMELINK_PORT").and_then(|raw| raw.parse().ok()) {
            self.server.port = port;
        }
        // `HOMELINK_BIND=host:port` beats the separate variables.
        if let Some((host, port)) = lookup("HOMELINK_BIND")
            .as_deref()
            .and_then(|bind| bind.rsplit_once(':'))
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(url) = lookup("HOMELINK_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(path) = lookup("HOMELINK_SETTINGS") {
            self.settings.path = PathBuf::from(path);
        }
        if let Some(filter) = lookup("RUST_LOG").or_else(|| lookup("HOMELINK_LOG")) {
            self.logging.filter = filter;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Validation(reason));
        if self.server.port == 0 {
            return invalid("server.port must be non-zero".to_string());
        }
        if self.integrations.rgbw_scale == 0 {
            return invalid("integrations.rgbw_scale must be non-zero".to_string());
        }
        if self.settings.path.as_os_str().is_empty() {
            return invalid("settings.path must not be empty".to_string());
        }
        let mut ids = HashSet::new();
        for scene in &self.scenes {
            if scene.id.trim().is_empty() {
                return invalid(format!("scene {:?} has an empty id", scene.name));
            }
            if !ids.insert(scene.id.as_str()) {
                return invalid(format!("duplicate scene id {}", scene.id));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:homelink.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homelinkd=info,homelink=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("homelink-settings.toml"),
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            mesh_enabled: true,
            bridge_enabled: true,
            rgbw_scale: homelink_adapter_mesh::rgbw::DEFAULT_SCALE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn parse(raw: &str) -> Config {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn should_run_both_simulated_networks_by_default() {
        let defaults = Config::default();
        assert_eq!(defaults.bind_addr(), "0.0.0.0:8080");
        assert_eq!(defaults.database_url(), "sqlite:homelink.db?mode=rwc");
        assert_eq!(defaults.settings.path, Path::new("homelink-settings.toml"));
        assert!(defaults.integrations.mesh_enabled && defaults.integrations.bridge_enabled);
        assert_eq!(defaults.integrations.rgbw_scale, 99);
        assert!(defaults.scenes.is_empty());
        assert!(defaults.validate().is_ok());
    }

    #[test]
    fn should_treat_empty_file_as_defaults() {
        assert_eq!(parse("").bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn should_read_every_section() {
        let loaded = parse(
            "
            [server]
            host = '127.0.0.1'
            port = 9090

            [database]
            url = 'sqlite::memory:'

            [logging]
            filter = 'homelink=trace'

            [settings]
            path = '/var/lib/homelink/settings.toml'

            [integrations]
            mesh_enabled = false
            rgbw_scale = 255

            [[scenes]]
            id = '1'
            name = 'Movie'

            [[scenes]]
            id = '2'
            name = 'Dinner'
        ",
        );
        assert_eq!(loaded.bind_addr(), "127.0.0.1:9090");
        assert_eq!(loaded.database_url(), "sqlite::memory:");
        assert_eq!(loaded.logging.filter, "homelink=trace");
        assert_eq!(loaded.settings.path, Path::new("/var/lib/homelink/settings.toml"));
        assert!(!loaded.integrations.mesh_enabled);
        assert!(loaded.integrations.bridge_enabled);
        assert_eq!(loaded.integrations.rgbw_scale, 255);
        let names: Vec<&str> = loaded.scenes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Movie", "Dinner"]);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn should_fall_back_to_defaults_without_file() {
        let loaded = Config::from_file(Path::new("does-not-exist/homelink.toml")).unwrap();
        assert_eq!(loaded.integrations.rgbw_scale, 99);
    }

    #[test]
    fn should_name_file_in_parse_error() {
        let path = std::env::temp_dir().join(format!("homelink-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = Config::from_file(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("homelink-config-"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn should_refuse_zero_port_or_scale() {
        let zero_port = parse("[server]\nport = 0");
        assert!(zero_port.validate().is_err());

        let zero_scale = parse("[integrations]\nrgbw_scale = 0");
        let err = zero_scale.validate().unwrap_err();
        assert!(err.to_string().contains("rgbw_scale"));
    }

    #[test]
    fn should_refuse_duplicate_or_blank_scene_ids() {
        let duplicate = parse(
            "
            [[scenes]]
            id = '1'
            name = 'Movie'

            [[scenes]]
            id = '1'
            name = 'Dinner'
        ",
        );
        assert!(duplicate.validate().unwrap_err().to_string().contains("duplicate scene id 1"));

        let blank = parse("[[scenes]]\nid = ' '\nname = 'Night'");
        assert!(blank.validate().unwrap_err().to_string().contains("Night"));
    }

    #[test]
    fn should_let_environment_win_over_file() {
        let mut merged = parse("[server]\nhost = '10.0.0.5'\nport = 9000");
        merged.apply_overrides(env(&[
            ("HOMELINK_BIND", "127.0.0.1:7000"),
            ("HOMELINK_DATABASE_URL", "sqlite::memory:"),
            ("HOMELINK_SETTINGS", "/tmp/settings.toml"),
            ("HOMELINK_LOG", "homelinkd=debug"),
        ]));
        assert_eq!(merged.bind_addr(), "127.0.0.1:7000");
        assert_eq!(merged.database_url(), "sqlite::memory:");
        assert_eq!(merged.settings.path, Path::new("/tmp/settings.toml"));
        assert_eq!(merged.logging.filter, "homelinkd=debug");
    }

    #[test]
    fn should_prefer_rust_log_over_homelink_log() {
        let mut merged = Config::default();
        merged.apply_overrides(env(&[("HOMELINK_LOG", "debug"), ("RUST_LOG", "trace")]));
        assert_eq!(merged.logging.filter, "trace");
    }

    #[test]
    fn should_keep_port_when_override_is_not_a_number() {
        let mut merged = Config::default();
        merged.apply_overrides(env(&[("HOMELINK_PORT", "http"), ("HOMELINK_HOST", "::1")]));
        assert_eq!(merged.bind_addr(), "::1:8080");
    }
}
