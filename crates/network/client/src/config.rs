//! Konfigurationsstrukturen für den Client-Netzwerkstack.
//!
//! Geladen wird aus einer TOML-Datei; jedes Feld hat einen Standardwert, eine
//! leere Datei ist also gültig.
//!
//! ```toml
//! [networking]
//! host = "127.0.0.1"
//! port = 8888
//! connect_timeout_ms = 5000
//! write_timeout_ms = 10000
//!
//! [logging]
//! level = "debug"
//! file = false
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use network_shared::config::ClientNetworkingConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub networking: ClientNetworkingConfig,
    pub logging: LogSettings,
}

/// Logging-Wünsche des Nutzers; ausgewertet vom `app`-Crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `None` = Build-abhängiger Standard (INFO im Debug-, WARN im Release-Build).
    pub level: Option<String>,
    pub console: bool,
    pub file: bool,
    /// `None` = Standardverzeichnis unter dem lokalen Datenordner.
    pub directory: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: None,
            console: true,
            file: true,
            directory: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ClientConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Lädt `path`, falls vorhanden, sonst die Standardwerte.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no client config found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let net = &self.networking;
        if net.host.trim().is_empty() {
            return Err(ConfigError::Invalid("networking.host must not be empty".into()));
        }
        if net.port == 0 {
            return Err(ConfigError::Invalid("networking.port must not be 0".into()));
        }
        if net.connect_timeout_ms == 0 || net.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "networking.connect_timeout_ms and networking.write_timeout_ms must be positive".into(),
            ));
        }
        if net.max_frame_size == 0 || net.max_frame_size > i32::MAX as usize {
            return Err(ConfigError::Invalid(format!(
                "networking.max_frame_size out of range: {}",
                net.max_frame_size
            )));
        }
        if net.read_buffer_size == 0 || net.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "networking.read_buffer_size and networking.event_capacity must be positive".into(),
            ));
        }
        if let Some(level) = &self.logging.level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::Invalid(format!("unknown log level `{level}`")));
            }
        }
        Ok(())
    }
}
