//! Gemeinsame Konfigurationsstrukturen für den Client.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::DEFAULT_MAX_FRAME_SIZE;

/// Adresse des Spielservers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointParseError {
    #[error("endpoint must look like host:port, got `{0}`")]
    MissingPort(String),
    #[error("invalid port `{0}`")]
    InvalidPort(String),
    #[error("empty host")]
    EmptyHost,
}

impl FromStr for ServerEndpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError::MissingPort(s.to_string()))?;
        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost);
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointParseError::InvalidPort(port.to_string()))?;
        Ok(Self::new(host, port))
    }
}

/// Clientseitige Netzwerkkonfiguration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientNetworkingConfig {
    pub host: String,
    pub port: u16,
    /// Obergrenze für den TCP-Verbindungsaufbau.
    pub connect_timeout_ms: u64,
    /// Obergrenze für das Schreiben eines Frames; danach gilt die Verbindung als tot.
    pub write_timeout_ms: u64,
    /// Maximale Payload-Größe eines einzelnen Frames (ohne Header).
    pub max_frame_size: usize,
    /// Größe des Lesepuffers pro `read`-Aufruf.
    pub read_buffer_size: usize,
    /// Kapazität des Broadcast-Kanals für Sync-Benachrichtigungen.
    pub event_capacity: usize,
}

impl Default for ClientNetworkingConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8888,
            connect_timeout_ms: 5_000,
            write_timeout_ms: 10_000,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_buffer_size: 4_096,
            event_capacity: 256,
        }
    }
}

impl ClientNetworkingConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_parses_host_and_port() {
        let ep: ServerEndpoint = "game.example.org:9000".parse().unwrap();
        assert_eq!(ep, ServerEndpoint::new("game.example.org", 9000));
        assert_eq!(ep.to_string(), "game.example.org:9000");
    }

    #[test]
    fn endpoint_rejects_bad_input() {
        assert!(matches!(
            "localhost".parse::<ServerEndpoint>(),
            Err(EndpointParseError::MissingPort(_))
        ));
        assert!(matches!(
            "localhost:99999".parse::<ServerEndpoint>(),
            Err(EndpointParseError::InvalidPort(_))
        ));
        assert_eq!(":80".parse::<ServerEndpoint>(), Err(EndpointParseError::EmptyHost));
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: ClientNetworkingConfig = serde_json::from_str(r#"{"port": 7000}"#).unwrap();
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.write_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
    }
}
