//! Fehler- und Ergebnis-Typen für clientseitige Netzwerkoperationen.

use std::time::Duration;

use network_shared::{FrameError, SerializationError, ServerEndpoint};
use thiserror::Error;

/// Verbindungsaufbau fehlgeschlagen. Der Transport ist danach `Disconnected`.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("server {endpoint} unreachable: {source}")]
    Unreachable {
        endpoint: ServerEndpoint,
        #[source]
        source: std::io::Error,
    },
    #[error("connecting to {endpoint} timed out after {after:?}")]
    Timeout {
        endpoint: ServerEndpoint,
        after: Duration,
    },
    #[error("login request could not be sent: {0}")]
    Login(#[source] SendError),
}

/// Schreiben eines Frames fehlgeschlagen.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("not connected")]
    NotConnected,
    #[error("frame rejected: {0}")]
    Frame(#[from] FrameError),
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] SerializationError),
    /// The connection was torn down while this frame was being written.
    #[error("connection closed during write")]
    Aborted,
    #[error("write timed out after {0:?}")]
    Timeout(Duration),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}
