//! Clientseitiger Netzwerkstack: eine TCP-Verbindung zum Spielserver,
//! eine Lese-Schleife pro Verbindung und die Weiterleitung eingehender
//! Frames an registrierte Handler.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod runtime;
pub mod transport;

pub use config::{ClientConfig, ConfigError, LogSettings};
pub use dispatch::{Dispatcher, Handler};
pub use error::{ConnectError, SendError};
pub use metrics::{TransportMetrics, TransportMetricsSnapshot};
pub use runtime::{ClientNetworkRuntime, RuntimeError};
pub use transport::{MessageSink, TcpClientTransport};
