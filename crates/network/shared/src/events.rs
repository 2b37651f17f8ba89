/// Lifecycle of the single client connection.
///
/// `Disconnected -> Connecting -> Connected -> Disconnected`; a failed connect
/// goes straight back from `Connecting` to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub const fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Reasons why the connection to the server ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Local `disconnect()` or replacement by a newer `connect()`.
    Graceful,
    /// Server closed the stream (EOF).
    RemoteClosed,
    /// Read or write on the socket failed.
    TransportError,
    /// Peer sent a frame header the codec refuses (negative / oversized length).
    ProtocolViolation,
}
