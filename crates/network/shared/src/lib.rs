//! Shared networking types for the Forge of Stories game client.
//!
//! This crate hosts the protocol primitives the transport and the domain
//! synchronisation layer agree on:
//! - codec: the `[message id][payload length][payload]` wire frame and its
//!   incremental decoder
//! - ids: the flat enumeration of request/response message identifiers
//! - serialization: the swappable payload codec (JSON by default, bincode)
//! - envelope: the `{success, message, data}` response wrapper
//! - events / config / protocol: connection state, client settings, login body
//!
//! Keep this crate lean: no sockets, no runtime.

pub mod codec;
pub mod config;
pub mod envelope;
pub mod events;
pub mod ids;
pub mod protocol;
pub mod serialization;

pub use codec::{DEFAULT_MAX_FRAME_SIZE, Frame, FrameCodec, FrameDecoder, FrameError, HEADER_LEN};
pub use config::{ClientNetworkingConfig, EndpointParseError, ServerEndpoint};
pub use envelope::{ResponseError, ServerResponse};
pub use events::{ConnectionState, DisconnectReason};
pub use ids::{MessageId, UnknownMessageId};
pub use protocol::Credentials;
pub use serialization::{BincodeSerializer, JsonSerializer, MessageSerializer, SerializationError};

/// Convenience prelude for downstream crates.
pub mod prelude {
    pub use crate::codec::{Frame, FrameCodec, FrameDecoder};
    pub use crate::envelope::ServerResponse;
    pub use crate::ids::MessageId;
    pub use crate::serialization::{JsonSerializer, MessageSerializer};
}
