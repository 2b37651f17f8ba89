use bytes::Bytes;
use network_shared::{MessageId, MessageSerializer};
use serde::Serialize;

use crate::error::SendError;

mod read_loop;
pub mod tcp;

pub use read_loop::{FrameReader, ReadLoopExit};
pub use tcp::TcpClientTransport;

/// Outbound seam the domain models talk to. Implemented by the TCP transport
/// and by recording doubles in tests.
#[allow(async_fn_in_trait)]
pub trait MessageSink: Send + Sync + 'static {
    type Codec: MessageSerializer + Clone;

    /// Payload codec used for request bodies and for decoding responses.
    fn codec(&self) -> &Self::Codec;

    /// Writes one frame with an already encoded payload.
    async fn send(&self, message_id: i32, payload: Bytes) -> Result<(), SendError>;

    /// Serialize `body` with [`Self::codec`] and send it.
    async fn send_message<T: Serialize>(&self, message_id: MessageId, body: &T) -> Result<(), SendError> {
        let payload = self.codec().serialize(body)?;
        self.send(message_id.as_i32(), Bytes::from(payload)).await
    }

    /// Sends a request without parameters (zero-length payload).
    async fn send_empty(&self, message_id: MessageId) -> Result<(), SendError> {
        self.send(message_id.as_i32(), Bytes::new()).await
    }
}
