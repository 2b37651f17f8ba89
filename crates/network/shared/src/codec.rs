//! Frame Codec (Forge of Stories – Game Client)
//!
//! Responsibilities:
//! - Length-prefix framing: [i32_be message id][i32_be payload length][payload bytes]
//! - Incremental decode support (stream oriented); caller feeds arbitrary
//!   raw byte chunks (e.g. from a TCP read) and pulls zero or more frames.
//!
//! The codec never looks into the payload. Turning payload bytes into typed
//! values is the job of a `MessageSerializer` (see `serialization.rs`).
//!
//! Error Handling:
//! - Negative or oversized length prefix (> `max_frame_bytes`) => hard error,
//!   the caller should drop the connection. Nothing is allocated for the
//!   payload before the limit check.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the fixed frame header: message id + payload length, both `i32` BE.
pub const HEADER_LEN: usize = 8;

/// Upper bound for a single payload unless configured otherwise (1 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// One complete message as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_id: i32,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(message_id: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            message_id,
            payload: payload.into(),
        }
    }

    /// Total encoded size including the header.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too large: {len} > {max}")]
    TooLarge { len: usize, max: usize },
    #[error("negative frame length: {0}")]
    NegativeLength(i32),
}

/// Codec configuration / stateless helper.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    /// Maximum allowed payload size (bytes), excluding the 8-byte header.
    pub max_frame_bytes: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self { max_frame_bytes }
    }

    /// Encode one message and append it to `out`.
    ///
    /// Layout: [id: i32 BE][len: i32 BE][payload bytes...]
    pub fn encode(&self, message_id: i32, payload: &[u8], out: &mut BytesMut) -> Result<(), FrameError> {
        let len = payload.len();
        if len > self.max_frame_bytes || len > i32::MAX as usize {
            return Err(FrameError::TooLarge {
                len,
                max: self.max_frame_bytes,
            });
        }
        out.reserve(HEADER_LEN + len);
        out.put_i32(message_id);
        out.put_i32(len as i32);
        out.put_slice(payload);
        Ok(())
    }

    /// Encode into a fresh buffer, ready to be written to a socket.
    pub fn encode_to_bytes(&self, message_id: i32, payload: &[u8]) -> Result<Bytes, FrameError> {
        let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
        self.encode(message_id, payload, &mut out)?;
        Ok(out.freeze())
    }

    /// Attempt to decode exactly one frame from `buffer`.
    ///
    /// Returns:
    /// - Ok(Some(Frame)) if a full frame was decoded (and removed from buffer)
    /// - Ok(None) if not enough data yet
    /// - Err if the declared length is negative or violates the size limit
    ///
    /// The buffer may contain additional bytes (subsequent frames) which remain untouched.
    pub fn try_decode(buffer: &mut BytesMut, max_frame_bytes: usize) -> Result<Option<Frame>, FrameError> {
        if buffer.len() < HEADER_LEN {
            return Ok(None);
        }
        let mut header = &buffer[..HEADER_LEN];
        let message_id = header.get_i32();
        let declared = header.get_i32();

        if declared < 0 {
            return Err(FrameError::NegativeLength(declared));
        }
        let len = declared as usize;
        if len > max_frame_bytes {
            return Err(FrameError::TooLarge {
                len,
                max: max_frame_bytes,
            });
        }

        if buffer.len() < HEADER_LEN + len {
            buffer.reserve(HEADER_LEN + len - buffer.len());
            return Ok(None);
        }

        buffer.advance(HEADER_LEN);
        let payload = buffer.split_to(len).freeze();
        Ok(Some(Frame { message_id, payload }))
    }
}

/// Stateful incremental decoder.
/// Feed arbitrary chunks via `push_bytes`, then repeatedly call `next_frame`
/// until it returns Ok(None).
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_bytes: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameDecoder {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_bytes,
        }
    }

    /// Supply additional raw bytes.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Attempt to pull one frame. See `FrameCodec::try_decode` semantics.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        FrameCodec::try_decode(&mut self.buf, self.max_frame_bytes)
    }

    /// Expose internal buffered (undecoded) byte count (for diagnostics).
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Clear buffer (e.g. after fatal error).
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
