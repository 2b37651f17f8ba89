use std::sync::Arc;

use network_shared::{FrameDecoder, FrameError};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::oneshot,
};
use tracing::trace;

use crate::{dispatch::Dispatcher, metrics::TransportMetrics};

/// Why a read loop stopped.
#[derive(Debug)]
pub enum ReadLoopExit {
    /// Shutdown was requested (or the shutdown sender was dropped).
    Shutdown,
    /// Peer closed the stream.
    RemoteClosed,
    ReadError(std::io::Error),
    /// Peer sent an unacceptable frame header; the stream cannot be resynchronised.
    ProtocolViolation(FrameError),
}

/// Reads raw chunks from the socket, reassembles frames and dispatches them
/// in arrival order. One instance per connection.
pub struct FrameReader<R> {
    reader: R,
    decoder: FrameDecoder,
    chunk: Vec<u8>,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<TransportMetrics>,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        reader: R,
        dispatcher: Arc<Dispatcher>,
        metrics: Arc<TransportMetrics>,
        max_frame_size: usize,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            reader,
            decoder: FrameDecoder::new(max_frame_size),
            chunk: vec![0; read_buffer_size.max(1)],
            dispatcher,
            metrics,
        }
    }

    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> ReadLoopExit {
        loop {
            let read = tokio::select! {
                biased;
                _ = &mut shutdown => return ReadLoopExit::Shutdown,
                read = self.reader.read(&mut self.chunk) => read,
            };

            match read {
                Ok(0) => return ReadLoopExit::RemoteClosed,
                Ok(n) => {
                    self.decoder.push_bytes(&self.chunk[..n]);
                    if let Err(err) = self.drain() {
                        self.decoder.clear();
                        return ReadLoopExit::ProtocolViolation(err);
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return ReadLoopExit::ReadError(err),
            }
        }
    }

    fn drain(&mut self) -> Result<(), FrameError> {
        while let Some(frame) = self.decoder.next_frame()? {
            self.metrics.record_received(frame.encoded_len());
            trace!(
                target: "network::transport",
                message_id = frame.message_id,
                payload_len = frame.payload.len(),
                "frame received"
            );
            self.dispatcher.dispatch(frame.message_id, &frame.payload);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use bytes::{BufMut, BytesMut};
    use network_shared::{DEFAULT_MAX_FRAME_SIZE, FrameCodec};
    use std::sync::Mutex;
    use tokio::io::AsyncWriteExt;

    type Seen = Arc<Mutex<Vec<(i32, Vec<u8>)>>>;

    fn recording_dispatcher(ids: &[i32]) -> (Arc<Dispatcher>, Seen) {
        let dispatcher = Arc::new(Dispatcher::new());
        let seen: Seen = Arc::default();
        for &id in ids {
            let seen = Arc::clone(&seen);
            dispatcher.register(id, move |payload: &[u8]| {
                seen.lock().unwrap().push((id, payload.to_vec()));
            });
        }
        (dispatcher, seen)
    }

    fn reader<R: AsyncRead + Unpin>(r: R, dispatcher: Arc<Dispatcher>) -> FrameReader<R> {
        FrameReader::new(r, dispatcher, Arc::default(), DEFAULT_MAX_FRAME_SIZE, 64)
    }

    #[tokio::test]
    async fn fragmented_stream_dispatches_each_frame_once() -> Result<()> {
        // 1-byte pipe: every read returns a single byte.
        let (mut tx, rx) = tokio::io::duplex(1);
        let (dispatcher, seen) = recording_dispatcher(&[2010, 4002]);
        let (_stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(reader(rx, dispatcher).run(stop_rx));

        let codec = FrameCodec::default();
        let mut bytes = BytesMut::new();
        codec.encode(2010, b"[1,2,3]", &mut bytes)?;
        codec.encode(4002, b"{}", &mut bytes)?;
        codec.encode(4002, b"", &mut bytes)?;
        tx.write_all(&bytes).await?;
        drop(tx);

        let exit = task.await?;
        assert!(matches!(exit, ReadLoopExit::RemoteClosed), "{exit:?}");
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[
                (2010, b"[1,2,3]".to_vec()),
                (4002, b"{}".to_vec()),
                (4002, Vec::new()),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_ids_do_not_stop_the_loop() -> Result<()> {
        let (mut tx, rx) = tokio::io::duplex(64);
        let (dispatcher, seen) = recording_dispatcher(&[1004]);
        let (_stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(reader(rx, Arc::clone(&dispatcher)).run(stop_rx));

        let codec = FrameCodec::default();
        let mut bytes = BytesMut::new();
        codec.encode(777, b"?", &mut bytes)?;
        codec.encode(1004, b"ok", &mut bytes)?;
        tx.write_all(&bytes).await?;
        drop(tx);

        task.await?;
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(dispatcher.unhandled_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn negative_length_is_a_protocol_violation() -> Result<()> {
        let (mut tx, rx) = tokio::io::duplex(64);
        let (dispatcher, seen) = recording_dispatcher(&[5]);
        let (_stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(reader(rx, dispatcher).run(stop_rx));

        let mut bytes = BytesMut::new();
        bytes.put_i32(5);
        bytes.put_i32(-1);
        tx.write_all(&bytes).await?;

        let exit = task.await?;
        assert!(matches!(
            exit,
            ReadLoopExit::ProtocolViolation(FrameError::NegativeLength(-1))
        ));
        assert!(seen.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_signal_stops_idle_loop() -> Result<()> {
        let (_tx, rx) = tokio::io::duplex(64);
        let (dispatcher, _) = recording_dispatcher(&[]);
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(reader(rx, dispatcher).run(stop_rx));

        stop.send(()).ok();
        assert!(matches!(task.await?, ReadLoopExit::Shutdown));
        Ok(())
    }
}
