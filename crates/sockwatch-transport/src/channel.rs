//! Typed event channel over a byte stream.
//!
//! [`FramedReader`] turns an [`AsyncRead`] into a sequence of [`Envelope`]s,
//! [`FramedWriter`] writes envelopes to an [`AsyncWrite`]. Both halves are
//! independent so a connection can read and write from separate tasks.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::event::Envelope;
use crate::framer::{encode_frame, Delimiter, FrameDecoder};
use crate::FrameError;

/// Size of a single socket read.
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Split a TCP stream into framed halves sharing one delimiter.
pub fn split(
    stream: TcpStream,
    delimiter: Delimiter,
) -> (FramedReader<OwnedReadHalf>, FramedWriter<OwnedWriteHalf>) {
    let (reader, writer) = stream.into_split();
    (
        FramedReader::new(reader, delimiter.clone()),
        FramedWriter::new(writer, delimiter),
    )
}

/// Receiving half: reads chunks and yields decoded envelopes in arrival order.
pub struct FramedReader<R> {
    inner: R,
    decoder: FrameDecoder,
    chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    /// Wrap a read half; messages end with `delimiter`.
    pub fn new(inner: R, delimiter: Delimiter) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(delimiter),
            chunk: vec![0u8; READ_CHUNK_SIZE],
        }
    }

    /// Receive the next envelope. Returns `Ok(None)` once the peer closed the
    /// stream.
    ///
    /// Cancel safe: bytes already read stay buffered in the decoder.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Io`] if the read fails, or
    /// [`FrameError::MessageTooLarge`] if the peer never delimits a message.
    pub async fn recv(&mut self) -> Result<Option<Envelope>, FrameError> {
        loop {
            if let Some(envelope) = self.decoder.next_message()? {
                return Ok(Some(envelope));
            }
            let n = self.inner.read(&mut self.chunk).await?;
            if n == 0 {
                if self.decoder.pending() > 0 {
                    tracing::debug!(
                        pending = self.decoder.pending(),
                        "stream closed with an incomplete message"
                    );
                }
                return Ok(None);
            }
            self.decoder.push(&self.chunk[..n]);
        }
    }
}

/// Sending half.
pub struct FramedWriter<W> {
    inner: W,
    delimiter: Delimiter,
}

impl<W: AsyncWrite + Unpin> FramedWriter<W> {
    /// Wrap a write half; messages end with `delimiter`.
    pub fn new(inner: W, delimiter: Delimiter) -> Self {
        Self { inner, delimiter }
    }

    /// Encode and write one envelope.
    ///
    /// An envelope that fails to encode is logged and dropped; the stream is
    /// left untouched and `Ok(())` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Io`] if the write fails.
    pub async fn send(&mut self, envelope: &Envelope) -> Result<(), FrameError> {
        let frame = match encode_frame(envelope, &self.delimiter) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(kind = %envelope.kind(), error = %e, "dropping unencodable message");
                return Ok(());
            }
        };
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Flush and close the write direction.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Io`] if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<(), FrameError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Payload;
    use sockwatch_types::{JoinEvent, SocketEvent};
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_send_recv_over_duplex() {
        let (a, b) = duplex(64);
        let mut writer = FramedWriter::new(a, Delimiter::default());
        let mut reader = FramedReader::new(b, Delimiter::default());

        let sent = vec![
            Envelope::new(Payload::Connect(SocketEvent::new("a"))),
            Envelope::new(Payload::Join(JoinEvent {
                id: "a".to_string(),
                rooms: vec!["lobby".to_string(), "games".to_string()],
            })),
            Envelope::new(Payload::Password("x".repeat(500))),
        ];

        let expected = sent.clone();
        let send_task = tokio::spawn(async move {
            for envelope in &sent {
                writer.send(envelope).await.expect("send");
            }
            writer.shutdown().await.expect("shutdown");
        });

        for envelope in expected {
            let received = reader.recv().await.expect("recv").expect("envelope");
            assert_eq!(received, envelope);
        }
        assert!(reader.recv().await.expect("recv").is_none());
        send_task.await.expect("join");
    }

    #[tokio::test]
    async fn test_garbage_between_messages_is_skipped() {
        let (mut raw, b) = duplex(1024);
        let mut reader = FramedReader::new(b, Delimiter::default());

        let good = encode_frame(
            &Envelope::new(Payload::Connect(SocketEvent::new("z"))),
            &Delimiter::default(),
        )
        .expect("encode");
        raw.write_all(b"garbage\n").await.expect("write");
        raw.write_all(&good).await.expect("write");
        drop(raw);

        let received = reader.recv().await.expect("recv").expect("envelope");
        assert_eq!(received.kind(), crate::event::EventKind::Connect);
        assert!(reader.recv().await.expect("recv").is_none());
    }
}
