//! Timeout-bounded buffered I/O.
//!
//! All input lands in a single `BytesMut`. Two primitives sit on top of it:
//! [`ResponseReader::read_until`] keeps reading until a scanner recognises a
//! marker in the accumulated bytes, and [`ResponseReader::read_exact`] keeps
//! reading until a given number of bytes is available. Both give up when their
//! deadline passes or the peer closes, which callers treat as "no more data".

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};
use tracing::trace;

use crate::{Error, Result};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Upper bound on buffered input while waiting for a marker.
const MAX_PENDING_RESPONSE: usize = 16 * 1024 * 1024; // 16 MB

/// Buffered reader/writer over an IMAP stream.
pub struct ResponseReader<S> {
    stream: S,
    buffer: BytesMut,
    closed: bool,
}

impl<S> ResponseReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            closed: false,
        }
    }

    /// Writes a complete command and flushes it.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads until `scan` recognises something in the buffered input.
    ///
    /// The scanner sees everything buffered so far, including bytes left over
    /// from earlier reads, and is re-run after every chunk. Returns `None`
    /// when `timeout` elapses or the peer closes first. Nothing is consumed;
    /// callers decide how much of the buffer the match covers.
    pub async fn read_until<T, F>(&mut self, timeout: Duration, mut scan: F) -> Result<Option<T>>
    where
        F: FnMut(&[u8]) -> Option<T>,
    {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(found) = scan(&self.buffer) {
                return Ok(Some(found));
            }

            if self.buffer.len() > MAX_PENDING_RESPONSE {
                return Err(Error::Protocol(format!(
                    "response exceeds {MAX_PENDING_RESPONSE} bytes without completing"
                )));
            }

            if !self.fill(deadline).await? {
                return Ok(None);
            }
        }
    }

    /// Reads until at least `n` bytes are buffered, then takes exactly `n`.
    ///
    /// Bytes beyond `n` stay buffered for the next read. `timeout` bounds each
    /// individual read, so a large literal arriving steadily is never cut off.
    /// Returns `None` when a read stalls past `timeout` or the peer closes.
    pub async fn read_exact(&mut self, n: usize, timeout: Duration) -> Result<Option<Bytes>> {
        self.buffer.reserve(n.saturating_sub(self.buffer.len()));

        while self.buffer.len() < n {
            if !self.fill(Instant::now() + timeout).await? {
                return Ok(None);
            }
        }

        Ok(Some(self.buffer.split_to(n).freeze()))
    }

    /// Discards the first `n` buffered bytes.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buffer.len());
        let _ = self.buffer.split_to(n);
    }

    /// Returns the bytes buffered but not yet consumed.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns true once the peer has closed its side.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Shuts down the write half of the stream, ignoring errors.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            trace!(error = %e, "shutdown failed");
        }
    }

    /// Pulls one chunk from the stream.
    ///
    /// Returns `false` on timeout or end of stream.
    async fn fill(&mut self, deadline: Instant) -> Result<bool> {
        if self.buffer.capacity() - self.buffer.len() < DEFAULT_BUFFER_SIZE / 2 {
            self.buffer.reserve(DEFAULT_BUFFER_SIZE);
        }

        match timeout_at(deadline, self.stream.read_buf(&mut self.buffer)).await {
            Ok(Ok(0)) => {
                trace!("peer closed the stream");
                self.closed = true;
                Ok(false)
            }
            Ok(Ok(n)) => {
                trace!(bytes = n, buffered = self.buffer.len(), "read chunk");
                Ok(true)
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use tokio_test::io::Builder;

    fn find_newline(buf: &[u8]) -> Option<usize> {
        buf.iter().position(|&b| b == b'\n')
    }

    #[tokio::test]
    async fn test_read_until_across_chunks() {
        let mock = Builder::new().read(b"* OK ser").read(b"ver ready\r\n").build();
        let mut reader = ResponseReader::new(mock);

        let pos = reader
            .read_until(Duration::from_secs(1), find_newline)
            .await
            .unwrap();
        assert_eq!(pos, Some(18));
        assert_eq!(reader.buffered(), b"* OK server ready\r\n");
    }

    #[tokio::test]
    async fn test_read_until_eof_is_none() {
        let mock = Builder::new().read(b"no newline here").build();
        let mut reader = ResponseReader::new(mock);

        let pos = reader
            .read_until(Duration::from_secs(1), find_newline)
            .await
            .unwrap();
        assert_eq!(pos, None);
        assert!(reader.is_closed());
    }

    #[tokio::test]
    async fn test_read_exact_keeps_remainder() {
        let mock = Builder::new().read(b"hello").read(b" world\r\nA1 OK\r\n").build();
        let mut reader = ResponseReader::new(mock);

        let bytes = reader
            .read_exact(11, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&bytes[..], b"hello world");
        assert_eq!(reader.buffered(), b"\r\nA1 OK\r\n");
    }

    #[tokio::test]
    async fn test_read_exact_short_stream_is_none() {
        let mock = Builder::new().read(b"abc").build();
        let mut reader = ResponseReader::new(mock);

        let bytes = reader.read_exact(10, Duration::from_secs(1)).await.unwrap();
        assert!(bytes.is_none());
    }

    #[tokio::test]
    async fn test_consume() {
        let mock = Builder::new().read(b"line one\nline two\n").build();
        let mut reader = ResponseReader::new(mock);

        let pos = reader
            .read_until(Duration::from_secs(1), find_newline)
            .await
            .unwrap()
            .unwrap();
        reader.consume(pos + 1);
        assert_eq!(reader.buffered(), b"line two\n");

        reader.consume(1000);
        assert!(reader.buffered().is_empty());
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new().write(b"A1 LOGOUT\r\n").build();
        let mut reader = ResponseReader::new(mock);

        reader.write_command(b"A1 LOGOUT\r\n").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_until_times_out_on_silent_peer() {
        let (client, _server) = duplex(64);
        let mut reader = ResponseReader::new(client);

        let pos = reader
            .read_until(Duration::from_secs(5), find_newline)
            .await
            .unwrap();
        assert_eq!(pos, None);
        assert!(!reader.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_exact_times_out_with_partial_data() {
        let (client, mut server) = duplex(64);
        server.write_all(b"partial").await.unwrap();
        let mut reader = ResponseReader::new(client);

        let bytes = reader.read_exact(100, Duration::from_secs(5)).await.unwrap();
        assert!(bytes.is_none());
        assert_eq!(reader.buffered(), b"partial");
    }
}
