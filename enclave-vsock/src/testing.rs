//! In-memory connection for exercising readers and writers without a socket

use parking_lot::Mutex;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Default)]
struct MockState {
    read_data: Vec<u8>,
    written: Vec<u8>,
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
    closed: bool,
    shutdown_calls: usize,
    write_calls: usize,
}

/// Scripted duplex connection.
///
/// Reads drain the bytes supplied up front and then report end of stream.
/// Writes are captured for inspection. Clones share state, so a test can
/// keep one handle while the reader or writer owns another.
#[derive(Debug, Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    /// Create a connection with nothing to read
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connection that will yield `data` to readers
    pub fn with_read_data(data: impl Into<Vec<u8>>) -> Self {
        let conn = Self::new();
        conn.state.lock().read_data = data.into();
        conn
    }

    /// Create a connection whose writes always fail with `kind`
    pub fn failing_writes(kind: io::ErrorKind) -> Self {
        let conn = Self::new();
        conn.set_write_error(Some(kind));
        conn
    }

    /// Append bytes for subsequent reads
    pub fn push_read_data(&self, data: &[u8]) {
        self.state.lock().read_data.extend_from_slice(data);
    }

    /// Fail reads with `kind` while data remains
    pub fn set_read_error(&self, kind: Option<io::ErrorKind>) {
        self.state.lock().read_error = kind;
    }

    /// Fail writes with `kind`
    pub fn set_write_error(&self, kind: Option<io::ErrorKind>) {
        self.state.lock().write_error = kind;
    }

    /// Everything written so far
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().written.clone()
    }

    /// Bytes not yet consumed by reads
    pub fn remaining_read(&self) -> usize {
        self.state.lock().read_data.len()
    }

    /// Number of write calls that reached the connection
    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }

    /// Whether shutdown has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of shutdown calls
    pub fn shutdown_count(&self) -> usize {
        self.state.lock().shutdown_calls
    }
}

impl AsyncRead for MockConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut state = self.state.lock();
        if state.closed || state.read_data.is_empty() {
            return Poll::Ready(Ok(()));
        }
        if let Some(kind) = state.read_error {
            return Poll::Ready(Err(kind.into()));
        }

        let n = buf.remaining().min(state.read_data.len());
        buf.put_slice(&state.read_data[..n]);
        state.read_data.drain(..n);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = self.state.lock();
        state.write_calls += 1;
        if state.closed {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection closed",
            )));
        }
        if let Some(kind) = state.write_error {
            return Poll::Ready(Err(kind.into()));
        }

        state.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut state = self.state.lock();
        state.closed = true;
        state.shutdown_calls += 1;
        Poll::Ready(Ok(()))
    }
}
