//! A single accepted peer connection.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;

use crate::constants::OUTBOUND_QUEUE_LEN;
use crate::framing::Framing;
use crate::{Error, Result};

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Self-declared identity from the optional pre-session handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: Option<String>,
}

/// The write side of one peer plus its close signal.
///
/// The address is fixed at accept time and is the connection's identity in
/// the registry. Outbound messages go through a bounded queue to a writer
/// task that owns the stream, so a frame is always written whole and
/// concurrent senders never interleave within one message.
pub struct Connection {
    addr: SocketAddr,
    framing: Framing,
    tx: mpsc::Sender<Bytes>,
    closed: Arc<watch::Sender<bool>>,
    identity: OnceLock<Identity>,
}

impl Connection {
    /// Spawns the writer task for `writer`; must be called inside a Tokio
    /// runtime. A write that does not finish within `write_timeout` closes
    /// the connection.
    pub fn new(
        addr: SocketAddr,
        writer: BoxedWriter,
        framing: Framing,
        write_timeout: Duration,
    ) -> Self {
        let (closed, close_signal) = watch::channel(false);
        let closed = Arc::new(closed);
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_LEN);

        let writer_task = OutboundWriter {
            addr,
            writer,
            rx,
            close_signal,
            write_timeout,
        };
        tokio::spawn(writer_task.run(closed.clone()));

        Self {
            addr,
            framing,
            tx,
            closed,
            identity: OnceLock::new(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Textual `host:port` form peers use to address this connection.
    pub fn identifier(&self) -> String {
        self.addr.to_string()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    pub fn name(&self) -> Option<&str> {
        self.identity.get().map(|i| i.name.as_str())
    }

    /// Sets the identity once. Returns false if one was already set.
    pub fn set_identity(&self, identity: Identity) -> bool {
        self.identity.set(identity).is_ok()
    }

    /// True if `token` is this connection's address identifier.
    pub fn has_identifier(&self, token: &str) -> bool {
        self.identifier() == token
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Receiver that flips to `true` once the connection is closed.
    pub fn close_signal(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    /// Queues one framed message for the peer without waiting for the
    /// write.
    pub fn send(&self, text: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed(self.addr));
        }
        self.tx
            .try_send(self.framing.encode(text))
            .map_err(|e| match e {
                TrySendError::Full(_) => Error::SendQueueFull(self.addr),
                TrySendError::Closed(_) => Error::ConnectionClosed(self.addr),
            })
    }

    /// Marks the connection closed and wakes the owning session. Messages
    /// already queued are still written before the stream is shut down.
    /// Returns true only for the call that actually closed the connection.
    pub fn close(&self) -> bool {
        !self.closed.send_replace(true)
    }
}

/// Owns the write half and drains the outbound queue.
struct OutboundWriter {
    addr: SocketAddr,
    writer: BoxedWriter,
    rx: mpsc::Receiver<Bytes>,
    close_signal: watch::Receiver<bool>,
    write_timeout: Duration,
}

impl OutboundWriter {
    async fn run(mut self, closed: Arc<watch::Sender<bool>>) {
        let addr = self.addr;
        if let Err(e) = self.drain().await {
            tracing::warn!(peer = %addr, error = %e, "write failed, closing connection");
        }
        closed.send_replace(true);

        match tokio::time::timeout(self.write_timeout, self.writer.shutdown()).await {
            Ok(Err(e)) => tracing::debug!(peer = %addr, error = %e, "shutdown after close failed"),
            Err(_) => tracing::debug!(peer = %addr, "shutdown after close timed out"),
            Ok(Ok(())) => {}
        }
    }

    /// Writes queued frames until the connection is closed and the queue is
    /// empty.
    async fn drain(&mut self) -> Result<()> {
        let (addr, write_timeout) = (self.addr, self.write_timeout);
        loop {
            let frame = tokio::select! {
                biased;
                frame = self.rx.recv() => frame,
                _ = self.close_signal.changed() => None,
            };
            let Some(frame) = frame else {
                return Ok(());
            };

            let writer = &mut self.writer;
            let write = async move {
                writer.write_all(&frame).await?;
                writer.flush().await
            };
            match tokio::time::timeout(write_timeout, write).await {
                Ok(result) => result?,
                Err(_) => return Err(Error::WriteTimeout(addr)),
            }
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("closed", &self.is_closed())
            .field("identity", &self.identity.get())
            .finish()
    }
}
