//! Client side of the protocol.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::constants::DISCONNECT_MESSAGE;
use crate::framing::{FrameReader, Framing};
use crate::sink::SharedSink;
use crate::Result;

/// Why a receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveEnd {
    /// The server sent the disconnect marker.
    ServerDisconnected,
    /// The stream reached end of file.
    Eof,
    /// A read failed.
    Failed,
}

/// Sending half of a chat connection.
pub struct ChatClient {
    local_addr: SocketAddr,
    writer: OwnedWriteHalf,
    framing: Framing,
}

impl ChatClient {
    /// Connects and returns the client plus a reader for inbound messages.
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        framing: Framing,
    ) -> Result<(Self, FrameReader<OwnedReadHalf>)> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let local_addr = stream.local_addr()?;
        let (read_half, writer) = stream.into_split();

        let client = Self {
            local_addr,
            writer,
            framing,
        };
        Ok((client, framing.reader(read_half)))
    }

    /// Address the server knows this client by.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sends one line of user input.
    pub async fn submit_line(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(&self.framing.encode(text)).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Sends the name and e-mail lines expected by a server configured
    /// with the name/e-mail handshake.
    pub async fn handshake(&mut self, name: &str, email: &str) -> Result<()> {
        self.submit_line(name).await?;
        self.submit_line(email).await
    }

    /// Sends the disconnect marker and closes the write side.
    pub async fn disconnect(mut self) -> Result<()> {
        self.submit_line(DISCONNECT_MESSAGE).await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Writes every inbound message to `sink` until the server disconnects,
/// the stream ends, or a read fails.
pub async fn receive_loop<R: AsyncRead + Unpin>(
    mut reader: FrameReader<R>,
    sink: SharedSink,
) -> ReceiveEnd {
    loop {
        match reader.next_frame().await {
            Ok(Some(line)) if line == DISCONNECT_MESSAGE => {
                sink.write("[DISCONNECTED] Server closed the connection");
                return ReceiveEnd::ServerDisconnected;
            }
            Ok(Some(line)) => sink.write(&line),
            Ok(None) => return ReceiveEnd::Eof,
            Err(e) => {
                tracing::debug!(error = %e, "receive failed");
                sink.write(&format!("[ERROR] Failed to receive message: {e}"));
                return ReceiveEnd::Failed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_receive_loop_stops_on_marker() {
        let data: &[u8] = b"2024-01-01 00:00:00 [SERVER] hi\n!DISCONNECT\nnever seen\n";
        let (sink, mut rx) = ChannelSink::new();
        let end = receive_loop(Framing::lines().reader(data), Arc::new(sink)).await;

        assert_eq!(end, ReceiveEnd::ServerDisconnected);
        assert_eq!(rx.try_recv().unwrap(), "2024-01-01 00:00:00 [SERVER] hi");
        assert!(rx.try_recv().unwrap().starts_with("[DISCONNECTED]"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_receive_loop_eof() {
        let data: &[u8] = b"";
        let (sink, _rx) = ChannelSink::new();
        let end = receive_loop(Framing::lines().reader(data), Arc::new(sink)).await;
        assert_eq!(end, ReceiveEnd::Eof);
    }
}
