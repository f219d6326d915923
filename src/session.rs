//! Per-connection receive loop.
//!
//! ```text
//! ACCEPTED --handshake done--> ACTIVE --marker/EOF/error/close--> CLOSING --> CLOSED
//!     \______________marker/EOF/error/close______________________/
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::watch;

use crate::constants::DISCONNECT_MESSAGE;
use crate::connection::Connection;
use crate::dispatch::Dispatcher;
use crate::framing::FrameReader;
use crate::handshake::Handshake;
use crate::message::{Message, Source};
use crate::registry::Registry;
use crate::router;
use crate::sink::SharedSink;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    Active,
    Closing,
    Closed,
}

/// Shared collaborators every session needs.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Registry,
    pub dispatcher: Dispatcher,
    pub sink: SharedSink,
    pub handshake: Arc<dyn Handshake>,
}

enum ReadEvent {
    Line(String),
    Eof,
    Failed(Error),
    Closed,
}

async fn next_event<R: AsyncRead + Unpin>(
    reader: &mut FrameReader<R>,
    close_signal: &mut watch::Receiver<bool>,
) -> ReadEvent {
    tokio::select! {
        frame = reader.next_frame() => match frame {
            Ok(Some(line)) => ReadEvent::Line(line),
            Ok(None) => ReadEvent::Eof,
            Err(e) => ReadEvent::Failed(e),
        },
        _ = close_signal.wait_for(|closed| *closed) => ReadEvent::Closed,
    }
}

/// Runs a registered connection until it disconnects, then unregisters it.
/// Returns the terminal state, which is always `Closed`.
pub async fn run_session<R: AsyncRead + Unpin>(
    conn: Arc<Connection>,
    mut reader: FrameReader<R>,
    ctx: SessionContext,
) -> SessionState {
    let addr = conn.addr();
    let mut close_signal = conn.close_signal();
    let mut state = SessionState::Accepted;

    ctx.sink.write(&format!("[NEW CONNECTION] {addr} connected."));
    tracing::info!(peer = %addr, "session started");

    let expected = ctx.handshake.expected_lines();
    let mut handshake_lines = Vec::with_capacity(expected);
    while state == SessionState::Accepted && handshake_lines.len() < expected {
        state = match next_event(&mut reader, &mut close_signal).await {
            ReadEvent::Line(line) if line == DISCONNECT_MESSAGE => SessionState::Closing,
            ReadEvent::Line(line) => {
                handshake_lines.push(line);
                SessionState::Accepted
            }
            event => on_end(&ctx, addr, event),
        };
    }
    if state == SessionState::Accepted {
        ctx.handshake.complete(&conn, handshake_lines);
        state = SessionState::Active;
    }

    while state == SessionState::Active {
        state = match next_event(&mut reader, &mut close_signal).await {
            ReadEvent::Line(line) if line == DISCONNECT_MESSAGE => {
                tracing::debug!(peer = %addr, "disconnect marker received");
                SessionState::Closing
            }
            ReadEvent::Line(line) if line.is_empty() => SessionState::Active,
            ReadEvent::Line(line) => {
                relay(&ctx, addr, &line).await;
                SessionState::Active
            }
            event => on_end(&ctx, addr, event),
        };
    }

    debug_assert_eq!(state, SessionState::Closing);
    ctx.registry.remove_if_same(&conn).await;
    conn.close();
    ctx.sink.write(&format!("[DISCONNECT] {addr} disconnected"));
    tracing::info!(peer = %addr, "session closed");

    SessionState::Closed
}

fn on_end(ctx: &SessionContext, addr: SocketAddr, event: ReadEvent) -> SessionState {
    match event {
        ReadEvent::Failed(e) => {
            tracing::warn!(peer = %addr, error = %e, "read failed");
            ctx.sink
                .write(&format!("[ERROR] Connection issue with {addr}: {e}"));
        }
        ReadEvent::Eof => tracing::debug!(peer = %addr, "peer closed the stream"),
        ReadEvent::Closed => tracing::debug!(peer = %addr, "connection closed locally"),
        ReadEvent::Line(_) => {}
    }
    SessionState::Closing
}

async fn relay(ctx: &SessionContext, addr: SocketAddr, line: &str) {
    let resolution = router::resolve(line);
    let message = Message::new(Source::Peer(addr), resolution.payload);

    ctx.sink.write(&message.render());
    let report = ctx.dispatcher.dispatch(&message, &resolution.target).await;
    tracing::debug!(
        peer = %addr,
        target = ?resolution.target,
        delivered = report.delivered,
        failed = report.failed,
        "relayed message"
    );
}
