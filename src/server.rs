//! Listener lifecycle and the accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::connection::{Connection, Identity};
use crate::constants::DISCONNECT_MESSAGE;
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::framing::Framing;
use crate::message::{Message, Source};
use crate::registry::Registry;
use crate::router;
use crate::session::{SessionContext, run_session};
use crate::sink::SharedSink;
use crate::{Error, Result};

struct Listening {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Snapshot of one registered peer, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub addr: SocketAddr,
    pub identity: Option<Identity>,
}

/// The chat server: owns the registry and controls the listening socket.
///
/// All methods take `&self`, so the server can be shared behind an `Arc`
/// between a front-end and the tasks it drives. It can be started again
/// after [`stop`](ChatServer::stop).
pub struct ChatServer {
    config: ServerConfig,
    registry: Registry,
    dispatcher: Dispatcher,
    sink: SharedSink,
    running: Arc<AtomicBool>,
    listening: Mutex<Option<Listening>>,
}

impl ChatServer {
    pub fn new(config: ServerConfig, sink: SharedSink) -> Self {
        let registry = Registry::new();
        let dispatcher = Dispatcher::new(registry.clone(), sink.clone());
        Self {
            config,
            registry,
            dispatcher,
            sink,
            running: Arc::new(AtomicBool::new(false)),
            listening: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.listening.lock().await.as_ref().map(|l| l.addr)
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn peers(&self) -> Vec<PeerInfo> {
        self.registry
            .snapshot()
            .await
            .iter()
            .map(|c| PeerInfo {
                addr: c.addr(),
                identity: c.identity().cloned(),
            })
            .collect()
    }

    /// Binds the listening socket and spawns the accept loop.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut listening = self.listening.lock().await;
        if listening.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let bind_addr = self.config.listen_addr();
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                tracing::error!(addr = %bind_addr, error = %source, "bind failed");
                self.sink
                    .write(&format!("[ERROR] Could not bind server: {source}"));
                return Err(Error::Bind {
                    addr: bind_addr,
                    source,
                });
            }
        };
        let addr = listener.local_addr()?;

        self.running.store(true, Ordering::SeqCst);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let accept = AcceptLoop {
            listener,
            shutdown: shutdown_rx,
            running: self.running.clone(),
            framing: self.config.framing,
            write_timeout: self.config.write_timeout(),
            ctx: SessionContext {
                registry: self.registry.clone(),
                dispatcher: self.dispatcher.clone(),
                sink: self.sink.clone(),
                handshake: self.config.handshake.hook(),
            },
        };
        let handle = tokio::spawn(accept.run());

        *listening = Some(Listening {
            addr,
            shutdown,
            handle,
        });

        tracing::info!(%addr, "server started");
        self.sink.write(&format!("[SERVER STARTED] listening on {addr}"));
        Ok(addr)
    }

    /// Stops accepting, queues the disconnect marker to every registered
    /// connection and closes it. Each writer sends what is queued before it
    /// shuts the stream down. Stopping a stopped server is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let Some(listening) = self.listening.lock().await.take() else {
            return Ok(());
        };

        self.running.store(false, Ordering::SeqCst);
        self.sink.write("[SERVER STOPPING]");

        // The loop may already have exited after an accept failure
        let _ = listening.shutdown.send(true);
        if let Err(e) = listening.handle.await {
            tracing::error!(error = %e, "accept loop task failed");
        }

        let connections = self.registry.drain().await;
        let count = connections.len();
        for conn in connections {
            if let Err(e) = conn.send(DISCONNECT_MESSAGE) {
                tracing::warn!(peer = %conn.addr(), error = %e, "disconnect marker not delivered");
                self.sink
                    .write(&format!("[ERROR] Error disconnecting client: {e}"));
            }
            conn.close();
        }

        tracing::info!(disconnected = count, "server stopped");
        self.sink.write("[SERVER STOPPED]");
        Ok(())
    }

    /// Sends operator text to peers under the `SERVER` label. An address
    /// prefix narrows delivery the same way it does for peers.
    pub async fn broadcast_from_server(&self, text: &str) -> DispatchReport {
        let resolution = router::resolve(text);
        let message = Message::new(Source::Server, resolution.payload);
        self.sink.write(&format!("[BROADCAST] {message}"));
        self.dispatcher
            .dispatch(&message, &resolution.target)
            .await
    }
}

struct AcceptLoop {
    listener: TcpListener,
    shutdown: watch::Receiver<bool>,
    running: Arc<AtomicBool>,
    framing: Framing,
    write_timeout: Duration,
    ctx: SessionContext,
}

impl AcceptLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr).await,
                    Err(e) => {
                        if self.running.swap(false, Ordering::SeqCst) {
                            tracing::error!(error = %e, "accept failed, no longer accepting");
                            self.ctx
                                .sink
                                .write(&format!("[ERROR] Error accepting client: {e}"));
                        }
                        break;
                    }
                },
            }
        }
        tracing::debug!("accept loop exited");
    }

    async fn admit(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = %addr, error = %e, "could not set TCP_NODELAY");
        }
        let (read_half, write_half) = stream.into_split();

        let conn = Arc::new(Connection::new(
            addr,
            Box::new(write_half),
            self.framing,
            self.write_timeout,
        ));
        self.ctx.registry.add(conn.clone()).await;

        let reader = self.framing.reader(read_half);
        tokio::spawn(run_session(conn, reader, self.ctx.clone()));
    }
}
