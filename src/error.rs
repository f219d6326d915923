//! Error types for the linechat library.

use std::io;
use std::net::SocketAddr;
use std::string::FromUtf8Error;

/// Result type alias for linechat operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the transport, session and lifecycle layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("Line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Server is already running")]
    AlreadyRunning,

    #[error("Connection {0} is closed")]
    ConnectionClosed(SocketAddr),

    #[error("Send queue for {0} is full")]
    SendQueueFull(SocketAddr),

    #[error("Write to {0} timed out")]
    WriteTimeout(SocketAddr),

    #[error("Config error: {0}")]
    Config(String),
}
