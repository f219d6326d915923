//! # linechat
//!
//! A line-oriented TCP chat relay.
//!
//! Peers connect over plain TCP and send text lines. A line starting with
//! `@all:` goes to every other peer, `@<host:port>:` goes to one peer, and
//! anything else is broadcast. The literal `!DISCONNECT` ends a session.
//! The server side is [`server::ChatServer`]; [`client::ChatClient`] is
//! the thin client used by the terminal front-end.

pub mod client;
pub mod config;
pub mod connection;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod sink;

pub use error::{Error, Result};
pub use framing::Framing;
pub use server::ChatServer;
pub use sink::{DisplaySink, SharedSink};
