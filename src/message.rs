//! Outbound chat messages and their rendered line format.

use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Local};

use crate::constants::{SERVER_LABEL, TIMESTAMP_FORMAT};

/// Who a message originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Peer(SocketAddr),
    Server,
}

impl Source {
    /// Address of the sending peer, if any. The dispatcher never delivers a
    /// message back to this address.
    pub fn peer(&self) -> Option<SocketAddr> {
        match self {
            Source::Peer(addr) => Some(*addr),
            Source::Server => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Peer(addr) => write!(f, "{addr}"),
            Source::Server => f.write_str(SERVER_LABEL),
        }
    }
}

/// A single immutable line of chat text, stamped at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub timestamp: DateTime<Local>,
    pub source: Source,
    pub payload: String,
}

impl Message {
    pub fn new(source: Source, payload: impl Into<String>) -> Self {
        Self::at(Local::now(), source, payload)
    }

    pub fn at(timestamp: DateTime<Local>, source: Source, payload: impl Into<String>) -> Self {
        Self {
            timestamp,
            source,
            payload: payload.into(),
        }
    }

    /// `<timestamp> [<source>] <payload>`
    pub fn render(&self) -> String {
        format!(
            "{} [{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.source,
            self.payload
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
