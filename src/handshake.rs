//! Optional pre-chat handshake.
//!
//! Some front-ends send a fixed number of identification lines before
//! regular chat starts. The session reads exactly `expected_lines()` lines
//! and hands them to the hook before relaying anything.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::connection::{Connection, Identity};

pub trait Handshake: Send + Sync {
    fn expected_lines(&self) -> usize;

    /// Called once with exactly `expected_lines()` lines.
    fn complete(&self, conn: &Connection, lines: Vec<String>);
}

/// Chat begins with the first line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHandshake;

impl Handshake for NoHandshake {
    fn expected_lines(&self) -> usize {
        0
    }

    fn complete(&self, _conn: &Connection, _lines: Vec<String>) {}
}

/// First line is the display name, second the e-mail address.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameEmailHandshake;

impl Handshake for NameEmailHandshake {
    fn expected_lines(&self) -> usize {
        2
    }

    fn complete(&self, conn: &Connection, lines: Vec<String>) {
        let mut lines = lines.into_iter().map(|l| l.trim().to_string());
        let name = lines.next().unwrap_or_default();
        let email = lines.next().filter(|e| !e.is_empty());

        if name.is_empty() {
            tracing::warn!(peer = %conn.addr(), "handshake without a name");
            return;
        }

        tracing::info!(peer = %conn.addr(), name = %name, "peer identified");
        if !conn.set_identity(Identity { name, email }) {
            tracing::warn!(peer = %conn.addr(), "identity already set");
        }
    }
}

/// Handshake selection for configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeKind {
    #[default]
    None,
    NameEmail,
}

impl HandshakeKind {
    pub fn hook(self) -> Arc<dyn Handshake> {
        match self {
            HandshakeKind::None => Arc::new(NoHandshake),
            HandshakeKind::NameEmail => Arc::new(NameEmailHandshake),
        }
    }
}
