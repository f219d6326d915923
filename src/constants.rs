//! Wire protocol constants.

use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5050;

/// Sent by either side to end a connection voluntarily.
pub const DISCONNECT_MESSAGE: &str = "!DISCONNECT";

/// Address token that targets every peer except the sender.
pub const BROADCAST_TOKEN: &str = "all";

/// Source label used for operator broadcasts.
pub const SERVER_LABEL: &str = "SERVER";

/// Bytes consumed by a single read in chunk framing.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Longest accepted line in line framing.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages that may wait for one peer's writer before sends to it fail.
pub const OUTBOUND_QUEUE_LEN: usize = 256;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
