//! Message framing on the byte stream.
//!
//! `Chunk` is the classic behaviour of this protocol: every read call yields
//! at most `size` bytes and the result is treated as exactly one message, so
//! long messages get split and back-to-back messages may coalesce. `Lines`
//! uses `\n` as an explicit delimiter.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_LINE_LEN};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Framing {
    Chunk {
        #[serde(default = "default_chunk_size")]
        size: usize,
    },
    Lines {
        #[serde(default = "default_max_line_len")]
        max_len: usize,
    },
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_line_len() -> usize {
    DEFAULT_MAX_LINE_LEN
}

impl Default for Framing {
    fn default() -> Self {
        Framing::Chunk {
            size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Framing {
    pub fn lines() -> Self {
        Framing::Lines {
            max_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    /// Parses `chunk` or `lines` (used for env-based client configuration).
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chunk" => Ok(Framing::default()),
            "lines" => Ok(Framing::lines()),
            other => Err(Error::Config(format!("unknown framing mode: {other}"))),
        }
    }

    /// Wire bytes for one outbound message.
    pub fn encode(&self, text: &str) -> Bytes {
        match self {
            Framing::Chunk { .. } => Bytes::copy_from_slice(text.as_bytes()),
            Framing::Lines { .. } => {
                let mut buf = BytesMut::with_capacity(text.len() + 1);
                buf.put_slice(text.as_bytes());
                buf.put_u8(b'\n');
                buf.freeze()
            }
        }
    }

    pub fn reader<R: AsyncRead + Unpin>(&self, reader: R) -> FrameReader<R> {
        FrameReader::new(reader, *self)
    }
}

enum Inner<R> {
    Chunk { reader: R, buf: Vec<u8> },
    Lines { reader: BufReader<R>, max_len: usize },
}

/// Reads one message at a time from a stream.
pub struct FrameReader<R> {
    inner: Inner<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, framing: Framing) -> Self {
        let inner = match framing {
            Framing::Chunk { size } => Inner::Chunk {
                reader,
                buf: vec![0; size.max(1)],
            },
            Framing::Lines { max_len } => Inner::Lines {
                reader: BufReader::new(reader),
                max_len,
            },
        };
        Self { inner }
    }

    /// Next message with any trailing CR/LF removed, or `None` at end of
    /// stream.
    pub async fn next_frame(&mut self) -> Result<Option<String>> {
        let bytes = match &mut self.inner {
            Inner::Chunk { reader, buf } => {
                let n = reader.read(buf).await?;
                if n == 0 {
                    return Ok(None);
                }
                buf[..n].to_vec()
            }
            Inner::Lines { reader, max_len } => {
                let mut line = Vec::new();
                let limit = *max_len as u64 + 1;
                let n = (&mut *reader).take(limit).read_until(b'\n', &mut line).await?;
                if n == 0 {
                    return Ok(None);
                }
                if line.last() != Some(&b'\n') && n > *max_len {
                    return Err(Error::LineTooLong { limit: *max_len });
                }
                line
            }
        };

        let text = String::from_utf8(bytes)?;
        Ok(Some(text.trim_end_matches(['\r', '\n']).to_string()))
    }
}
