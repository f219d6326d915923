//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_WRITE_TIMEOUT};
use crate::framing::Framing;
use crate::handshake::HandshakeKind;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host or IP to listen on
    pub host: String,

    /// Port to listen on (0 picks a free port)
    pub port: u16,

    /// How messages are delimited on the wire
    pub framing: Framing,

    /// Per-target write timeout in milliseconds
    pub write_timeout_ms: u64,

    /// Lines expected from a client before chat begins
    pub handshake: HandshakeKind,

    /// Where the console server writes its diagnostic log
    pub log_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            framing: Framing::default(),
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT.as_millis() as u64,
            handshake: HandshakeKind::None,
            log_file: "linechat-server.log".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)
        } else {
            Ok(ServerConfig::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(ServerConfig::parse("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let config = ServerConfig::parse(
            r#"
            host = "0.0.0.0"
            port = 6000
            write_timeout_ms = 250
            handshake = "name_email"

            [framing]
            mode = "lines"
            max_len = 4096
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr(), "0.0.0.0:6000");
        assert_eq!(config.write_timeout(), Duration::from_millis(250));
        assert_eq!(config.handshake, HandshakeKind::NameEmail);
        assert_eq!(config.framing, Framing::Lines { max_len: 4096 });
    }

    #[test]
    fn test_chunk_size_defaults() {
        let config = ServerConfig::parse("[framing]\nmode = \"chunk\"\n").unwrap();
        assert_eq!(config.framing, Framing::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            ServerConfig::parse("port = \"not a number\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = ServerConfig::load_or_default("does-not-exist.toml").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
