//! Display sinks: where user-facing log and chat lines are rendered.

use std::sync::Arc;

use tokio::sync::mpsc;

/// Receives rendered lines. Implementations must not block.
pub trait DisplaySink: Send + Sync {
    fn write(&self, line: &str);
}

pub type SharedSink = Arc<dyn DisplaySink>;

/// Forwards lines over an unbounded channel, e.g. to a terminal UI.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DisplaySink for ChannelSink {
    fn write(&self, line: &str) {
        // Receiver gone means the UI has shut down
        let _ = self.tx.send(line.to_string());
    }
}

/// Emits every line as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DisplaySink for TracingSink {
    fn write(&self, line: &str) {
        tracing::info!(target: "linechat::display", "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_lines() {
        let (sink, mut rx) = ChannelSink::new();
        sink.write("one");
        sink.write("two");
        assert_eq!(rx.try_recv().unwrap(), "one");
        assert_eq!(rx.try_recv().unwrap(), "two");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.write("nobody listening");
    }
}
