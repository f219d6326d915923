//! Delivery of a message to its resolved targets.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::connection::Connection;
use crate::message::Message;
use crate::registry::Registry;
use crate::router::Target;
use crate::sink::SharedSink;

/// Outcome of one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Hands messages to registered connections.
///
/// Dispatch only queues onto each target's writer and never waits for a
/// socket, so a stalled peer cannot hold up other targets or the sender.
/// A target whose queue is closed or full is logged and counted as failed.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Registry,
    sink: SharedSink,
}

impl Dispatcher {
    pub fn new(registry: Registry, sink: SharedSink) -> Self {
        Self { registry, sink }
    }

    /// Delivers `message` to the connections `target` names, skipping the
    /// message's own sender.
    pub async fn dispatch(&self, message: &Message, target: &Target) -> DispatchReport {
        let snapshot = self.registry.snapshot().await;
        let targets = select_targets(snapshot, target, message.source.peer());

        if targets.is_empty() {
            if let Target::One(token) = target {
                tracing::debug!(token = %token, "no registered connection matches target");
            }
            return DispatchReport::default();
        }

        let line = message.render();
        let mut report = DispatchReport::default();
        for conn in targets {
            match conn.send(&line) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(peer = %conn.addr(), error = %e, "delivery failed");
                    self.sink
                        .write(&format!("[ERROR] Error sending to {}: {e}", conn.addr()));
                }
            }
        }
        report
    }
}

/// Filters a registry snapshot down to the connections `target` names.
pub fn select_targets(
    snapshot: Vec<Arc<Connection>>,
    target: &Target,
    exclude: Option<SocketAddr>,
) -> Vec<Arc<Connection>> {
    match target {
        Target::All | Target::Unaddressed => snapshot
            .into_iter()
            .filter(|c| Some(c.addr()) != exclude)
            .collect(),
        Target::One(token) => {
            let by_addr = snapshot.iter().find(|c| c.has_identifier(token));
            let found = by_addr.or_else(|| snapshot.iter().find(|c| c.name() == Some(token.as_str())));
            found.cloned().into_iter().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Identity;
    use crate::message::Source;
    use crate::constants::DEFAULT_WRITE_TIMEOUT;
    use crate::framing::Framing;

    fn conn(addr: &str) -> Arc<Connection> {
        Arc::new(Connection::new(
            addr.parse().unwrap(),
            Box::new(tokio::io::sink()),
            Framing::default(),
            DEFAULT_WRITE_TIMEOUT,
        ))
    }

    fn addrs(conns: &[Arc<Connection>]) -> Vec<SocketAddr> {
        let mut v: Vec<_> = conns.iter().map(|c| c.addr()).collect();
        v.sort();
        v
    }

    #[tokio::test]
    async fn test_all_excludes_sender() {
        let (a, b, c) = (conn("127.0.0.1:1"), conn("127.0.0.1:2"), conn("127.0.0.1:3"));
        let snap = vec![a.clone(), b.clone(), c.clone()];
        let picked = select_targets(snap, &Target::All, Some(a.addr()));
        assert_eq!(addrs(&picked), vec![b.addr(), c.addr()]);
    }

    #[tokio::test]
    async fn test_unaddressed_behaves_like_all() {
        let (a, b) = (conn("127.0.0.1:1"), conn("127.0.0.1:2"));
        let picked = select_targets(vec![a.clone(), b.clone()], &Target::Unaddressed, None);
        assert_eq!(addrs(&picked), vec![a.addr(), b.addr()]);
    }

    #[tokio::test]
    async fn test_one_by_address() {
        let (a, b) = (conn("127.0.0.1:1"), conn("127.0.0.1:2"));
        let target = Target::One("127.0.0.1:2".into());
        let picked = select_targets(vec![a, b.clone()], &target, None);
        assert_eq!(addrs(&picked), vec![b.addr()]);
    }

    #[tokio::test]
    async fn test_one_by_name() {
        let (a, b) = (conn("127.0.0.1:1"), conn("127.0.0.1:2"));
        b.set_identity(Identity {
            name: "bob".into(),
            email: None,
        });
        let picked = select_targets(vec![a, b.clone()], &Target::One("bob".into()), None);
        assert_eq!(addrs(&picked), vec![b.addr()]);
    }

    #[tokio::test]
    async fn test_dispatch_skips_sender() {
        let registry = Registry::new();
        let (sink, mut log) = crate::sink::ChannelSink::new();
        let dispatcher = Dispatcher::new(registry.clone(), Arc::new(sink));
        let (a, b) = (conn("127.0.0.1:1"), conn("127.0.0.1:2"));
        registry.add(a.clone()).await;
        registry.add(b).await;

        let from_a = Message::new(Source::Peer(a.addr()), "hi");
        let report = dispatcher.dispatch(&from_a, &Target::All).await;
        assert_eq!(report, DispatchReport { delivered: 1, failed: 0 });

        let from_server = Message::new(Source::Server, "hi");
        let report = dispatcher.dispatch(&from_server, &Target::Unaddressed).await;
        assert_eq!(report.delivered, 2);
        assert!(log.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_target_counts_as_failed() {
        let registry = Registry::new();
        let (sink, mut log) = crate::sink::ChannelSink::new();
        let dispatcher = Dispatcher::new(registry.clone(), Arc::new(sink));
        let (a, b) = (conn("127.0.0.1:1"), conn("127.0.0.1:2"));
        b.close();
        registry.add(a).await;
        registry.add(b).await;

        let report = dispatcher
            .dispatch(&Message::new(Source::Server, "hi"), &Target::All)
            .await;
        assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });
        assert!(log.try_recv().unwrap().starts_with("[ERROR] Error sending to 127.0.0.1:2"));
    }

    #[tokio::test]
    async fn test_one_unknown_is_empty() {
        let a = conn("127.0.0.1:1");
        let picked = select_targets(vec![a], &Target::One("10.9.9.9:1".into()), None);
        assert!(picked.is_empty());
    }
}
