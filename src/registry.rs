//! The set of live connections.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::connection::Connection;

/// Live connections keyed by peer address.
///
/// Every operation holds the lock only for the membership change itself.
/// Callers that need to do I/O take a [`snapshot`](Registry::snapshot) and
/// iterate it unlocked.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<HashMap<SocketAddr, Arc<Connection>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection.
    ///
    /// # Panics
    ///
    /// If a connection with the same address is already registered. The
    /// registered connection is left in place.
    pub async fn add(&self, conn: Arc<Connection>) {
        let addr = conn.addr();
        let inserted = match self.inner.lock().await.entry(addr) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(conn);
                true
            }
        };
        assert!(inserted, "connection {addr} registered twice");
    }

    /// Removes a connection. Removing an absent address is a no-op.
    pub async fn remove(&self, addr: SocketAddr) -> Option<Arc<Connection>> {
        self.inner.lock().await.remove(&addr)
    }

    /// Removes `conn` only if it is still the member registered under its
    /// address. A later connection that reuses the address is left alone.
    pub async fn remove_if_same(&self, conn: &Arc<Connection>) -> bool {
        let mut members = self.inner.lock().await;
        match members.get(&conn.addr()) {
            Some(current) if Arc::ptr_eq(current, conn) => {
                members.remove(&conn.addr());
                true
            }
            _ => false,
        }
    }

    /// Point-in-time copy of the members, in no particular order.
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.inner.lock().await.values().cloned().collect()
    }

    /// Removes and returns every member.
    pub async fn drain(&self) -> Vec<Arc<Connection>> {
        self.inner.lock().await.drain().map(|(_, c)| c).collect()
    }

    pub async fn contains(&self, addr: SocketAddr) -> bool {
        self.inner.lock().await.contains_key(&addr)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
