//! Registry of connected peers and message fan-out.
//!
//! Every peer owns an unbounded outbound queue drained by its session
//! task, so broadcasting never waits on a slow socket.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::identifiers::ClientId;

// ============================================================================
// Peer
// ============================================================================

/// One registered connection.
#[derive(Debug)]
struct Peer {
    /// Display name used as the relay prefix.
    name: String,
    /// Outbound queue into the peer's session task.
    tx: mpsc::UnboundedSender<String>,
}

// ============================================================================
// Hub
// ============================================================================

/// Connected peers keyed by [`ClientId`].
#[derive(Debug, Default)]
pub(crate) struct Hub {
    peers: RwLock<FxHashMap<ClientId, Peer>>,
}

impl Hub {
    /// Creates an empty hub.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a peer and returns the receiving end of its queue.
    pub(crate) fn register(
        &self,
        id: ClientId,
        name: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let name = name.into();

        debug!(client = %name, "Peer registered");
        self.peers.write().insert(id, Peer { name, tx });
        rx
    }

    /// Removes a peer. Returns its name if it was registered.
    pub(crate) fn unregister(&self, id: ClientId) -> Option<String> {
        let removed = self.peers.write().remove(&id);
        removed.map(|peer| {
            debug!(client = %peer.name, "Peer unregistered");
            peer.name
        })
    }

    /// Returns the number of registered peers.
    pub(crate) fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Queues `text` for every peer, including the sender.
    ///
    /// Peers whose session is gone are dropped. Returns the number of
    /// peers the text was queued for.
    pub(crate) fn broadcast(&self, text: &str) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        {
            let peers = self.peers.read();
            for (id, peer) in peers.iter() {
                if peer.tx.send(text.to_owned()).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let mut peers = self.peers.write();
            for id in &dead {
                peers.remove(id);
            }
            debug!(count = dead.len(), "Dropped peers with closed queues");
        }

        trace!(delivered, "Broadcast queued");
        delivered
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_unregister() {
        let hub = Hub::new();
        let id = ClientId::generate();
        let _rx = hub.register(id, "alice");
        assert_eq!(hub.len(), 1);

        assert_eq!(hub.unregister(id).as_deref(), Some("alice"));
        assert_eq!(hub.len(), 0);
        assert_eq!(hub.unregister(id), None);
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let hub = Hub::new();
        let mut a = hub.register(ClientId::generate(), "a");
        let mut b = hub.register(ClientId::generate(), "b");

        assert_eq!(hub.broadcast("a: hi"), 2);
        assert_eq!(a.try_recv().unwrap(), "a: hi");
        assert_eq!(b.try_recv().unwrap(), "a: hi");
    }

    #[test]
    fn test_broadcast_preserves_order_per_peer() {
        let hub = Hub::new();
        let mut rx = hub.register(ClientId::generate(), "a");

        for text in ["1", "2", "3"] {
            hub.broadcast(text);
        }
        let received: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(received, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_broadcast_drops_dead_peers() {
        let hub = Hub::new();
        let _alive = hub.register(ClientId::generate(), "alive");
        let dead = hub.register(ClientId::generate(), "dead");
        drop(dead);

        assert_eq!(hub.broadcast("x"), 1);
        assert_eq!(hub.len(), 1);
    }
}
