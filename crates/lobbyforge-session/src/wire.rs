//! The outbound push contract.
//!
//! The lobby never blocks on network writes: [`Wire::send`] is
//! fire-and-forget, and delivery to a vanished peer is a no-op decided by
//! the transport. [`Wire::is_connected`] exists for the login race guard
//! and for hydration results that arrive after their requester left —
//! it is advisory, a peer can still vanish between the check and the send.

use std::collections::HashSet;
use std::sync::Mutex;

use lobbyforge_protocol::{PeerId, ServerRpc};

/// Push side of the transport, as seen from the lobby.
pub trait Wire: Send + Sync + 'static {
    /// Queues one message toward `peer`. Never blocks, never fails from
    /// the caller's point of view.
    fn send(&self, peer: PeerId, rpc: ServerRpc);

    /// Whether `peer` still has a live connection.
    fn is_connected(&self, peer: PeerId) -> bool;
}

/// A [`Wire`] that records every send, for tests and the demo binary.
///
/// Peers are considered connected until [`RecordingWire::disconnect`] is
/// called for them. Sends to disconnected peers are still recorded so a
/// test can assert they never happen.
#[derive(Default)]
pub struct RecordingWire {
    sent: Mutex<Vec<(PeerId, ServerRpc)>>,
    gone: Mutex<HashSet<PeerId>>,
}

impl RecordingWire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `peer` as disconnected for `is_connected`.
    pub fn disconnect(&self, peer: PeerId) {
        self.gone.lock().unwrap().insert(peer);
    }

    /// Everything sent so far, in order.
    pub fn all_sent(&self) -> Vec<(PeerId, ServerRpc)> {
        self.sent.lock().unwrap().clone()
    }

    /// Everything sent to one peer, in order.
    pub fn sent_to(&self, peer: PeerId) -> Vec<ServerRpc> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == peer)
            .map(|(_, rpc)| rpc.clone())
            .collect()
    }

    /// Number of messages sent to `peer`.
    pub fn count_to(&self, peer: PeerId) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == peer)
            .count()
    }
}

impl Wire for RecordingWire {
    fn send(&self, peer: PeerId, rpc: ServerRpc) {
        self.sent.lock().unwrap().push((peer, rpc));
    }

    fn is_connected(&self, peer: PeerId) -> bool {
        !self.gone.lock().unwrap().contains(&peer)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_wire_records_sends_in_order() {
        let wire = RecordingWire::new();
        let peer = PeerId(1);
        wire.send(peer, ServerRpc::VersionNumber { version: 1 });
        wire.send(peer, ServerRpc::AskPlayerName);

        let sent = wire.sent_to(peer);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], ServerRpc::VersionNumber { version: 1 });
        assert_eq!(sent[1], ServerRpc::AskPlayerName);
    }

    #[test]
    fn test_disconnect_flips_is_connected() {
        let wire = RecordingWire::new();
        let peer = PeerId(7);
        assert!(wire.is_connected(peer));
        wire.disconnect(peer);
        assert!(!wire.is_connected(peer));
    }
}
