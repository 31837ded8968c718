//! Named chat channels.
//!
//! A channel is a name plus a membership set; subscription is implicit
//! (joining the lobby or a game instance subscribes you) and broadcast is
//! best-effort — dead peers are skipped, they will be unsubscribed when
//! their disconnect lands.

use std::collections::HashMap;

use lobbyforge_protocol::{AccountId, PeerId, ServerRpc};
use tracing::debug;

use crate::wire::Wire;

/// Name of the sender used for server-originated chat lines.
pub const SYSTEM_SENDER: &str = "System";

/// One chat channel: global, announcements, or per-instance.
#[derive(Debug, Default)]
pub struct ChatChannel {
    name: String,
    members: HashMap<AccountId, PeerId>,
}

impl ChatChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds (or rebinds) a member. Rebinding covers reconnects where the
    /// account comes back on a new peer.
    pub fn subscribe(&mut self, account: &AccountId, peer: PeerId) {
        self.members.insert(account.clone(), peer);
    }

    /// Removes a member. Returns whether they were subscribed.
    pub fn unsubscribe(&mut self, account: &AccountId) -> bool {
        self.members.remove(account).is_some()
    }

    /// Removes `account` only while it is still bound to `peer`. A stale
    /// cleanup cannot evict a fresher binding made by a reconnect.
    pub fn unsubscribe_peer(&mut self, account: &AccountId, peer: PeerId) -> bool {
        match self.members.get(account) {
            Some(bound) if *bound == peer => self.members.remove(account).is_some(),
            _ => false,
        }
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.members.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sends `rpc` to every live member.
    pub fn broadcast(&self, wire: &impl Wire, rpc: &ServerRpc) {
        for (account, peer) in &self.members {
            if wire.is_connected(*peer) {
                wire.send(*peer, rpc.clone());
            } else {
                debug!(channel = %self.name, %account, %peer, "skipping dead peer in broadcast");
            }
        }
    }

    /// Broadcasts a chat line from a player.
    pub fn say(&self, wire: &impl Wire, sender: &str, text: &str) {
        self.broadcast(
            wire,
            &ServerRpc::Chat {
                channel: self.name.clone(),
                sender: sender.to_owned(),
                text: text.to_owned(),
            },
        );
    }

    /// Broadcasts a system line (announcements).
    pub fn announce(&self, wire: &impl Wire, text: &str) {
        self.say(wire, SYSTEM_SENDER, text);
    }

    /// Sends a system line on this channel to a single peer — used for
    /// the message of the day, which only the joining player should see.
    pub fn whisper_system(&self, wire: &impl Wire, peer: PeerId, text: &str) {
        wire.send(
            peer,
            ServerRpc::Chat {
                channel: self.name.clone(),
                sender: SYSTEM_SENDER.to_owned(),
                text: text.to_owned(),
            },
        );
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::RecordingWire;

    #[test]
    fn test_broadcast_reaches_every_member() {
        let wire = RecordingWire::new();
        let mut channel = ChatChannel::new("global");
        channel.subscribe(&AccountId::new("acc-1"), PeerId(1));
        channel.subscribe(&AccountId::new("acc-2"), PeerId(2));

        channel.announce(&wire, "server restarting soon");

        assert_eq!(wire.count_to(PeerId(1)), 1);
        assert_eq!(wire.count_to(PeerId(2)), 1);
    }

    #[test]
    fn test_unsubscribed_member_receives_nothing() {
        let wire = RecordingWire::new();
        let mut channel = ChatChannel::new("global");
        let acc = AccountId::new("acc-1");
        channel.subscribe(&acc, PeerId(1));
        assert!(channel.unsubscribe(&acc));

        channel.announce(&wire, "hello");
        assert_eq!(wire.count_to(PeerId(1)), 0);
    }

    #[test]
    fn test_broadcast_skips_dead_peers() {
        let wire = RecordingWire::new();
        let mut channel = ChatChannel::new("global");
        channel.subscribe(&AccountId::new("acc-1"), PeerId(1));
        channel.subscribe(&AccountId::new("acc-2"), PeerId(2));
        wire.disconnect(PeerId(2));

        channel.say(&wire, "Arwic", "anyone around?");

        assert_eq!(wire.count_to(PeerId(1)), 1);
        assert_eq!(wire.count_to(PeerId(2)), 0);
    }

    #[test]
    fn test_unsubscribe_peer_spares_rebound_member() {
        let wire = RecordingWire::new();
        let mut channel = ChatChannel::new("global");
        let acc = AccountId::new("acc-1");
        channel.subscribe(&acc, PeerId(1));
        channel.subscribe(&acc, PeerId(9));

        // Stale cleanup for the old connection must not evict the member.
        assert!(!channel.unsubscribe_peer(&acc, PeerId(1)));
        assert!(channel.contains(&acc));

        channel.announce(&wire, "hello");
        assert_eq!(wire.count_to(PeerId(9)), 1);

        assert!(channel.unsubscribe_peer(&acc, PeerId(9)));
        assert!(!channel.contains(&acc));
    }

    #[test]
    fn test_resubscribe_rebinds_peer() {
        let wire = RecordingWire::new();
        let mut channel = ChatChannel::new("global");
        let acc = AccountId::new("acc-1");
        channel.subscribe(&acc, PeerId(1));
        channel.subscribe(&acc, PeerId(9));

        channel.announce(&wire, "hello");

        assert_eq!(channel.len(), 1);
        assert_eq!(wire.count_to(PeerId(1)), 0);
        assert_eq!(wire.count_to(PeerId(9)), 1);
    }
}
