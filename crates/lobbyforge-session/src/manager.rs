//! The session manager: the single authority on who is logged in.
//!
//! Two indexes are kept in lock-step — account → session and
//! peer → account — so both "which session does this RPC belong to" and
//! "which peer do I push this account's data to" are O(1). Every mutation
//! goes through this type; nothing else writes either map.

use std::collections::HashMap;

use lobbyforge_protocol::{Account, AccountId, PeerId, PlayerLocation};
use tracing::warn;

use crate::session::PlayerSession;

/// Live-session bookkeeping with the invariant that the two indexes
/// always describe the same set of sessions.
///
/// Last writer wins: creating a session for an account (or a peer) that
/// already has one displaces the old session entirely. This resolves
/// login storms — duplicate logins racing each other — without ever
/// leaving a half-indexed session behind.
#[derive(Debug, Default)]
pub struct SessionManager {
    by_account: HashMap<AccountId, PlayerSession>,
    by_peer: HashMap<PeerId, AccountId>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for `account` bound to `peer`, displacing any
    /// previous session held by either.
    pub fn create(
        &mut self,
        account: &Account,
        peer: PeerId,
        location: PlayerLocation,
    ) -> &mut PlayerSession {
        if let Some(old) = self.remove_by_account(&account.id) {
            warn!(
                account = %account.id,
                old_peer = %old.peer,
                new_peer = %peer,
                "displacing previous session for account"
            );
        }
        if let Some(old) = self.remove_by_peer(peer) {
            warn!(
                %peer,
                old_account = %old.account_id,
                new_account = %account.id,
                "displacing previous session bound to peer"
            );
        }

        self.by_peer.insert(peer, account.id.clone());
        self.by_account
            .entry(account.id.clone())
            .or_insert_with(|| PlayerSession::new(account, peer, location))
    }

    /// Removes the session for `account`, if any. Idempotent.
    pub fn remove_by_account(&mut self, account: &AccountId) -> Option<PlayerSession> {
        let session = self.by_account.remove(account)?;
        // Only unlink the peer index if it still points at this account;
        // it may already belong to a displacing session.
        if self.by_peer.get(&session.peer) == Some(account) {
            self.by_peer.remove(&session.peer);
        }
        Some(session)
    }

    /// Removes the session bound to `peer`, if any. Idempotent.
    pub fn remove_by_peer(&mut self, peer: PeerId) -> Option<PlayerSession> {
        let account = self.by_peer.remove(&peer)?;
        self.by_account.remove(&account)
    }

    pub fn get(&self, account: &AccountId) -> Option<&PlayerSession> {
        self.by_account.get(account)
    }

    pub fn get_mut(&mut self, account: &AccountId) -> Option<&mut PlayerSession> {
        self.by_account.get_mut(account)
    }

    pub fn get_by_peer(&self, peer: PeerId) -> Option<&PlayerSession> {
        self.by_account.get(self.by_peer.get(&peer)?)
    }

    pub fn get_by_peer_mut(&mut self, peer: PeerId) -> Option<&mut PlayerSession> {
        let account = self.by_peer.get(&peer)?.clone();
        self.by_account.get_mut(&account)
    }

    pub fn account_for_peer(&self, peer: PeerId) -> Option<&AccountId> {
        self.by_peer.get(&peer)
    }

    pub fn peer_for_account(&self, account: &AccountId) -> Option<PeerId> {
        self.by_account.get(account).map(|s| s.peer)
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.by_account.contains_key(account)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerSession> {
        self.by_account.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlayerSession> {
        self.by_account.values_mut()
    }

    pub fn len(&self) -> usize {
        self.by_account.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_account.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> Account {
        Account {
            id: AccountId::new(id),
            email: format!("{id}@example.net"),
        }
    }

    fn town() -> PlayerLocation {
        PlayerLocation::town("Oaktown")
    }

    #[test]
    fn test_create_session_resolves_through_both_indexes() {
        let mut mgr = SessionManager::new();
        let acc = account("acc-1");
        mgr.create(&acc, PeerId(10), town());

        assert_eq!(mgr.len(), 1);
        assert!(mgr.get(&acc.id).is_some());
        assert_eq!(mgr.get_by_peer(PeerId(10)).map(|s| &s.account_id), Some(&acc.id));
        assert_eq!(mgr.peer_for_account(&acc.id), Some(PeerId(10)));
    }

    #[test]
    fn test_create_same_account_twice_keeps_last_peer() {
        // Login storm: same account from two connections. Last writer wins
        // and the stale peer binding is gone.
        let mut mgr = SessionManager::new();
        let acc = account("acc-1");
        mgr.create(&acc, PeerId(10), town());
        mgr.create(&acc, PeerId(11), town());

        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.peer_for_account(&acc.id), Some(PeerId(11)));
        assert!(mgr.get_by_peer(PeerId(10)).is_none());
    }

    #[test]
    fn test_create_same_peer_twice_displaces_old_account() {
        let mut mgr = SessionManager::new();
        mgr.create(&account("acc-1"), PeerId(10), town());
        mgr.create(&account("acc-2"), PeerId(10), town());

        assert_eq!(mgr.len(), 1);
        assert!(!mgr.contains(&AccountId::new("acc-1")));
        assert_eq!(
            mgr.account_for_peer(PeerId(10)),
            Some(&AccountId::new("acc-2"))
        );
    }

    #[test]
    fn test_remove_by_account_clears_both_indexes() {
        let mut mgr = SessionManager::new();
        let acc = account("acc-1");
        mgr.create(&acc, PeerId(10), town());

        let removed = mgr.remove_by_account(&acc.id);
        assert!(removed.is_some());
        assert!(mgr.is_empty());
        assert!(mgr.account_for_peer(PeerId(10)).is_none());
    }

    #[test]
    fn test_remove_by_peer_clears_both_indexes() {
        let mut mgr = SessionManager::new();
        let acc = account("acc-1");
        mgr.create(&acc, PeerId(10), town());

        let removed = mgr.remove_by_peer(PeerId(10));
        assert_eq!(removed.map(|s| s.account_id), Some(acc.id.clone()));
        assert!(mgr.is_empty());
        assert!(!mgr.contains(&acc.id));
    }

    #[test]
    fn test_remove_twice_is_idempotent() {
        let mut mgr = SessionManager::new();
        let acc = account("acc-1");
        mgr.create(&acc, PeerId(10), town());

        assert!(mgr.remove_by_account(&acc.id).is_some());
        assert!(mgr.remove_by_account(&acc.id).is_none());
        assert!(mgr.remove_by_peer(PeerId(10)).is_none());
    }

    #[test]
    fn test_get_mut_mutation_is_visible_through_peer_index() {
        let mut mgr = SessionManager::new();
        let acc = account("acc-1");
        mgr.create(&acc, PeerId(10), town());

        mgr.get_mut(&acc.id).unwrap().name = Some("Arwic".into());
        assert_eq!(
            mgr.get_by_peer(PeerId(10)).unwrap().name.as_deref(),
            Some("Arwic")
        );
    }
}
