//! Profile hydration: the per-field fan-out that fills a profile view.
//!
//! One [`Hydrator::hydrate`] call spawns an independent fetch task per
//! profile field. Each task fetches its row, substitutes the field's
//! default on confirmed absence, caches the value onto the subject's live
//! session if one still exists, and pushes the field to the requesting
//! peer. A failed fetch is logged and dropped — the field simply never
//! arrives, and every sibling field is unaffected.
//!
//! Two fields are special when the requester is viewing *their own*
//! profile: an absent name prompts name entry and an absent customization
//! prompts character creation, instead of substituting a default.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use lobbyforge_protocol::{
    AccountId, ArtifactInventory, ArtifactTree, CharacterCustomization, CharacterStats,
    ItemInventory, PeerId, PlayerExperience, PlayerStats, ServerRpc, SkillBuild,
};
use lobbyforge_store::{ProfileStore, ProfileStoreExt, StoreError};

use crate::manager::SessionManager;
use crate::names::NameCache;
use crate::session::PlayerSession;
use crate::wire::Wire;

/// Fans profile fields out of the store toward a viewing peer.
///
/// Holds shared handles only; cloning is cheap and every spawned fetch
/// task carries its own clone.
pub struct Hydrator<S, W> {
    store: Arc<S>,
    wire: Arc<W>,
    sessions: Arc<Mutex<SessionManager>>,
    names: Arc<NameCache>,
}

impl<S, W> Clone for Hydrator<S, W> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            wire: Arc::clone(&self.wire),
            sessions: Arc::clone(&self.sessions),
            names: Arc::clone(&self.names),
        }
    }
}

impl<S: ProfileStore, W: Wire> Hydrator<S, W> {
    pub fn new(
        store: Arc<S>,
        wire: Arc<W>,
        sessions: Arc<Mutex<SessionManager>>,
        names: Arc<NameCache>,
    ) -> Self {
        Self {
            store,
            wire,
            sessions,
            names,
        }
    }

    pub fn names(&self) -> &NameCache {
        self.names.as_ref()
    }

    /// Starts the full fan-out for `subject`'s profile toward `dest`.
    ///
    /// Returns immediately: the opening `ViewProfile` marker is sent
    /// inline, every field fetch runs in its own task. Field arrival
    /// order is unspecified.
    pub fn hydrate(&self, subject: &AccountId, dest: PeerId) {
        debug!(account = %subject, %dest, "starting profile fan-out");
        self.push(
            dest,
            ServerRpc::ViewProfile {
                account_id: subject.clone(),
            },
        );

        self.spawn_name(subject.clone(), dest);
        self.spawn_customization(subject.clone(), dest);

        let (store, acc) = (Arc::clone(&self.store), subject.clone());
        self.spawn_field(
            subject.clone(),
            dest,
            "skill_build",
            async move { store.get_skill_build(&acc).await },
            SkillBuild::starter,
            |s, v| s.skill_build = Some(v),
            |account_id, build| ServerRpc::ReceiveSkillBuild { account_id, build },
        );

        let (store, acc) = (Arc::clone(&self.store), subject.clone());
        self.spawn_field(
            subject.clone(),
            dest,
            "stats",
            async move { store.get_player_stats(&acc).await },
            PlayerStats::default,
            |s, v| s.stats = Some(v),
            |account_id, stats| ServerRpc::ReceivePlayerStats { account_id, stats },
        );

        let (store, acc) = (Arc::clone(&self.store), subject.clone());
        self.spawn_field(
            subject.clone(),
            dest,
            "ffa_stats",
            async move { store.get_ffa_stats(&acc).await },
            PlayerStats::default,
            |s, v| s.ffa_stats = Some(v),
            |account_id, stats| ServerRpc::ReceiveFfaStats { account_id, stats },
        );

        let (store, acc) = (Arc::clone(&self.store), subject.clone());
        self.spawn_field(
            subject.clone(),
            dest,
            "character_stats",
            async move { store.get_character_stats(&acc).await },
            CharacterStats::default,
            |s, v| s.character_stats = Some(v),
            |account_id, stats| ServerRpc::ReceiveCharacterStats { account_id, stats },
        );

        let (store, acc) = (Arc::clone(&self.store), subject.clone());
        self.spawn_field(
            subject.clone(),
            dest,
            "artifact_inventory",
            async move { store.get_artifact_inventory(&acc).await },
            ArtifactInventory::default,
            |s, v| s.artifact_inventory = Some(v),
            |account_id, inventory| ServerRpc::ReceiveArtifactInventory {
                account_id,
                inventory,
            },
        );

        let (store, acc) = (Arc::clone(&self.store), subject.clone());
        self.spawn_field(
            subject.clone(),
            dest,
            "artifact_tree",
            async move { store.get_artifact_tree(&acc).await },
            ArtifactTree::starter,
            |s, v| s.artifact_tree = Some(v),
            |account_id, tree| ServerRpc::ReceiveArtifactTree { account_id, tree },
        );

        let (store, acc) = (Arc::clone(&self.store), subject.clone());
        self.spawn_field(
            subject.clone(),
            dest,
            "item_inventory",
            async move { store.get_item_inventory(&acc).await },
            ItemInventory::default,
            |s, v| s.item_inventory = Some(v),
            |account_id, inventory| ServerRpc::ReceiveItemInventory {
                account_id,
                inventory,
            },
        );

        let (store, acc) = (Arc::clone(&self.store), subject.clone());
        self.spawn_field(
            subject.clone(),
            dest,
            "experience",
            async move { store.get_experience(&acc).await },
            PlayerExperience::default,
            |s, v| s.experience = Some(v),
            |account_id, experience| ServerRpc::ReceiveExperience {
                account_id,
                experience,
            },
        );
    }

    /// Resolves `subject`'s display name: cache first, store second.
    ///
    /// Used outside hydration too (chat, direct name requests), so the
    /// result goes through the process-wide name cache both ways.
    pub async fn resolve_name(
        &self,
        subject: &AccountId,
    ) -> Result<Option<String>, StoreError> {
        if let Some(name) = self.names.get(subject) {
            return Ok(Some(name));
        }
        let name = self.store.get_player_name(subject).await?;
        if let Some(name) = &name {
            self.names.insert(subject, name);
        }
        Ok(name)
    }

    // -- Internals ---------------------------------------------------------

    /// Name field: cache-backed, and an absent name on a self-view turns
    /// into a name-entry prompt instead of a default.
    fn spawn_name(&self, subject: AccountId, dest: PeerId) {
        let hydrator = self.clone();
        tokio::spawn(async move {
            match hydrator.resolve_name(&subject).await {
                Ok(Some(name)) => {
                    let mut sessions = hydrator.sessions.lock().await;
                    if let Some(session) = sessions.get_mut(&subject) {
                        if session.name.is_none() {
                            session.name = Some(name.clone());
                            info!(account = %subject, name = %name, "resolved player name");
                        }
                    }
                    drop(sessions);
                    hydrator.push(
                        dest,
                        ServerRpc::ReceivePlayerName {
                            account_id: subject,
                            name,
                        },
                    );
                }
                Ok(None) => {
                    if hydrator.is_self_view(&subject, dest).await {
                        hydrator.push(dest, ServerRpc::AskPlayerName);
                    }
                }
                Err(error) => {
                    warn!(account = %subject, field = "name", %error, "profile field fetch failed");
                }
            }
        });
    }

    /// Customization field: an absent row on a self-view opens character
    /// creation instead of substituting a default appearance.
    fn spawn_customization(&self, subject: AccountId, dest: PeerId) {
        let hydrator = self.clone();
        tokio::spawn(async move {
            match hydrator.store.get_customization(&subject).await {
                Ok(Some(customization)) => {
                    let cached = customization.clone();
                    hydrator
                        .cache_field(&subject, |s| s.customization = Some(cached))
                        .await;
                    hydrator.push(
                        dest,
                        ServerRpc::ReceiveCharacterCustomization {
                            account_id: subject,
                            customization,
                        },
                    );
                }
                Ok(None) => {
                    if hydrator.is_self_view(&subject, dest).await {
                        hydrator.push(
                            dest,
                            ServerRpc::CustomizeCharacter {
                                account_id: subject,
                            },
                        );
                    } else {
                        let customization = CharacterCustomization::default();
                        hydrator.push(
                            dest,
                            ServerRpc::ReceiveCharacterCustomization {
                                account_id: subject,
                                customization,
                            },
                        );
                    }
                }
                Err(error) => {
                    warn!(account = %subject, field = "customization", %error, "profile field fetch failed");
                }
            }
        });
    }

    /// Common shape of the regular fields: fetch, default on absence,
    /// cache onto the live session, push.
    #[allow(clippy::too_many_arguments)]
    fn spawn_field<T, Fut, D, C, R>(
        &self,
        subject: AccountId,
        dest: PeerId,
        field: &'static str,
        fetch: Fut,
        default: D,
        cache: C,
        rpc: R,
    ) where
        T: Clone + Send + 'static,
        Fut: Future<Output = Result<Option<T>, StoreError>> + Send + 'static,
        D: FnOnce() -> T + Send + 'static,
        C: FnOnce(&mut PlayerSession, T) + Send + 'static,
        R: FnOnce(AccountId, T) -> ServerRpc + Send + 'static,
    {
        let hydrator = self.clone();
        tokio::spawn(async move {
            match fetch.await {
                Ok(row) => {
                    let value = row.unwrap_or_else(default);
                    let cached = value.clone();
                    hydrator
                        .cache_field(&subject, |session| cache(session, cached))
                        .await;
                    hydrator.push(dest, rpc(subject, value));
                }
                Err(error) => {
                    warn!(account = %subject, field, %error, "profile field fetch failed");
                }
            }
        });
    }

    /// Caches a resolved field onto the subject's live session — the
    /// session may have ended while the fetch was in flight.
    async fn cache_field(&self, subject: &AccountId, apply: impl FnOnce(&mut PlayerSession)) {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(subject) {
            Some(session) => apply(session),
            None => {
                debug!(account = %subject, "session ended before field could be cached");
            }
        }
    }

    /// Whether `dest` is the subject's own connection.
    async fn is_self_view(&self, subject: &AccountId, dest: PeerId) -> bool {
        self.sessions
            .lock()
            .await
            .get(subject)
            .is_some_and(|session| session.peer == dest)
    }

    /// Liveness-checked push. Results that outlive their requester are
    /// dropped here.
    fn push(&self, dest: PeerId, rpc: ServerRpc) {
        if self.wire.is_connected(dest) {
            self.wire.send(dest, rpc);
        } else {
            debug!(%dest, "requester gone, dropping hydration push");
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::RecordingWire;
    use lobbyforge_protocol::{Account, PlayerLocation};
    use lobbyforge_store::{MemoryStore, tables};

    fn harness() -> (
        Arc<MemoryStore>,
        Arc<RecordingWire>,
        Arc<Mutex<SessionManager>>,
        Hydrator<MemoryStore, RecordingWire>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let wire = Arc::new(RecordingWire::new());
        let sessions = Arc::new(Mutex::new(SessionManager::new()));
        let hydrator = Hydrator::new(
            Arc::clone(&store),
            Arc::clone(&wire),
            Arc::clone(&sessions),
            Arc::new(NameCache::new()),
        );
        (store, wire, sessions, hydrator)
    }

    async fn login(sessions: &Mutex<SessionManager>, id: &str, peer: PeerId) -> AccountId {
        let account = Account {
            id: AccountId::new(id),
            email: format!("{id}@example.net"),
        };
        sessions
            .lock()
            .await
            .create(&account, peer, PlayerLocation::town("Oaktown"));
        account.id
    }

    /// Polls until the fan-out's spawned tasks have delivered `expected`
    /// messages (or fails the test after a generous deadline).
    async fn wait_for_pushes(wire: &RecordingWire, peer: PeerId, expected: usize) {
        for _ in 0..200 {
            if wire.count_to(peer) >= expected {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!(
            "expected {expected} pushes to {peer}, saw {}",
            wire.count_to(peer)
        );
    }

    #[tokio::test]
    async fn test_hydrate_empty_profile_substitutes_defaults() {
        let (_store, wire, sessions, hydrator) = harness();
        let viewer = PeerId(1);
        // Subject is someone else, so the empty profile renders entirely
        // from defaults: ViewProfile + customization + 8 regular fields.
        let subject = AccountId::new("acc-stranger");
        login(&sessions, "acc-viewer", viewer).await;

        hydrator.hydrate(&subject, viewer);
        wait_for_pushes(&wire, viewer, 10).await;

        let sent = wire.sent_to(viewer);
        assert!(sent.iter().any(|rpc| matches!(
            rpc,
            ServerRpc::ReceiveSkillBuild { build, .. } if *build == SkillBuild::starter()
        )));
        assert!(sent.iter().any(|rpc| matches!(
            rpc,
            ServerRpc::ReceiveArtifactTree { tree, .. } if *tree == ArtifactTree::starter()
        )));
        // No name row and not a self-view: no prompt, no name push.
        assert!(!sent.iter().any(|rpc| matches!(rpc, ServerRpc::AskPlayerName)));
    }

    #[tokio::test]
    async fn test_hydrate_self_view_without_name_prompts_entry() {
        let (_store, wire, sessions, hydrator) = harness();
        let peer = PeerId(1);
        let subject = login(&sessions, "acc-1", peer).await;

        hydrator.hydrate(&subject, peer);
        wait_for_pushes(&wire, peer, 10).await;

        let sent = wire.sent_to(peer);
        assert!(sent.iter().any(|rpc| matches!(rpc, ServerRpc::AskPlayerName)));
        assert!(sent.iter().any(|rpc| matches!(
            rpc,
            ServerRpc::CustomizeCharacter { account_id } if *account_id == subject
        )));
    }

    #[tokio::test]
    async fn test_hydrate_caches_fields_on_live_session() {
        let (store, wire, sessions, hydrator) = harness();
        let peer = PeerId(1);
        let subject = login(&sessions, "acc-1", peer).await;
        store.set_player_name(&subject, "Arwic").await.unwrap();

        hydrator.hydrate(&subject, peer);
        wait_for_pushes(&wire, peer, 10).await;

        let sessions = sessions.lock().await;
        let session = sessions.get(&subject).unwrap();
        assert_eq!(session.name.as_deref(), Some("Arwic"));
        assert_eq!(session.skill_build, Some(SkillBuild::starter()));
        assert!(session.stats.is_some());
    }

    #[tokio::test]
    async fn test_hydrate_one_failing_field_leaves_siblings_intact() {
        let (store, wire, _sessions, hydrator) = harness();
        let viewer = PeerId(1);
        let subject = AccountId::new("acc-1");
        store.fail_table(tables::ACCOUNT_TO_STATS).await;

        hydrator.hydrate(&subject, viewer);
        // ViewProfile + customization + 7 surviving fields.
        wait_for_pushes(&wire, viewer, 9).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let sent = wire.sent_to(viewer);
        assert!(!sent
            .iter()
            .any(|rpc| matches!(rpc, ServerRpc::ReceivePlayerStats { .. })));
        assert!(sent
            .iter()
            .any(|rpc| matches!(rpc, ServerRpc::ReceiveFfaStats { .. })));
        assert!(sent
            .iter()
            .any(|rpc| matches!(rpc, ServerRpc::ReceiveExperience { .. })));
    }

    #[tokio::test]
    async fn test_hydrate_to_disconnected_peer_drops_pushes() {
        let (_store, wire, _sessions, hydrator) = harness();
        let viewer = PeerId(1);
        wire.disconnect(viewer);

        hydrator.hydrate(&AccountId::new("acc-1"), viewer);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(wire.count_to(viewer), 0);
    }

    #[tokio::test]
    async fn test_resolve_name_prefers_cache_over_store() {
        let (store, _wire, _sessions, hydrator) = harness();
        let subject = AccountId::new("acc-1");
        store.set_player_name(&subject, "FromStore").await.unwrap();
        hydrator.names().insert(&subject, "FromCache");

        let name = hydrator.resolve_name(&subject).await.unwrap();
        assert_eq!(name.as_deref(), Some("FromCache"));
    }

    #[tokio::test]
    async fn test_resolve_name_populates_cache_from_store() {
        let (store, _wire, _sessions, hydrator) = harness();
        let subject = AccountId::new("acc-1");
        store.set_player_name(&subject, "Arwic").await.unwrap();

        let name = hydrator.resolve_name(&subject).await.unwrap();
        assert_eq!(name.as_deref(), Some("Arwic"));
        assert_eq!(hydrator.names().get(&subject).as_deref(), Some("Arwic"));
    }
}
