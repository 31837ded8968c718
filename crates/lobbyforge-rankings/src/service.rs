//! Cache-first leaderboard serving.
//!
//! Ranking pages are read far more often than they change, so every
//! served page comes from an in-memory cache keyed `(subject, page)`.
//! A miss (or a stale entry) fetches from the store and populates the
//! cache; concurrent duplicate fetches for the same cold key are accepted
//! rather than coordinated. A background loop re-fetches every known key
//! periodically and pushes fresh pages to the connected audience.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use lobbyforge_protocol::{PeerId, RankingPage, RankingSubject, ServerRpc};
use lobbyforge_session::{SessionManager, Wire};
use lobbyforge_store::{ProfileStore, ProfileStoreExt, StoreError};

struct CachedPage {
    page: RankingPage,
    fetched_at: Instant,
}

/// Serves leaderboard pages out of a refresh-on-read cache.
pub struct RankingService<S> {
    store: Arc<S>,
    cache: Mutex<HashMap<(RankingSubject, u8), CachedPage>>,
    page_size: u32,
    /// Entries older than this are re-fetched on read.
    max_age: Duration,
}

impl<S: ProfileStore> RankingService<S> {
    pub fn new(store: Arc<S>, page_size: u32, max_age: Duration) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
            page_size,
            max_age,
        }
    }

    /// Serves one page: a fresh cache hit answers without store traffic,
    /// anything else fetches and repopulates. A confirmed-absent page is
    /// served (and cached) empty.
    pub async fn get_page(
        &self,
        subject: RankingSubject,
        page: u8,
    ) -> Result<RankingPage, StoreError> {
        {
            let cache = self.cache.lock().await;
            if let Some(cached) = cache.get(&(subject, page)) {
                if cached.fetched_at.elapsed() < self.max_age {
                    return Ok(cached.page.clone());
                }
                debug!(%subject, page, "stale ranking entry, re-fetching");
            }
        }

        let fetched = self
            .store
            .get_top_ranks(subject, page, self.page_size)
            .await?
            .unwrap_or_default();
        self.cache.lock().await.insert(
            (subject, page),
            CachedPage {
                page: fetched.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(fetched)
    }

    /// Re-fetches every known cache key unconditionally and pushes the
    /// fresh pages to each still-connected audience peer. A failed fetch
    /// keeps the stale entry and is logged.
    pub async fn refresh_all(&self, wire: &impl Wire, audience: &[PeerId]) {
        let keys: Vec<(RankingSubject, u8)> =
            self.cache.lock().await.keys().copied().collect();
        if keys.is_empty() {
            return;
        }
        info!(pages = keys.len(), peers = audience.len(), "refreshing ranking cache");

        for (subject, page) in keys {
            let fetched = match self.store.get_top_ranks(subject, page, self.page_size).await
            {
                Ok(row) => row.unwrap_or_default(),
                Err(error) => {
                    warn!(%subject, page, %error, "ranking refresh failed, keeping stale page");
                    continue;
                }
            };
            self.cache.lock().await.insert(
                (subject, page),
                CachedPage {
                    page: fetched.clone(),
                    fetched_at: Instant::now(),
                },
            );
            for peer in audience {
                if wire.is_connected(*peer) {
                    wire.send(
                        *peer,
                        ServerRpc::ReceiveRankingList {
                            subject,
                            page,
                            ranks: fetched.clone(),
                        },
                    );
                }
            }
        }
    }

    /// Spawns the periodic refresh loop. The first tick is delayed by a
    /// random fraction of `period` so restarted lobbies do not hammer the
    /// store in lock-step.
    pub fn spawn_refresh_loop<W: Wire>(
        self: Arc<Self>,
        wire: Arc<W>,
        sessions: Arc<Mutex<SessionManager>>,
        period: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let jitter = rand::rng().random_range(Duration::ZERO..period);
            tokio::time::sleep(jitter).await;
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let audience: Vec<PeerId> =
                    sessions.lock().await.iter().map(|s| s.peer).collect();
                self.refresh_all(wire.as_ref(), &audience).await;
            }
        })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lobbyforge_protocol::{AccountId, RankingEntry};
    use lobbyforge_session::RecordingWire;
    use lobbyforge_store::{MemoryStore, tables};

    /// Counts reads so tests can assert cache behavior.
    struct CountingStore {
        inner: MemoryStore,
        reads: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl ProfileStore for CountingStore {
        async fn get_raw(
            &self,
            table: &str,
            key: &str,
        ) -> Result<Option<serde_json::Value>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_raw(table, key).await
        }

        async fn set_raw(
            &self,
            table: &str,
            key: &str,
            value: serde_json::Value,
        ) -> Result<(), StoreError> {
            self.inner.set_raw(table, key, value).await
        }
    }

    fn page_with(name: &str) -> RankingPage {
        RankingPage {
            entries: vec![RankingEntry {
                account_id: AccountId::new("acc-1"),
                name: name.to_owned(),
                value: 1500.0,
            }],
        }
    }

    async fn seed(store: &CountingStore, subject: RankingSubject, page: u8, value: &RankingPage) {
        store
            .set(tables::RANKINGS, &format!("{subject}:{page}"), value)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_page_cold_miss_fetches_once_then_serves_cached() {
        let store = Arc::new(CountingStore::new());
        seed(&store, RankingSubject::Player, 0, &page_with("Arwic")).await;
        let service =
            RankingService::new(Arc::clone(&store), 20, Duration::from_secs(300));

        let first = service.get_page(RankingSubject::Player, 0).await.unwrap();
        let second = service.get_page(RankingSubject::Player, 0).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn test_get_page_absent_leaderboard_serves_empty() {
        let store = Arc::new(CountingStore::new());
        let service =
            RankingService::new(Arc::clone(&store), 20, Duration::from_secs(300));

        let page = service.get_page(RankingSubject::Ffa, 3).await.unwrap();
        assert!(page.entries.is_empty());
    }

    #[tokio::test]
    async fn test_get_page_stale_entry_refetches() {
        let store = Arc::new(CountingStore::new());
        seed(&store, RankingSubject::Team, 0, &page_with("Arwic")).await;
        // Zero max age: every read is stale.
        let service = RankingService::new(Arc::clone(&store), 20, Duration::ZERO);

        service.get_page(RankingSubject::Team, 0).await.unwrap();
        service.get_page(RankingSubject::Team, 0).await.unwrap();

        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_refresh_all_pushes_fresh_pages_to_connected_audience() {
        let store = Arc::new(CountingStore::new());
        seed(&store, RankingSubject::Player, 0, &page_with("Arwic")).await;
        let service =
            RankingService::new(Arc::clone(&store), 20, Duration::from_secs(300));
        service.get_page(RankingSubject::Player, 0).await.unwrap();

        // Leaderboard changes behind the cache's back.
        seed(&store, RankingSubject::Player, 0, &page_with("Tamira")).await;
        let wire = RecordingWire::new();
        let live = PeerId(1);
        let gone = PeerId(2);
        wire.disconnect(gone);

        service.refresh_all(&wire, &[live, gone]).await;

        let sent = wire.sent_to(live);
        assert!(sent.iter().any(|rpc| matches!(
            rpc,
            ServerRpc::ReceiveRankingList { ranks, .. }
                if ranks.entries.first().map(|e| e.name.as_str()) == Some("Tamira")
        )));
        assert_eq!(wire.count_to(gone), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_stale_page() {
        let store = Arc::new(CountingStore::new());
        seed(&store, RankingSubject::Player, 0, &page_with("Arwic")).await;
        let service =
            RankingService::new(Arc::clone(&store), 20, Duration::from_secs(300));
        service.get_page(RankingSubject::Player, 0).await.unwrap();

        store.inner.fail_table(tables::RANKINGS).await;
        let wire = RecordingWire::new();
        service.refresh_all(&wire, &[]).await;

        // Cache still answers with the last good page.
        let page = service.get_page(RankingSubject::Player, 0).await.unwrap();
        assert_eq!(page.entries.first().map(|e| e.name.as_str()), Some("Arwic"));
    }
}
