//! An in-memory [`ProfileStore`] for tests and demos.
//!
//! Behaves like the real backend at the contract level: confirmed
//! absences, per-table failure injection (to exercise the "one field
//! fails, siblings survive" paths), and no ordering guarantees between
//! independent calls.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::{ProfileStore, StoreError};

/// In-memory table storage with failure injection.
///
/// Cheap to share as `Arc<MemoryStore>`. Each call locks briefly — there
/// is no interior await while the lock is held.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, HashMap<String, serde_json::Value>>>,
    /// Tables whose calls fail with `StoreError::Unavailable`.
    failing: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call against `table` fail.
    pub async fn fail_table(&self, table: &str) {
        self.failing.lock().await.insert(table.to_owned());
    }

    /// Clears failure injection for `table`.
    pub async fn heal_table(&self, table: &str) {
        self.failing.lock().await.remove(table);
    }

    /// Number of rows currently stored in `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .await
            .get(table)
            .map_or(0, |rows| rows.len())
    }

    async fn check_failure(&self, table: &str) -> Result<(), StoreError> {
        if self.failing.lock().await.contains(table) {
            return Err(StoreError::Unavailable(format!(
                "injected failure for table {table}"
            )));
        }
        Ok(())
    }
}

impl ProfileStore for MemoryStore {
    async fn get_raw(
        &self,
        table: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        self.check_failure(table).await?;
        let tables = self.tables.lock().await;
        Ok(tables.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    async fn set_raw(
        &self,
        table: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.check_failure(table).await?;
        let mut tables = self.tables.lock().await;
        tables
            .entry(table.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProfileStoreExt, tables};
    use lobbyforge_protocol::{AccountId, SkillBuild};

    #[tokio::test]
    async fn test_get_raw_missing_row_returns_none() {
        let store = MemoryStore::new();
        let row = store.get_raw("NoSuchTable", "k").await.unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips_typed_value() {
        let store = MemoryStore::new();
        let acc = AccountId::new("acc-1");
        let build = SkillBuild {
            skills: vec![9, 9, 9],
        };

        store
            .set(tables::ACCOUNT_TO_SKILL_BUILD, acc.as_str(), &build)
            .await
            .unwrap();

        let fetched = store.get_skill_build(&acc).await.unwrap();
        assert_eq!(fetched, Some(build));
    }

    #[tokio::test]
    async fn test_fail_table_makes_calls_fail() {
        let store = MemoryStore::new();
        store.fail_table(tables::ACCOUNT_TO_STATS).await;

        let result = store.get_player_stats(&AccountId::new("acc-1")).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_fail_table_leaves_other_tables_working() {
        // Per-field independence: a failing stats table must not affect
        // the name table.
        let store = MemoryStore::new();
        let acc = AccountId::new("acc-1");
        store.set_player_name(&acc, "Arwic").await.unwrap();
        store.fail_table(tables::ACCOUNT_TO_STATS).await;

        assert!(store.get_player_stats(&acc).await.is_err());
        assert_eq!(
            store.get_player_name(&acc).await.unwrap(),
            Some("Arwic".to_owned())
        );
    }

    #[tokio::test]
    async fn test_heal_table_restores_calls() {
        let store = MemoryStore::new();
        store.fail_table(tables::ACCOUNT_TO_STATS).await;
        store.heal_table(tables::ACCOUNT_TO_STATS).await;

        let result = store.get_player_stats(&AccountId::new("acc-1")).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_set_player_name_populates_reverse_index() {
        let store = MemoryStore::new();
        let acc = AccountId::new("acc-7");
        store.set_player_name(&acc, "Tamira").await.unwrap();

        let resolved = store.get_account_id_by_name("Tamira").await.unwrap();
        assert_eq!(resolved, Some(acc));
    }

    #[tokio::test]
    async fn test_push_login_activity_prepends_newest_and_caps() {
        use lobbyforge_protocol::AccountActivity;
        let store = MemoryStore::new();
        for i in 1..=3u64 {
            store
                .push_login_activity(
                    &AccountActivity {
                        account_id: AccountId::new(format!("acc-{i}")),
                        email: format!("acc-{i}@example.net"),
                        timestamp_ms: i * 1000,
                    },
                    2,
                )
                .await
                .unwrap();
        }

        let rows = store.get_last_logins(10).await.unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].account_id, AccountId::new("acc-3"));
        assert_eq!(rows[1].account_id, AccountId::new("acc-2"));
    }

    #[tokio::test]
    async fn test_account_flag_setters_round_trip() {
        use lobbyforge_protocol::OnlineStatus;
        let store = MemoryStore::new();
        let acc = AccountId::new("acc-1");

        store.set_password(&acc, "hunter2").await.unwrap();
        store
            .set_online_status(&acc, OnlineStatus::Online)
            .await
            .unwrap();
        store.set_last_login(&acc, 1_000).await.unwrap();
        store.set_registration_date(&acc, 2_000).await.unwrap();
        store
            .set_accounts_for_ip("203.0.113.9", &[acc.clone()])
            .await
            .unwrap();
        store.set_country(&acc, "Iceland").await.unwrap();
        store.set_ip_country("203.0.113.9", "Iceland").await.unwrap();

        let status: Option<OnlineStatus> = store
            .get(tables::ACCOUNT_TO_ONLINE_STATUS, "acc-1")
            .await
            .unwrap();
        assert_eq!(status, Some(OnlineStatus::Online));
        let last_login: Option<u64> =
            store.get(tables::ACCOUNT_TO_LAST_LOGIN, "acc-1").await.unwrap();
        assert_eq!(last_login, Some(1_000));
        assert_eq!(
            store.get_accounts_for_ip("203.0.113.9").await.unwrap(),
            Some(vec![acc])
        );
        let country: Option<String> =
            store.get(tables::IP_TO_COUNTRY, "203.0.113.9").await.unwrap();
        assert_eq!(country.as_deref(), Some("Iceland"));
    }

    #[tokio::test]
    async fn test_get_corrupt_row_returns_corrupt_error() {
        let store = MemoryStore::new();
        store
            .set_raw(
                tables::ACCOUNT_TO_SKILL_BUILD,
                "acc-1",
                serde_json::json!("not a skill build"),
            )
            .await
            .unwrap();

        let result = store.get_skill_build(&AccountId::new("acc-1")).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
