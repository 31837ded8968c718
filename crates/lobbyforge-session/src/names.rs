//! Process-wide display-name cache.
//!
//! Names change rarely and are read constantly (chat lines, profile
//! views, logs), so every resolved name is kept for the lifetime of the
//! process. Entries are replaced on name change, never evicted.

use std::collections::HashMap;
use std::sync::Mutex;

use lobbyforge_protocol::AccountId;

/// Account → display-name cache, shareable as `Arc<NameCache>`.
#[derive(Default)]
pub struct NameCache {
    inner: Mutex<HashMap<AccountId, String>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached name for `account`, if any.
    pub fn get(&self, account: &AccountId) -> Option<String> {
        self.inner.lock().unwrap().get(account).cloned()
    }

    /// Caches (or replaces) the name for `account`.
    pub fn insert(&self, account: &AccountId, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .insert(account.clone(), name.to_owned());
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_unknown_account_returns_none() {
        let cache = NameCache::new();
        assert_eq!(cache.get(&AccountId::new("acc-1")), None);
    }

    #[test]
    fn test_insert_replaces_previous_name() {
        let cache = NameCache::new();
        let acc = AccountId::new("acc-1");
        cache.insert(&acc, "Arwic");
        cache.insert(&acc, "Tamira");

        assert_eq!(cache.get(&acc), Some("Tamira".to_owned()));
        assert_eq!(cache.len(), 1);
    }
}
