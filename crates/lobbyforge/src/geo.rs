//! IP geolocation contract, used for login bookkeeping.

use std::collections::HashMap;
use std::future::Future;

/// Resolves a peer address to a country name. Lookups are best-effort;
/// `None` means "unknown" and is never an error.
pub trait IpGeo: Send + Sync + 'static {
    fn country_for(&self, ip: &str) -> impl Future<Output = Option<String>> + Send;
}

/// A fixed lookup table, for tests and the demo.
#[derive(Default)]
pub struct TableGeo {
    entries: HashMap<String, String>,
}

impl TableGeo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ip: &str, country: &str) -> Self {
        self.entries.insert(ip.to_owned(), country.to_owned());
        self
    }
}

impl IpGeo for TableGeo {
    async fn country_for(&self, ip: &str) -> Option<String> {
        self.entries.get(ip).cloned()
    }
}
