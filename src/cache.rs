use dashmap::DashMap;
use std::sync::Arc;

use crate::models::UrlRecord;

/// Thread-safe in-memory map short_key -> original_url.
///
/// Backed by a DashMap: lookups on different shards never block each other
/// and a `put` only locks the shard it writes to. The store is filled once
/// from the log before the listener is bound, then kept current by the
/// storage backend on every create.
#[derive(Clone, Debug)]
pub struct LookupStore {
    inner: Arc<DashMap<String, String>>,
}

impl LookupStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Insert or overwrite a mapping.
    pub fn put(&self, short_key: impl Into<String>, original_url: impl Into<String>) {
        self.inner.insert(short_key.into(), original_url.into());
    }

    /// Look up a short key. Returns a clone of the original URL if present.
    pub fn get(&self, short_key: &str) -> Option<String> {
        self.inner.get(short_key).map(|v| v.clone())
    }

    /// Apply records in order; a later record for the same key replaces an
    /// earlier one. Returns how many records were applied.
    pub fn load_all<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = UrlRecord>,
    {
        let mut applied = 0;
        for rec in records {
            self.put(rec.short_url, rec.original_url);
            applied += 1;
        }
        applied
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for LookupStore {
    fn default() -> Self {
        Self::new()
    }
}
