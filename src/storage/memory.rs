use async_trait::async_trait;

use crate::cache::LookupStore;
use crate::error::StorageError;
use crate::models::UrlRecord;
use crate::storage::UrlStorage;

/// Storage that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    store: LookupStore,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: LookupStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LookupStore {
        &self.store
    }
}

#[async_trait]
impl UrlStorage for InMemoryStorage {
    async fn save(&self, record: UrlRecord) -> Result<(), StorageError> {
        self.store.put(record.short_url, record.original_url);
        Ok(())
    }

    fn get(&self, short_key: &str) -> Option<String> {
        self.store.get(short_key)
    }

    fn describe(&self) -> String {
        "in-memory".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_get() {
        let storage = InMemoryStorage::new();
        storage
            .save(UrlRecord::new("abc", "https://example.com"))
            .await
            .unwrap();

        assert_eq!(storage.get("abc").as_deref(), Some("https://example.com"));
        assert_eq!(storage.get("nope"), None);
    }

    #[tokio::test]
    async fn stores_are_isolated() {
        let a = InMemoryStorage::new();
        let b = InMemoryStorage::new();
        a.save(UrlRecord::new("abc", "https://example.com"))
            .await
            .unwrap();

        assert!(b.get("abc").is_none());
    }

    #[tokio::test]
    async fn shares_injected_store() {
        let store = LookupStore::new();
        let storage = InMemoryStorage::with_store(store.clone());
        storage
            .save(UrlRecord::new("abc", "https://example.com"))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        storage.close().await.unwrap();
    }
}
