//! Storage backends for short key -> URL mappings.
//!
//! Two variants share the [`UrlStorage`] capability: [`InMemoryStorage`]
//! keeps everything in a [`LookupStore`](crate::cache::LookupStore), and
//! [`FileStorage`] wraps an in-memory store and additionally appends every
//! save to a durable [`AppendLog`](log::AppendLog) that is replayed on open.

pub mod file;
pub mod log;
pub mod memory;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::UrlRecord;

pub use file::{FileStorage, FileStorageOptions};
pub use log::ReplayMode;
pub use memory::InMemoryStorage;

#[async_trait]
pub trait UrlStorage: Send + Sync + 'static {
    /// Upsert a record. A record whose key already exists replaces it.
    async fn save(&self, record: UrlRecord) -> Result<(), StorageError>;

    /// Returns the original URL for `short_key`, if known.
    fn get(&self, short_key: &str) -> Option<String>;

    /// Release any durable resources. Called once at shutdown.
    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Short human-readable name for startup logs.
    fn describe(&self) -> String;
}
