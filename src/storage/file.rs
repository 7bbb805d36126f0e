use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::UrlRecord;
use crate::storage::log::{self, AppendLog, ReplayMode};
use crate::storage::{InMemoryStorage, UrlStorage};

#[derive(Debug, Clone, Copy, Default)]
pub struct FileStorageOptions {
    pub replay_mode: ReplayMode,
    /// fsync after every append.
    pub sync: bool,
}

/// In-memory storage made durable by an append-only log.
///
/// Reads never touch the disk. Saves update memory and then append to the
/// log, both under the log's append lock; if the append fails the in-memory
/// entry stays and the error is returned to the caller.
#[derive(Debug)]
pub struct FileStorage {
    memory: InMemoryStorage,
    log: AppendLog,
}

impl FileStorage {
    /// Replay the log at `path` into a fresh in-memory store, then open it
    /// for appending. Any replay error aborts the open.
    pub fn open<P: AsRef<Path>>(path: P, options: FileStorageOptions) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let memory = InMemoryStorage::new();

        let mut replay = log::replay(path, options.replay_mode)?;
        let mut failure = None;
        let applied = memory.store().load_all(
            replay
                .by_ref()
                .map_while(|rec| rec.map_err(|e| failure = Some(e)).ok()),
        );
        if let Some(e) = failure {
            return Err(e);
        }

        tracing::info!(
            "Replayed {} records from {} ({} unique keys, {} malformed lines skipped)",
            applied,
            path.display(),
            memory.store().len(),
            replay.skipped()
        );

        let log = AppendLog::open(path, options.sync)?;
        Ok(Self { memory, log })
    }

    pub fn len(&self) -> usize {
        self.memory.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.store().is_empty()
    }
}

#[async_trait]
impl UrlStorage for FileStorage {
    async fn save(&self, record: UrlRecord) -> Result<(), StorageError> {
        // Memory is updated under the append lock so it agrees with the log
        // on which of two racing saves of one key came last.
        let store = self.memory.store();
        self.log
            .append_after(&record, || {
                store.put(record.short_url.as_str(), record.original_url.as_str())
            })
            .await
    }

    fn get(&self, short_key: &str) -> Option<String> {
        self.memory.get(short_key)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.log.close().await
    }

    fn describe(&self) -> String {
        format!("file ({})", self.log.path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn strict() -> FileStorageOptions {
        FileStorageOptions {
            replay_mode: ReplayMode::Strict,
            sync: false,
        }
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.json");

        let storage = FileStorage::open(&path, strict()).unwrap();
        assert!(storage.is_empty());
        storage
            .save(UrlRecord::new("k1", "https://one.example"))
            .await
            .unwrap();
        storage
            .save(UrlRecord::new("k2", "https://two.example"))
            .await
            .unwrap();
        storage.close().await.unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path, strict()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("k1").as_deref(), Some("https://one.example"));
        assert_eq!(reopened.get("k2").as_deref(), Some("https://two.example"));
    }

    #[tokio::test]
    async fn later_records_win_on_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.json");

        let storage = FileStorage::open(&path, strict()).unwrap();
        storage
            .save(UrlRecord::new("k1", "https://old.example"))
            .await
            .unwrap();
        storage
            .save(UrlRecord::new("k1", "https://new.example"))
            .await
            .unwrap();
        storage.close().await.unwrap();

        let reopened = FileStorage::open(&path, strict()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("k1").as_deref(), Some("https://new.example"));
    }

    #[test]
    fn strict_open_fails_on_corrupt_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.json");
        fs::write(
            &path,
            "{\"short_url\":\"k1\",\"original_url\":\"https://one.example\"}\ngarbage\n",
        )
        .unwrap();

        let err = FileStorage::open(&path, strict()).unwrap_err();
        assert!(matches!(err, StorageError::CorruptLog { line: 2, .. }));
    }

    #[tokio::test]
    async fn lenient_open_skips_corrupt_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.json");
        fs::write(
            &path,
            "garbage\n{\"short_url\":\"k1\",\"original_url\":\"https://one.example\"}\n",
        )
        .unwrap();

        let storage = FileStorage::open(&path, FileStorageOptions::default()).unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get("k1").as_deref(), Some("https://one.example"));
    }

    #[tokio::test]
    async fn save_after_close_keeps_memory_ahead_of_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.json");

        let storage = FileStorage::open(&path, strict()).unwrap();
        storage.close().await.unwrap();

        let err = storage
            .save(UrlRecord::new("k1", "https://one.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Closed));
        assert_eq!(storage.get("k1").as_deref(), Some("https://one.example"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[tokio::test]
    async fn concurrent_saves_produce_whole_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.json");
        let storage = std::sync::Arc::new(FileStorage::open(&path, strict()).unwrap());

        let mut handles = vec![];
        for i in 0..32 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                let url = format!("https://example{i}.com/{}", "x".repeat(i * 64));
                storage
                    .save(UrlRecord::new(format!("key-{i:02}"), url))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        storage.close().await.unwrap();

        let recs: Vec<_> = log::replay(&path, ReplayMode::Strict)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(recs.len(), 32);
    }

    #[tokio::test]
    async fn racing_saves_of_one_key_agree_after_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("urls.json");
        let storage = std::sync::Arc::new(FileStorage::open(&path, strict()).unwrap());

        let mut handles = vec![];
        for i in 0..64 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage
                    .save(UrlRecord::new("collide", format!("https://example{i}.com")))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let in_memory = storage.get("collide").unwrap();
        storage.close().await.unwrap();

        let reopened = FileStorage::open(&path, strict()).unwrap();
        assert_eq!(reopened.get("collide"), Some(in_memory));
    }
}
