use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::recent::RecentSearchEntry;

/// Persistence seam for the recent-search cache.
///
/// The store holds a single slot with the full entry list, most-recent-first;
/// an absent slot is an empty list. The cache is constructed with an
/// implementation, never with ambient global storage.
#[async_trait]
pub trait RecentStorage: Send + Sync {
    /// Read the persisted entry list. `Ok(None)` means the slot was never
    /// written, which callers treat the same as an empty list.
    async fn load(&self) -> Result<Option<Vec<RecentSearchEntry>>, StoreError>;

    /// Replace the slot with a full snapshot of the entry list.
    async fn save(&self, entries: &[RecentSearchEntry]) -> Result<(), StoreError>;

    /// Remove the slot entirely.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory implementation of [`RecentStorage`].
#[derive(Default)]
pub struct InMemoryRecentStorage {
    slot: Mutex<Option<Vec<RecentSearchEntry>>>,
}

impl InMemoryRecentStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecentStorage for InMemoryRecentStorage {
    async fn load(&self) -> Result<Option<Vec<RecentSearchEntry>>, StoreError> {
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn save(&self, entries: &[RecentSearchEntry]) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = Some(entries.to_vec());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

/// File-backed implementation of [`RecentStorage`].
///
/// One JSON file holding the serialized entry array. A missing file is an
/// empty slot; undecodable content surfaces as a [`StoreError`] for the cache
/// layer to treat as corruption.
pub struct FileRecentStorage {
    path: PathBuf,
}

impl FileRecentStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecentStorage for FileRecentStorage {
    async fn load(&self) -> Result<Option<Vec<RecentSearchEntry>>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let entries = serde_json::from_str(&raw)?;
        Ok(Some(entries))
    }

    async fn save(&self, entries: &[RecentSearchEntry]) -> Result<(), StoreError> {
        let raw = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(title: &str) -> RecentSearchEntry {
        RecentSearchEntry {
            title: title.to_string(),
            searched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn file_storage_round_trips_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileRecentStorage::new(dir.path().join("recent.json"));

        assert!(storage.load().await.unwrap().is_none());

        let entries = vec![entry("Inception"), entry("Up")];
        storage.save(&entries).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "Inception");
        assert_eq!(loaded[1].title, "Up");
    }

    #[tokio::test]
    async fn file_storage_clear_removes_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileRecentStorage::new(dir.path().join("recent.json"));

        storage.save(&[entry("Inception")]).await.unwrap();
        storage.clear().await.unwrap();
        assert!(storage.load().await.unwrap().is_none());

        // Clearing an already-absent slot is not an error.
        storage.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_storage_surfaces_garbage_as_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent.json");
        tokio::fs::write(&path, "not json at all").await.unwrap();

        let storage = FileRecentStorage::new(path);
        assert!(matches!(
            storage.load().await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn file_storage_rejects_non_array_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recent.json");
        tokio::fs::write(&path, r#"{"title": "Inception"}"#).await.unwrap();

        let storage = FileRecentStorage::new(path);
        assert!(matches!(
            storage.load().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
