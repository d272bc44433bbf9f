use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::storage::RecentStorage;

/// Upper bound on retained recent searches.
pub const MAX_RECENT: usize = 8;

/// One past successful query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSearchEntry {
    pub title: String,
    pub searched_at: DateTime<Utc>,
}

/// Ordered, deduplicated, size-bounded list of past successful queries,
/// persisted in full on every mutation.
///
/// The list is the single owned copy; callers get snapshots. Each operation
/// holds the list lock across its read-modify-write including the save, so no
/// other mutation can interleave inside a `record` or `clear`. Storage
/// failures never propagate: a cache is not a source of truth, so malformed
/// or unreadable persisted content degrades to an empty list.
pub struct RecentSearches {
    storage: Arc<dyn RecentStorage>,
    entries: Mutex<Vec<RecentSearchEntry>>,
}

impl RecentSearches {
    pub fn new(storage: Arc<dyn RecentStorage>) -> Self {
        Self {
            storage,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Read the persisted slot, replacing the in-memory list. Called once at
    /// controller start.
    pub async fn load(&self) -> Vec<RecentSearchEntry> {
        let mut loaded = match self.storage.load().await {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "recent-search store unreadable, starting empty");
                Vec::new()
            }
        };
        loaded.truncate(MAX_RECENT);

        let mut entries = self.entries.lock().await;
        *entries = loaded.clone();
        loaded
    }

    /// Move-to-front insertion with case-insensitive dedup, truncated to the
    /// most recent [`MAX_RECENT`], persisted as a full snapshot.
    pub async fn record(&self, title: &str) -> Vec<RecentSearchEntry> {
        let mut entries = self.entries.lock().await;

        let key = title.to_lowercase();
        let mut next = Vec::with_capacity(entries.len() + 1);
        next.push(RecentSearchEntry {
            title: title.to_string(),
            searched_at: Utc::now(),
        });
        next.extend(
            entries
                .iter()
                .filter(|entry| entry.title.to_lowercase() != key)
                .cloned(),
        );
        next.truncate(MAX_RECENT);

        if let Err(err) = self.storage.save(&next).await {
            warn!(error = %err, "failed to persist recent searches");
        }

        *entries = next.clone();
        next
    }

    /// Empty both the persisted slot and the in-memory list, returning the
    /// now-empty sequence.
    pub async fn clear(&self) -> Vec<RecentSearchEntry> {
        let mut entries = self.entries.lock().await;
        if let Err(err) = self.storage.clear().await {
            warn!(error = %err, "failed to clear recent-search store");
        }
        entries.clear();
        entries.clone()
    }

    /// Snapshot of the current list, most-recent-first.
    pub async fn entries(&self) -> Vec<RecentSearchEntry> {
        self.entries.lock().await.clone()
    }
}
