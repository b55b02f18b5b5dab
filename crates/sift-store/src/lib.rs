//! Content store abstractions and in-memory backend.
//!
//! The store is the only shared resource between runs; every write is
//! either insert-if-absent or a keyed upsert, so concurrent runs for the
//! same project are safe under last-writer-wins without advisory locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use sift_core::{Bookmark, BookmarkStatus, Category, Classification, Item, ScanRecord};

mod sqlite;

pub use sqlite::SqliteContentStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bookmark '{0}' already exists")]
    BookmarkAlreadyExists(String),
    #[error("invalid persisted value for '{field}': {value}")]
    InvalidPersistedValue { field: &'static str, value: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A digest candidate: the classification row joined with its item.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingStory {
    pub item: Item,
    pub classification: Classification,
}

/// Aggregate counts reported by `sift info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub items: u64,
    pub classifications: u64,
    pub digests: u64,
    pub bookmarks: u64,
}

/// Async store contract used by the ingest pipeline and digest selector.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Insert-if-absent. Returns true when the item was newly stored;
    /// an existing row is never overwritten.
    async fn save_item(&self, item: &Item) -> StoreResult<bool>;

    async fn get_item(&self, item_id: &str) -> StoreResult<Option<Item>>;

    /// Cached classifications for `item_ids` within one project. Ids
    /// absent from the result are cache misses.
    async fn lookup_classifications(
        &self,
        item_ids: &[String],
        project: &str,
    ) -> StoreResult<HashMap<String, Classification>>;

    /// Replace-on-conflict write keyed by (item_id, project). Never
    /// touches `sent_in_digest_at`, so forced reclassification cannot
    /// resurrect an already-digested item.
    async fn upsert_classification(&self, classification: &Classification) -> StoreResult<()>;

    /// Unsent classifications in the given categories at or above the
    /// confidence threshold, oldest classified first.
    async fn pending_for_digest(
        &self,
        project: &str,
        categories: &[Category],
        min_confidence: f64,
        limit: usize,
    ) -> StoreResult<Vec<PendingStory>>;

    /// Bulk, idempotent digest marking. Rows whose timestamp is already
    /// set keep their original value.
    async fn mark_sent(
        &self,
        item_ids: &[String],
        project: &str,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn record_digest(
        &self,
        digest_id: &str,
        project: &str,
        generated_at: DateTime<Utc>,
        story_count: usize,
    ) -> StoreResult<()>;

    async fn record_scan(&self, record: &ScanRecord) -> StoreResult<()>;

    async fn scan_history(
        &self,
        community: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<ScanRecord>>;

    async fn add_bookmark(&self, bookmark: &Bookmark) -> StoreResult<()>;

    async fn list_bookmarks(
        &self,
        status: Option<BookmarkStatus>,
        limit: usize,
    ) -> StoreResult<Vec<Bookmark>>;

    /// Returns false when the bookmark does not exist.
    async fn update_bookmark_status(
        &self,
        story_id: &str,
        status: BookmarkStatus,
    ) -> StoreResult<bool>;

    async fn stats(&self) -> StoreResult<StoreStats>;
}

/// In-memory implementation used by tests and by the degraded no-cache
/// mode when the SQLite store is unreachable.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    items: HashMap<String, Item>,
    classifications: HashMap<(String, String), Classification>,
    digests: Vec<(String, String, DateTime<Utc>, usize)>,
    scans: Vec<ScanRecord>,
    bookmarks: HashMap<String, Bookmark>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn save_item(&self, item: &Item) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.items.contains_key(&item.id) {
            return Ok(false);
        }
        inner.items.insert(item.id.clone(), item.clone());
        Ok(true)
    }

    async fn get_item(&self, item_id: &str) -> StoreResult<Option<Item>> {
        let inner = self.inner.read().await;
        Ok(inner.items.get(item_id).cloned())
    }

    async fn lookup_classifications(
        &self,
        item_ids: &[String],
        project: &str,
    ) -> StoreResult<HashMap<String, Classification>> {
        let inner = self.inner.read().await;
        let mut found = HashMap::new();
        for item_id in item_ids {
            let key = (item_id.clone(), project.to_string());
            if let Some(classification) = inner.classifications.get(&key) {
                found.insert(item_id.clone(), classification.clone());
            }
        }
        Ok(found)
    }

    async fn upsert_classification(&self, classification: &Classification) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let key = (
            classification.item_id.clone(),
            classification.project.clone(),
        );
        let sent_in_digest_at = inner
            .classifications
            .get(&key)
            .and_then(|existing| existing.sent_in_digest_at);

        let mut row = classification.clone();
        row.sent_in_digest_at = sent_in_digest_at;
        inner.classifications.insert(key, row);
        Ok(())
    }

    async fn pending_for_digest(
        &self,
        project: &str,
        categories: &[Category],
        min_confidence: f64,
        limit: usize,
    ) -> StoreResult<Vec<PendingStory>> {
        let inner = self.inner.read().await;
        let mut pending: Vec<PendingStory> = inner
            .classifications
            .values()
            .filter(|classification| classification.project == project)
            .filter(|classification| classification.sent_in_digest_at.is_none())
            .filter(|classification| categories.contains(&classification.category))
            .filter(|classification| classification.confidence >= min_confidence)
            .filter_map(|classification| {
                let item = inner.items.get(&classification.item_id)?;
                Some(PendingStory {
                    item: item.clone(),
                    classification: classification.clone(),
                })
            })
            .collect();

        pending.sort_by_key(|story| story.classification.classified_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_sent(
        &self,
        item_ids: &[String],
        project: &str,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        for item_id in item_ids {
            let key = (item_id.clone(), project.to_string());
            if let Some(classification) = inner.classifications.get_mut(&key) {
                if classification.sent_in_digest_at.is_none() {
                    classification.sent_in_digest_at = Some(sent_at);
                }
            }
        }
        Ok(())
    }

    async fn record_digest(
        &self,
        digest_id: &str,
        project: &str,
        generated_at: DateTime<Utc>,
        story_count: usize,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.digests.push((
            digest_id.to_string(),
            project.to_string(),
            generated_at,
            story_count,
        ));
        Ok(())
    }

    async fn record_scan(&self, record: &ScanRecord) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.scans.push(record.clone());
        Ok(())
    }

    async fn scan_history(
        &self,
        community: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<ScanRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<ScanRecord> = inner
            .scans
            .iter()
            .filter(|record| community.is_none_or(|name| record.community == name))
            .cloned()
            .collect();
        records.sort_by(|left, right| right.scanned_at.cmp(&left.scanned_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn add_bookmark(&self, bookmark: &Bookmark) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.bookmarks.contains_key(&bookmark.story_id) {
            return Err(StoreError::BookmarkAlreadyExists(bookmark.story_id.clone()));
        }
        inner
            .bookmarks
            .insert(bookmark.story_id.clone(), bookmark.clone());
        Ok(())
    }

    async fn list_bookmarks(
        &self,
        status: Option<BookmarkStatus>,
        limit: usize,
    ) -> StoreResult<Vec<Bookmark>> {
        let inner = self.inner.read().await;
        let mut bookmarks: Vec<Bookmark> = inner
            .bookmarks
            .values()
            .filter(|bookmark| status.is_none_or(|wanted| bookmark.status == wanted))
            .cloned()
            .collect();
        bookmarks.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        bookmarks.truncate(limit);
        Ok(bookmarks)
    }

    async fn update_bookmark_status(
        &self,
        story_id: &str,
        status: BookmarkStatus,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(bookmark) = inner.bookmarks.get_mut(story_id) else {
            return Ok(false);
        };
        bookmark.status = status;
        bookmark.updated_at = Utc::now();
        Ok(true)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let inner = self.inner.read().await;
        Ok(StoreStats {
            items: inner.items.len() as u64,
            classifications: inner.classifications.len() as u64,
            digests: inner.digests.len() as u64,
            bookmarks: inner.bookmarks.len() as u64,
        })
    }
}
