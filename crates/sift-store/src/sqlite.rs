//! SQLite-backed `ContentStore` implementation with durable persistence.

use crate::{ContentStore, PendingStory, StoreError, StoreResult, StoreStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sift_core::{Bookmark, BookmarkStatus, Category, Classification, Item, ScanRecord};

/// Persistent SQLite store used by ingest and digest runs.
#[derive(Debug)]
pub struct SqliteContentStore {
    db_path: PathBuf,
}

impl SqliteContentStore {
    /// Creates a SQLite-backed store at `path`, creating schema if needed.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { db_path };
        let connection = store.open_connection()?;
        store.initialize_schema(&connection)?;
        Ok(store)
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            "#,
        )?;
        Ok(connection)
    }

    fn initialize_schema(&self, connection: &Connection) -> StoreResult<()> {
        connection.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                community TEXT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                score INTEGER NOT NULL,
                comment_count INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                url TEXT NOT NULL,
                content TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS classifications (
                classification_id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id TEXT NOT NULL,
                project TEXT NOT NULL,
                category TEXT NOT NULL,
                confidence REAL NOT NULL,
                red_flags_json TEXT NOT NULL,
                topic_tags_json TEXT NOT NULL,
                format_tag TEXT NULL,
                reasoning TEXT NOT NULL,
                model_version TEXT NOT NULL,
                classified_at TEXT NOT NULL,
                sent_in_digest_at TEXT NULL,
                UNIQUE (item_id, project),
                FOREIGN KEY (item_id) REFERENCES items (id)
            );

            CREATE INDEX IF NOT EXISTS idx_classifications_pending
                ON classifications (project, sent_in_digest_at, classified_at);

            CREATE TABLE IF NOT EXISTS digests (
                digest_id TEXT PRIMARY KEY,
                project TEXT NOT NULL,
                generated_at TEXT NOT NULL,
                story_count INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bookmarks (
                story_id TEXT PRIMARY KEY,
                digest_date TEXT NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                source TEXT NOT NULL,
                category TEXT NOT NULL,
                topic_tags_json TEXT NOT NULL,
                format_tag TEXT NULL,
                item_id TEXT NULL,
                notes TEXT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS scan_history (
                scan_id INTEGER PRIMARY KEY AUTOINCREMENT,
                community TEXT NOT NULL,
                source TEXT NOT NULL,
                project TEXT NOT NULL,
                fetched INTEGER NOT NULL,
                newly_classified INTEGER NOT NULL,
                cache_hits INTEGER NOT NULL,
                signal_ratio REAL NOT NULL,
                scanned_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn save_item(&self, item: &Item) -> StoreResult<bool> {
        let connection = self.open_connection()?;
        let changed = connection.execute(
            r#"
            INSERT OR IGNORE INTO items (
                id, source, community, title, author, score, comment_count,
                created_at, url, content, fetched_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                item.id,
                item.source,
                item.community,
                item.title,
                item.author,
                item.score,
                item.comment_count,
                timestamp_to_db(item.created_at),
                item.url,
                item.content,
                timestamp_to_db(item.fetched_at),
            ],
        )?;
        Ok(changed > 0)
    }

    async fn get_item(&self, item_id: &str) -> StoreResult<Option<Item>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare(
            r#"
            SELECT id, source, community, title, author, score, comment_count,
                   created_at, url, content, fetched_at
            FROM items
            WHERE id = ?1
            "#,
        )?;
        let mut rows = statement.query(params![item_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(item_from_row(row)?)),
            None => Ok(None),
        }
    }

    async fn lookup_classifications(
        &self,
        item_ids: &[String],
        project: &str,
    ) -> StoreResult<HashMap<String, Classification>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let connection = self.open_connection()?;
        let placeholders = vec!["?"; item_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT item_id, project, category, confidence, red_flags_json,
                   topic_tags_json, format_tag, reasoning, model_version,
                   classified_at, sent_in_digest_at
            FROM classifications
            WHERE project = ? AND item_id IN ({placeholders})
            "#,
        );

        let mut values: Vec<String> = vec![project.to_string()];
        values.extend(item_ids.iter().cloned());

        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query(params_from_iter(values))?;

        let mut found = HashMap::new();
        while let Some(row) = rows.next()? {
            let classification = classification_from_row(row, 0)?;
            found.insert(classification.item_id.clone(), classification);
        }
        Ok(found)
    }

    async fn upsert_classification(&self, classification: &Classification) -> StoreResult<()> {
        let connection = self.open_connection()?;
        // sent_in_digest_at is deliberately absent from the DO UPDATE SET
        // list: a reclassification must never clear the digest marker.
        connection.execute(
            r#"
            INSERT INTO classifications (
                item_id, project, category, confidence, red_flags_json,
                topic_tags_json, format_tag, reasoning, model_version,
                classified_at, sent_in_digest_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)
            ON CONFLICT (item_id, project) DO UPDATE SET
                category = excluded.category,
                confidence = excluded.confidence,
                red_flags_json = excluded.red_flags_json,
                topic_tags_json = excluded.topic_tags_json,
                format_tag = excluded.format_tag,
                reasoning = excluded.reasoning,
                model_version = excluded.model_version,
                classified_at = excluded.classified_at
            "#,
            params![
                classification.item_id,
                classification.project,
                classification.category.as_str(),
                classification.confidence,
                serde_json::to_string(&classification.red_flags)?,
                serde_json::to_string(&classification.topic_tags)?,
                classification.format_tag,
                classification.reasoning,
                classification.model_version,
                timestamp_to_db(classification.classified_at),
            ],
        )?;
        Ok(())
    }

    async fn pending_for_digest(
        &self,
        project: &str,
        categories: &[Category],
        min_confidence: f64,
        limit: usize,
    ) -> StoreResult<Vec<PendingStory>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let connection = self.open_connection()?;
        let placeholders = vec!["?"; categories.len()].join(", ");
        let sql = format!(
            r#"
            SELECT
                i.id, i.source, i.community, i.title, i.author, i.score,
                i.comment_count, i.created_at, i.url, i.content, i.fetched_at,
                c.item_id, c.project, c.category, c.confidence, c.red_flags_json,
                c.topic_tags_json, c.format_tag, c.reasoning, c.model_version,
                c.classified_at, c.sent_in_digest_at
            FROM classifications c
            JOIN items i ON i.id = c.item_id
            WHERE c.project = ?
              AND c.sent_in_digest_at IS NULL
              AND c.confidence >= ?
              AND c.category IN ({placeholders})
            ORDER BY c.classified_at ASC
            LIMIT ?
            "#,
        );

        let mut values: Vec<rusqlite::types::Value> = vec![
            project.to_string().into(),
            min_confidence.into(),
        ];
        for category in categories {
            values.push(category.as_str().to_string().into());
        }
        values.push((limit as i64).into());

        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query(params_from_iter(values))?;

        let mut pending = Vec::new();
        while let Some(row) = rows.next()? {
            let item = item_from_row(row)?;
            let classification = classification_from_row(row, 11)?;
            pending.push(PendingStory {
                item,
                classification,
            });
        }
        Ok(pending)
    }

    async fn mark_sent(
        &self,
        item_ids: &[String],
        project: &str,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if item_ids.is_empty() {
            return Ok(());
        }

        let mut connection = self.open_connection()?;
        let transaction = connection.transaction()?;
        {
            let placeholders = vec!["?"; item_ids.len()].join(", ");
            let sql = format!(
                r#"
                UPDATE classifications
                SET sent_in_digest_at = ?
                WHERE project = ?
                  AND sent_in_digest_at IS NULL
                  AND item_id IN ({placeholders})
                "#,
            );
            let mut values: Vec<String> =
                vec![timestamp_to_db(sent_at), project.to_string()];
            values.extend(item_ids.iter().cloned());
            transaction.execute(&sql, params_from_iter(values))?;
        }
        transaction.commit()?;
        Ok(())
    }

    async fn record_digest(
        &self,
        digest_id: &str,
        project: &str,
        generated_at: DateTime<Utc>,
        story_count: usize,
    ) -> StoreResult<()> {
        let connection = self.open_connection()?;
        connection.execute(
            r#"
            INSERT OR IGNORE INTO digests (digest_id, project, generated_at, story_count)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                digest_id,
                project,
                timestamp_to_db(generated_at),
                story_count as i64
            ],
        )?;
        Ok(())
    }

    async fn record_scan(&self, record: &ScanRecord) -> StoreResult<()> {
        let connection = self.open_connection()?;
        connection.execute(
            r#"
            INSERT INTO scan_history (
                community, source, project, fetched, newly_classified,
                cache_hits, signal_ratio, scanned_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.community,
                record.source,
                record.project,
                record.fetched as i64,
                record.newly_classified as i64,
                record.cache_hits as i64,
                record.signal_ratio,
                timestamp_to_db(record.scanned_at),
            ],
        )?;
        Ok(())
    }

    async fn scan_history(
        &self,
        community: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<ScanRecord>> {
        let connection = self.open_connection()?;
        let sql = if community.is_some() {
            r#"
            SELECT community, source, project, fetched, newly_classified,
                   cache_hits, signal_ratio, scanned_at
            FROM scan_history
            WHERE community = ?1
            ORDER BY scanned_at DESC
            LIMIT ?2
            "#
        } else {
            r#"
            SELECT community, source, project, fetched, newly_classified,
                   cache_hits, signal_ratio, scanned_at
            FROM scan_history
            ORDER BY scanned_at DESC
            LIMIT ?1
            "#
        };

        let mut statement = connection.prepare(sql)?;
        let mut rows = if let Some(community) = community {
            statement.query(params![community, limit as i64])?
        } else {
            statement.query(params![limit as i64])?
        };

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(ScanRecord {
                community: row.get(0)?,
                source: row.get(1)?,
                project: row.get(2)?,
                fetched: i64_to_usize("fetched", row.get(3)?)?,
                newly_classified: i64_to_usize("newly_classified", row.get(4)?)?,
                cache_hits: i64_to_usize("cache_hits", row.get(5)?)?,
                signal_ratio: row.get(6)?,
                scanned_at: timestamp_from_db(&row.get::<_, String>(7)?)?,
            });
        }
        Ok(records)
    }

    async fn add_bookmark(&self, bookmark: &Bookmark) -> StoreResult<()> {
        let connection = self.open_connection()?;
        let changed = connection.execute(
            r#"
            INSERT OR IGNORE INTO bookmarks (
                story_id, digest_date, title, url, source, category,
                topic_tags_json, format_tag, item_id, notes, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                bookmark.story_id,
                bookmark.digest_date,
                bookmark.title,
                bookmark.url,
                bookmark.source,
                bookmark.category.as_str(),
                serde_json::to_string(&bookmark.topic_tags)?,
                bookmark.format_tag,
                bookmark.item_id,
                bookmark.notes,
                bookmark.status.as_str(),
                timestamp_to_db(bookmark.created_at),
                timestamp_to_db(bookmark.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::BookmarkAlreadyExists(bookmark.story_id.clone()));
        }
        Ok(())
    }

    async fn list_bookmarks(
        &self,
        status: Option<BookmarkStatus>,
        limit: usize,
    ) -> StoreResult<Vec<Bookmark>> {
        let connection = self.open_connection()?;
        let sql = if status.is_some() {
            r#"
            SELECT story_id, digest_date, title, url, source, category,
                   topic_tags_json, format_tag, item_id, notes, status,
                   created_at, updated_at
            FROM bookmarks
            WHERE status = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#
        } else {
            r#"
            SELECT story_id, digest_date, title, url, source, category,
                   topic_tags_json, format_tag, item_id, notes, status,
                   created_at, updated_at
            FROM bookmarks
            ORDER BY created_at DESC
            LIMIT ?1
            "#
        };

        let mut statement = connection.prepare(sql)?;
        let mut rows = if let Some(status) = status {
            statement.query(params![status.as_str(), limit as i64])?
        } else {
            statement.query(params![limit as i64])?
        };

        let mut bookmarks = Vec::new();
        while let Some(row) = rows.next()? {
            bookmarks.push(bookmark_from_row(row)?);
        }
        Ok(bookmarks)
    }

    async fn update_bookmark_status(
        &self,
        story_id: &str,
        status: BookmarkStatus,
    ) -> StoreResult<bool> {
        let connection = self.open_connection()?;
        let changed = connection.execute(
            "UPDATE bookmarks SET status = ?1, updated_at = ?2 WHERE story_id = ?3",
            params![status.as_str(), timestamp_to_db(Utc::now()), story_id],
        )?;
        Ok(changed > 0)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let connection = self.open_connection()?;
        let count = |table: &str| -> StoreResult<u64> {
            let value: i64 = connection.query_row(
                &format!("SELECT COUNT(*) FROM {table}"),
                [],
                |row| row.get(0),
            )?;
            u64::try_from(value).map_err(|_| StoreError::InvalidPersistedValue {
                field: "count",
                value: value.to_string(),
            })
        };
        Ok(StoreStats {
            items: count("items")?,
            classifications: count("classifications")?,
            digests: count("digests")?,
            bookmarks: count("bookmarks")?,
        })
    }
}

fn item_from_row(row: &Row<'_>) -> StoreResult<Item> {
    let created_at: String = row.get(7)?;
    let fetched_at: String = row.get(10)?;
    Ok(Item {
        id: row.get(0)?,
        source: row.get(1)?,
        community: row.get(2)?,
        title: row.get(3)?,
        author: row.get(4)?,
        score: row.get(5)?,
        comment_count: row.get(6)?,
        created_at: timestamp_from_db(&created_at)?,
        url: row.get(8)?,
        content: row.get(9)?,
        fetched_at: timestamp_from_db(&fetched_at)?,
    })
}

fn classification_from_row(row: &Row<'_>, base: usize) -> StoreResult<Classification> {
    let category_text: String = row.get(base + 2)?;
    let red_flags_json: String = row.get(base + 4)?;
    let topic_tags_json: String = row.get(base + 5)?;
    let classified_at: String = row.get(base + 9)?;
    let sent_in_digest_at: Option<String> = row.get(base + 10)?;

    Ok(Classification {
        item_id: row.get(base)?,
        project: row.get(base + 1)?,
        category: category_from_db(&category_text)?,
        confidence: row.get(base + 3)?,
        red_flags: serde_json::from_str(&red_flags_json)?,
        topic_tags: serde_json::from_str(&topic_tags_json)?,
        format_tag: row.get(base + 6)?,
        reasoning: row.get(base + 7)?,
        model_version: row.get(base + 8)?,
        classified_at: timestamp_from_db(&classified_at)?,
        sent_in_digest_at: sent_in_digest_at
            .as_deref()
            .map(timestamp_from_db)
            .transpose()?,
    })
}

fn bookmark_from_row(row: &Row<'_>) -> StoreResult<Bookmark> {
    let category_text: String = row.get(5)?;
    let topic_tags_json: String = row.get(6)?;
    let status_text: String = row.get(10)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(Bookmark {
        story_id: row.get(0)?,
        digest_date: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        source: row.get(4)?,
        category: category_from_db(&category_text)?,
        topic_tags: serde_json::from_str(&topic_tags_json)?,
        format_tag: row.get(7)?,
        item_id: row.get(8)?,
        notes: row.get(9)?,
        status: status_from_db(&status_text)?,
        created_at: timestamp_from_db(&created_at)?,
        updated_at: timestamp_from_db(&updated_at)?,
    })
}

fn timestamp_to_db(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn timestamp_from_db(value: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn category_from_db(value: &str) -> StoreResult<Category> {
    Category::parse(value).ok_or_else(|| StoreError::InvalidPersistedValue {
        field: "category",
        value: value.to_string(),
    })
}

fn status_from_db(value: &str) -> StoreResult<BookmarkStatus> {
    BookmarkStatus::parse(value).ok_or_else(|| StoreError::InvalidPersistedValue {
        field: "bookmark_status",
        value: value.to_string(),
    })
}

fn i64_to_usize(field: &'static str, value: i64) -> StoreResult<usize> {
    usize::try_from(value).map_err(|_| StoreError::InvalidPersistedValue {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::SqliteContentStore;
    use crate::test_fixtures::{classification, classification_at, item};
    use crate::ContentStore;
    use chrono::{Duration, Utc};
    use sift_core::{Bookmark, BookmarkStatus, Category, ScanRecord};
    use tempfile::tempdir;

    #[tokio::test]
    async fn persists_items_and_classifications_across_reopen() {
        let temp = tempdir().expect("create tempdir");
        let db_path = temp.path().join("sift.sqlite");

        {
            let store = SqliteContentStore::new(&db_path).expect("create store");
            assert!(store.save_item(&item("reddit_a")).await.expect("save item"));
            store
                .upsert_classification(&classification("reddit_a", "p1", Category::Technical))
                .await
                .expect("upsert");
        }

        let reopened = SqliteContentStore::new(&db_path).expect("reopen store");
        let stored = reopened
            .get_item("reddit_a")
            .await
            .expect("get item")
            .expect("item exists");
        assert_eq!(stored.source, "reddit");

        let cached = reopened
            .lookup_classifications(&["reddit_a".to_string()], "p1")
            .await
            .expect("lookup");
        assert_eq!(cached["reddit_a"].category, Category::Technical);
        assert_eq!(cached["reddit_a"].topic_tags, vec!["agents"]);
    }

    #[tokio::test]
    async fn save_item_never_overwrites_existing_fields() {
        let temp = tempdir().expect("create tempdir");
        let store =
            SqliteContentStore::new(temp.path().join("sift.sqlite")).expect("create store");

        let first = item("reddit_a");
        assert!(store.save_item(&first).await.expect("first save"));

        let mut second = first.clone();
        second.title = "rewritten".to_string();
        second.content = "rewritten body".to_string();
        assert!(!store.save_item(&second).await.expect("second save"));

        let stored = store
            .get_item("reddit_a")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.title, first.title);
        assert_eq!(stored.content, first.content);
    }

    #[tokio::test]
    async fn unique_constraint_scopes_classifications_per_project() {
        let temp = tempdir().expect("create tempdir");
        let store =
            SqliteContentStore::new(temp.path().join("sift.sqlite")).expect("create store");
        store.save_item(&item("hn_1")).await.expect("save");

        store
            .upsert_classification(&classification("hn_1", "p1", Category::Technical))
            .await
            .expect("p1 upsert");
        store
            .upsert_classification(&classification("hn_1", "p1", Category::Outlier))
            .await
            .expect("p1 replace");
        store
            .upsert_classification(&classification("hn_1", "p2", Category::Unrelated))
            .await
            .expect("p2 upsert");

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.classifications, 2);

        let p1 = store
            .lookup_classifications(&["hn_1".to_string()], "p1")
            .await
            .expect("p1 lookup");
        assert_eq!(p1["hn_1"].category, Category::Outlier);
    }

    #[tokio::test]
    async fn upsert_does_not_clear_digest_marker() {
        let temp = tempdir().expect("create tempdir");
        let store =
            SqliteContentStore::new(temp.path().join("sift.sqlite")).expect("create store");
        store.save_item(&item("reddit_a")).await.expect("save");
        store
            .upsert_classification(&classification("reddit_a", "p1", Category::Technical))
            .await
            .expect("upsert");

        let sent_at = Utc::now();
        store
            .mark_sent(&["reddit_a".to_string()], "p1", sent_at)
            .await
            .expect("mark sent");
        store
            .upsert_classification(&classification("reddit_a", "p1", Category::Troubleshooting))
            .await
            .expect("forced reclassification");

        let rows = store
            .lookup_classifications(&["reddit_a".to_string()], "p1")
            .await
            .expect("lookup");
        let marker = rows["reddit_a"].sent_in_digest_at.expect("marker kept");
        assert_eq!(marker.timestamp(), sent_at.timestamp());

        let pending = store
            .pending_for_digest("p1", &Category::SIGNAL, 0.0, 10)
            .await
            .expect("pending");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn pending_filters_by_category_confidence_and_order() {
        let temp = tempdir().expect("create tempdir");
        let store =
            SqliteContentStore::new(temp.path().join("sift.sqlite")).expect("create store");

        let base = Utc::now();
        for (id, category, confidence, offset) in [
            ("reddit_old", Category::Technical, 0.9, 0),
            ("reddit_new", Category::Technical, 0.9, 5),
            ("reddit_low", Category::Technical, 0.5, 1),
            ("reddit_meme", Category::Meme, 0.99, 2),
        ] {
            store.save_item(&item(id)).await.expect("save");
            let mut row = classification_at(id, "p1", category, base + Duration::seconds(offset));
            row.confidence = confidence;
            store.upsert_classification(&row).await.expect("upsert");
        }

        let pending = store
            .pending_for_digest("p1", &Category::SIGNAL, 0.8, 10)
            .await
            .expect("pending");
        let ids: Vec<&str> = pending
            .iter()
            .map(|story| story.item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["reddit_old", "reddit_new"]);
    }

    #[tokio::test]
    async fn mark_sent_keeps_first_timestamp() {
        let temp = tempdir().expect("create tempdir");
        let store =
            SqliteContentStore::new(temp.path().join("sift.sqlite")).expect("create store");
        store.save_item(&item("reddit_a")).await.expect("save");
        store
            .upsert_classification(&classification("reddit_a", "p1", Category::Technical))
            .await
            .expect("upsert");

        let first = Utc::now();
        store
            .mark_sent(&["reddit_a".to_string()], "p1", first)
            .await
            .expect("first mark");
        store
            .mark_sent(
                &["reddit_a".to_string()],
                "p1",
                first + Duration::hours(3),
            )
            .await
            .expect("repeat mark");

        let rows = store
            .lookup_classifications(&["reddit_a".to_string()], "p1")
            .await
            .expect("lookup");
        let marker = rows["reddit_a"].sent_in_digest_at.expect("marker");
        assert_eq!(marker.timestamp(), first.timestamp());
    }

    #[tokio::test]
    async fn bookmark_lifecycle_round_trips() {
        let temp = tempdir().expect("create tempdir");
        let store =
            SqliteContentStore::new(temp.path().join("sift.sqlite")).expect("create store");

        let now = Utc::now();
        let bookmark = Bookmark {
            story_id: "2026-08-30_01_003".to_string(),
            digest_date: "2026-08-30".to_string(),
            title: "A useful workflow".to_string(),
            url: "https://example.com/post".to_string(),
            source: "reddit".to_string(),
            category: Category::Technical,
            topic_tags: vec!["mcp".to_string()],
            format_tag: Some("text".to_string()),
            item_id: Some("reddit_a".to_string()),
            notes: Some("try this".to_string()),
            status: BookmarkStatus::ToRead,
            created_at: now,
            updated_at: now,
        };
        store.add_bookmark(&bookmark).await.expect("add");
        assert!(store.add_bookmark(&bookmark).await.is_err());

        let to_read = store
            .list_bookmarks(Some(BookmarkStatus::ToRead), 10)
            .await
            .expect("list");
        assert_eq!(to_read.len(), 1);
        assert_eq!(to_read[0].topic_tags, vec!["mcp"]);

        assert!(store
            .update_bookmark_status("2026-08-30_01_003", BookmarkStatus::Done)
            .await
            .expect("update"));
        assert!(!store
            .update_bookmark_status("missing", BookmarkStatus::Done)
            .await
            .expect("update missing"));

        let done = store
            .list_bookmarks(Some(BookmarkStatus::Done), 10)
            .await
            .expect("list done");
        assert_eq!(done.len(), 1);
    }

    #[tokio::test]
    async fn scan_history_is_newest_first_and_filterable() {
        let temp = tempdir().expect("create tempdir");
        let store =
            SqliteContentStore::new(temp.path().join("sift.sqlite")).expect("create store");

        let base = Utc::now();
        for (community, offset) in [("ClaudeAI", 0), ("LocalLLaMA", 10), ("ClaudeAI", 20)] {
            store
                .record_scan(&ScanRecord {
                    community: community.to_string(),
                    source: "reddit".to_string(),
                    project: "p1".to_string(),
                    fetched: 50,
                    newly_classified: 30,
                    cache_hits: 20,
                    signal_ratio: 0.6,
                    scanned_at: base + Duration::seconds(offset),
                })
                .await
                .expect("record scan");
        }

        let all = store.scan_history(None, 10).await.expect("all history");
        assert_eq!(all.len(), 3);
        assert!(all[0].scanned_at >= all[1].scanned_at);

        let claude = store
            .scan_history(Some("ClaudeAI"), 10)
            .await
            .expect("filtered");
        assert_eq!(claude.len(), 2);
    }
}
