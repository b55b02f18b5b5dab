//! Ingest orchestration: cache lookup, classification, retention,
//! persistence.
//!
//! A store outage is not fatal. The run degrades to a no-cache mode
//! where every item is treated as new and nothing is persisted; a
//! warning is the only trace.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use sift_classifier::BatchClassifier;
use sift_core::{retain, Classification, Item, ProjectConfig};
use sift_store::ContentStore;

/// Counters reported after one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub fetched: usize,
    pub cache_hits: usize,
    pub newly_classified: usize,
    pub fallbacks: usize,
    /// False when the run degraded to no-cache mode.
    pub persisted: bool,
}

/// Everything a caller needs to render or record the run.
#[derive(Debug)]
pub struct IngestOutcome {
    pub summary: ScanSummary,
    /// Items as persisted, content already passed through retention.
    pub items: Vec<Item>,
    /// Cached plus newly produced classifications, one per item.
    pub classifications: Vec<Classification>,
}

/// Runs fetch results through cache, classifier, retention, and store.
pub struct IngestPipeline {
    store: Arc<dyn ContentStore>,
    classifier: BatchClassifier,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn ContentStore>, classifier: BatchClassifier) -> Self {
        Self { store, classifier }
    }

    /// Ingests `items` for the project named by `config`. Classification
    /// sees the full content; retention truncates before anything is
    /// persisted.
    pub async fn run(&self, items: Vec<Item>, config: &ProjectConfig) -> IngestOutcome {
        let project = config.name.as_str();
        let item_ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();

        let mut cache_available = true;
        let cached: HashMap<String, Classification> = match self
            .store
            .lookup_classifications(&item_ids, project)
            .await
        {
            Ok(cached) => cached,
            Err(error) => {
                warn!(%error, "cache unavailable, continuing without persistence");
                cache_available = false;
                HashMap::new()
            }
        };

        let (hits, misses): (Vec<Item>, Vec<Item>) = items
            .into_iter()
            .partition(|item| cached.contains_key(&item.id));

        info!(
            fetched = item_ids.len(),
            cache_hits = hits.len(),
            to_classify = misses.len(),
            "ingesting items"
        );

        let outcome = self
            .classifier
            .classify(&misses, project, &config.topic)
            .await;

        let mut persisted_items = Vec::new();
        let mut classifications: Vec<Classification> = cached.into_values().collect();

        for mut item in misses {
            let Some(classification) = outcome.classifications.get(&item.id) else {
                // The classifier guarantees one result per item; a miss
                // here is a bug, not a runtime condition.
                warn!(item_id = %item.id, "classifier returned no result for item");
                continue;
            };

            item.content = retain(classification.category, &item.content).into_owned();

            if cache_available {
                if let Err(error) = self.store.save_item(&item).await {
                    warn!(item_id = %item.id, %error, "failed to persist item");
                    cache_available = false;
                } else if let Err(error) = self.store.upsert_classification(classification).await {
                    warn!(item_id = %item.id, %error, "failed to persist classification");
                    cache_available = false;
                }
            }

            classifications.push(classification.clone());
            persisted_items.push(item);
        }

        persisted_items.extend(hits);

        IngestOutcome {
            summary: ScanSummary {
                fetched: item_ids.len(),
                cache_hits: classifications.len() - outcome.classifications.len(),
                newly_classified: outcome.classifications.len(),
                fallbacks: outcome.fallbacks,
                persisted: cache_available,
            },
            items: persisted_items,
            classifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IngestPipeline;
    use async_trait::async_trait;
    use chrono::Utc;
    use sift_ai::{AiError, ChatRequest, ChatResponse, ChatUsage, LlmClient};
    use sift_classifier::{BatchClassifier, ClassifierConfig};
    use sift_core::{Category, Classification, Item, ProjectConfig};
    use sift_store::{ContentStore, InMemoryContentStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Labels everything as the category encoded in each item id suffix,
    /// or technical by default.
    struct EchoClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let prompt = &request.messages[1].text;
            let mut entries = Vec::new();
            for line in prompt.lines() {
                let Some(raw) = line.trim().strip_prefix("\"item_id\": \"") else {
                    continue;
                };
                let id = raw.trim_end_matches("\",").trim_end_matches('"');
                let category = if id.ends_with("noise") {
                    "engagement_bait"
                } else {
                    "technical"
                };
                entries.push(format!(
                    r#"{{"item_id": "{id}", "category": "{category}", "confidence": 0.9,
                        "red_flags": [], "topic_tags": [], "format_tag": null,
                        "reasoning": "ok"}}"#
                ));
            }
            Ok(ChatResponse {
                text: format!("[{}]", entries.join(",")),
                model: "echo".to_string(),
                finish_reason: None,
                usage: ChatUsage::default(),
            })
        }
    }

    fn pipeline(store: Arc<dyn ContentStore>) -> (IngestPipeline, Arc<EchoClient>) {
        let client = Arc::new(EchoClient {
            calls: AtomicUsize::new(0),
        });
        let classifier = BatchClassifier::new(client.clone(), ClassifierConfig::default());
        (IngestPipeline::new(store, classifier), client)
    }

    fn config() -> ProjectConfig {
        ProjectConfig {
            name: "p1".to_string(),
            description: String::new(),
            topic: "agents".to_string(),
            subreddits: vec!["ClaudeAI".to_string()],
            hn_keywords: Vec::new(),
            min_confidence: 0.7,
        }
    }

    fn item(id: &str, content: &str) -> Item {
        Item {
            id: id.to_string(),
            source: "reddit".to_string(),
            community: Some("ClaudeAI".to_string()),
            title: format!("title {id}"),
            author: "someone".to_string(),
            score: 1,
            comment_count: 0,
            created_at: Utc::now(),
            url: format!("https://example.com/{id}"),
            content: content.to_string(),
            fetched_at: Utc::now(),
        }
    }

    fn cached_classification(item_id: &str) -> Classification {
        Classification {
            item_id: item_id.to_string(),
            project: "p1".to_string(),
            category: Category::Technical,
            confidence: 0.95,
            red_flags: Vec::new(),
            topic_tags: Vec::new(),
            format_tag: None,
            reasoning: "cached".to_string(),
            model_version: "echo".to_string(),
            classified_at: Utc::now(),
            sent_in_digest_at: None,
        }
    }

    #[tokio::test]
    async fn cached_items_are_not_reclassified_and_batches_split_at_twenty() {
        let store = Arc::new(InMemoryContentStore::new());
        for n in 0..5 {
            let id = format!("reddit_cached_{n}");
            store.save_item(&item(&id, "body")).await.expect("save");
            store
                .upsert_classification(&cached_classification(&id))
                .await
                .expect("upsert");
        }

        let mut items: Vec<Item> = (0..25)
            .map(|n| item(&format!("reddit_new_{n}"), "body"))
            .collect();
        items.extend((0..5).map(|n| item(&format!("reddit_cached_{n}"), "body")));

        let (pipeline, client) = pipeline(store.clone());
        let outcome = pipeline.run(items, &config()).await;

        assert_eq!(outcome.summary.fetched, 30);
        assert_eq!(outcome.summary.cache_hits, 5);
        assert_eq!(outcome.summary.newly_classified, 25);
        assert_eq!(outcome.summary.fallbacks, 0);
        assert!(outcome.summary.persisted);
        assert_eq!(outcome.classifications.len(), 30);
        // 25 new items at batch size 20 means exactly two requests.
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retention_truncates_signal_content_to_five_thousand_chars() {
        let store = Arc::new(InMemoryContentStore::new());
        let long_body = "x".repeat(6_000);

        let (pipeline, _) = pipeline(store.clone());
        let outcome = pipeline
            .run(vec![item("reddit_long", &long_body)], &config())
            .await;

        assert_eq!(outcome.items[0].content.chars().count(), 5_000);
        let stored = store
            .get_item("reddit_long")
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.content.chars().count(), 5_000);
    }

    #[tokio::test]
    async fn noise_content_is_truncated_to_five_hundred_chars() {
        let store = Arc::new(InMemoryContentStore::new());
        let body = "y".repeat(2_000);

        let (pipeline, _) = pipeline(store.clone());
        let outcome = pipeline
            .run(vec![item("reddit_noise", &body)], &config())
            .await;

        assert_eq!(outcome.items[0].content.chars().count(), 500);
    }

    #[tokio::test]
    async fn store_failure_degrades_to_no_cache_mode() {
        struct BrokenStore;

        #[async_trait]
        impl ContentStore for BrokenStore {
            async fn save_item(&self, _: &Item) -> sift_store::StoreResult<bool> {
                Err(broken())
            }
            async fn get_item(&self, _: &str) -> sift_store::StoreResult<Option<Item>> {
                Err(broken())
            }
            async fn lookup_classifications(
                &self,
                _: &[String],
                _: &str,
            ) -> sift_store::StoreResult<std::collections::HashMap<String, Classification>>
            {
                Err(broken())
            }
            async fn upsert_classification(
                &self,
                _: &Classification,
            ) -> sift_store::StoreResult<()> {
                Err(broken())
            }
            async fn pending_for_digest(
                &self,
                _: &str,
                _: &[Category],
                _: f64,
                _: usize,
            ) -> sift_store::StoreResult<Vec<sift_store::PendingStory>> {
                Err(broken())
            }
            async fn mark_sent(
                &self,
                _: &[String],
                _: &str,
                _: chrono::DateTime<chrono::Utc>,
            ) -> sift_store::StoreResult<()> {
                Err(broken())
            }
            async fn record_digest(
                &self,
                _: &str,
                _: &str,
                _: chrono::DateTime<chrono::Utc>,
                _: usize,
            ) -> sift_store::StoreResult<()> {
                Err(broken())
            }
            async fn record_scan(
                &self,
                _: &sift_core::ScanRecord,
            ) -> sift_store::StoreResult<()> {
                Err(broken())
            }
            async fn scan_history(
                &self,
                _: Option<&str>,
                _: usize,
            ) -> sift_store::StoreResult<Vec<sift_core::ScanRecord>> {
                Err(broken())
            }
            async fn add_bookmark(
                &self,
                _: &sift_core::Bookmark,
            ) -> sift_store::StoreResult<()> {
                Err(broken())
            }
            async fn list_bookmarks(
                &self,
                _: Option<sift_core::BookmarkStatus>,
                _: usize,
            ) -> sift_store::StoreResult<Vec<sift_core::Bookmark>> {
                Err(broken())
            }
            async fn update_bookmark_status(
                &self,
                _: &str,
                _: sift_core::BookmarkStatus,
            ) -> sift_store::StoreResult<bool> {
                Err(broken())
            }
            async fn stats(&self) -> sift_store::StoreResult<sift_store::StoreStats> {
                Err(broken())
            }
        }

        fn broken() -> sift_store::StoreError {
            sift_store::StoreError::Io(std::io::Error::other("store offline"))
        }

        let (pipeline, _) = pipeline(Arc::new(BrokenStore));
        let outcome = pipeline
            .run(vec![item("reddit_a", "body")], &config())
            .await;

        assert!(!outcome.summary.persisted);
        assert_eq!(outcome.summary.cache_hits, 0);
        assert_eq!(outcome.summary.newly_classified, 1);
        assert_eq!(outcome.classifications.len(), 1);
    }
}
