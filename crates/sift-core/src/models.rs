//! Canonical data models persisted by the cache store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::taxonomy::Category;

/// A canonical content unit from any source.
///
/// Identity fields are immutable once stored; only `content` may change,
/// exactly once, when the retention policy truncates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Globally unique, source-prefixed id (`reddit_abc123`, `hn_8863`).
    pub id: String,
    pub source: String,
    /// Origin sub-context, e.g. a subreddit name. Absent for sources
    /// without sub-communities.
    pub community: Option<String>,
    pub title: String,
    pub author: String,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub content: String,
    pub fetched_at: DateTime<Utc>,
}

impl Item {
    /// Builds the globally unique id for a raw source-local id.
    pub fn prefixed_id(source: &str, raw_id: &str) -> String {
        match source {
            "hackernews" => format!("hn_{raw_id}"),
            other => format!("{other}_{raw_id}"),
        }
    }
}

/// A judgment about one item within one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub item_id: String,
    pub project: String,
    pub category: Category,
    /// Always within [0, 1]; clamped at parse time.
    pub confidence: f64,
    pub red_flags: Vec<String>,
    pub topic_tags: Vec<String>,
    pub format_tag: Option<String>,
    pub reasoning: String,
    pub model_version: String,
    pub classified_at: DateTime<Utc>,
    /// Set exactly once by the digest selector, never cleared.
    pub sent_in_digest_at: Option<DateTime<Utc>>,
}

impl Classification {
    /// True when this row is still eligible for digest selection.
    pub fn is_pending(&self) -> bool {
        self.sent_in_digest_at.is_none()
    }
}

/// One narrated story within a generated digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DigestStory {
    /// Stable id of the form `{date}_{sequence:02}_{index:03}`.
    pub id: String,
    pub item_id: String,
    pub title: String,
    pub body: String,
    pub commentary: String,
    pub source: String,
    pub url: String,
    pub category: Category,
    pub topic_tags: Vec<String>,
    pub format_tag: Option<String>,
}

/// Lifecycle status of a saved bookmark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkStatus {
    ToRead,
    ToImplement,
    Done,
}

impl BookmarkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookmarkStatus::ToRead => "to_read",
            BookmarkStatus::ToImplement => "to_implement",
            BookmarkStatus::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<BookmarkStatus> {
        match value {
            "to_read" => Some(BookmarkStatus::ToRead),
            "to_implement" => Some(BookmarkStatus::ToImplement),
            "done" => Some(BookmarkStatus::Done),
            _ => None,
        }
    }
}

/// A user-saved reference to a digest story. Denormalized snapshot; the
/// `item_id` back-reference is soft and may dangle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub story_id: String,
    pub digest_date: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub category: Category,
    pub topic_tags: Vec<String>,
    pub format_tag: Option<String>,
    pub item_id: Option<String>,
    pub notes: Option<String>,
    pub status: BookmarkStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One recorded ingest run for a community/source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanRecord {
    pub community: String,
    pub source: String,
    pub project: String,
    pub fetched: usize,
    pub newly_classified: usize,
    pub cache_hits: usize,
    pub signal_ratio: f64,
    pub scanned_at: DateTime<Utc>,
}

/// Condensed item info for report tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub comment_count: i64,
    pub url: String,
    pub category: Category,
    pub confidence: f64,
}

/// Aggregated analysis of one scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanReport {
    pub community: String,
    pub period: String,
    pub total_items: usize,
    pub category_counts: HashMap<Category, usize>,
    pub signal_ratio: f64,
    pub red_flag_counts: HashMap<String, usize>,
    pub top_signal: Vec<ItemSummary>,
    pub top_noise: Vec<ItemSummary>,
}

impl ScanReport {
    /// Builds a report from matched items and classifications.
    pub fn build(
        community: &str,
        period: &str,
        items: &[Item],
        classifications: &[Classification],
    ) -> ScanReport {
        let item_lookup: HashMap<&str, &Item> =
            items.iter().map(|item| (item.id.as_str(), item)).collect();

        let mut category_counts: HashMap<Category, usize> = HashMap::new();
        let mut red_flag_counts: HashMap<String, usize> = HashMap::new();
        for classification in classifications {
            *category_counts.entry(classification.category).or_default() += 1;
            for flag in &classification.red_flags {
                *red_flag_counts.entry(flag.clone()).or_default() += 1;
            }
        }

        let signal_count = classifications
            .iter()
            .filter(|classification| classification.category.is_signal())
            .count();
        let signal_ratio = if classifications.is_empty() {
            0.0
        } else {
            signal_count as f64 / classifications.len() as f64
        };

        let top_by = |predicate: fn(Category) -> bool| -> Vec<ItemSummary> {
            let mut matched: Vec<&Classification> = classifications
                .iter()
                .filter(|classification| predicate(classification.category))
                .collect();
            matched.sort_by(|left, right| {
                right
                    .confidence
                    .partial_cmp(&left.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            matched
                .iter()
                .filter_map(|classification| {
                    let item = item_lookup.get(classification.item_id.as_str())?;
                    Some(ItemSummary {
                        id: item.id.clone(),
                        title: item.title.clone(),
                        score: item.score,
                        comment_count: item.comment_count,
                        url: item.url.clone(),
                        category: classification.category,
                        confidence: classification.confidence,
                    })
                })
                .take(5)
                .collect()
        };

        ScanReport {
            community: community.to_string(),
            period: period.to_string(),
            total_items: items.len(),
            category_counts,
            signal_ratio,
            red_flag_counts,
            top_signal: top_by(Category::is_signal),
            top_noise: top_by(Category::is_noise),
        }
    }

    /// Letter grade for the community's signal ratio.
    pub fn health_grade(&self) -> &'static str {
        match self.signal_ratio {
            ratio if ratio >= 0.8 => "A+",
            ratio if ratio >= 0.7 => "A",
            ratio if ratio >= 0.6 => "B",
            ratio if ratio >= 0.5 => "C",
            ratio if ratio >= 0.4 => "D",
            _ => "F",
        }
    }
}
