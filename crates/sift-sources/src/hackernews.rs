//! HackerNews adapter backed by the official Firebase API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use sift_core::{Item, ProjectConfig};

use crate::{http_client, SourceAdapter, SourceError};

const PUBLIC_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

/// With keyword filtering we scan deeper into the top-stories list,
/// capped at this multiple of the requested limit.
const KEYWORD_SCAN_FACTOR: usize = 10;

// HN text fields carry inline HTML.
fn tag_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("constant pattern"))
}

/// Firebase-API client for HackerNews top stories.
pub struct HackerNewsSource {
    client: reqwest::Client,
    base_url: String,
}

impl HackerNewsSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_base_url(http_client()?, PUBLIC_BASE_URL))
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<T, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                adapter: "hackernews",
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    fn story_to_item(&self, story: HnStory, fetched_at: DateTime<Utc>) -> Option<Item> {
        if story.deleted || story.dead || story.kind.as_deref() != Some("story") {
            return None;
        }
        let raw_id = story.id?;
        let created_at = DateTime::from_timestamp(story.time.unwrap_or(0), 0)?;
        let content = tag_pattern()
            .replace_all(story.text.as_deref().unwrap_or(""), " ")
            .trim()
            .to_string();

        Some(Item {
            id: Item::prefixed_id("hackernews", &raw_id.to_string()),
            source: "hackernews".to_string(),
            community: None,
            title: story.title.unwrap_or_else(|| "[No title]".to_string()),
            author: story.by.unwrap_or_else(|| "[deleted]".to_string()),
            score: story.score.unwrap_or(0),
            comment_count: story.descendants.unwrap_or(0),
            created_at,
            url: format!("https://news.ycombinator.com/item?id={raw_id}"),
            content,
            fetched_at,
        })
    }
}

fn matches_keywords(story: &HnStory, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = format!(
        "{} {}",
        story.title.as_deref().unwrap_or(""),
        story.text.as_deref().unwrap_or("")
    )
    .to_lowercase();
    keywords
        .iter()
        .any(|keyword| haystack.contains(&keyword.to_lowercase()))
}

#[async_trait]
impl SourceAdapter for HackerNewsSource {
    fn name(&self) -> &'static str {
        "hackernews"
    }

    async fn fetch(&self, config: &ProjectConfig, limit: usize) -> Result<Vec<Item>, SourceError> {
        let story_ids: Vec<u64> = self.get_json("topstories.json").await?;
        let scan_cap = if config.hn_keywords.is_empty() {
            limit
        } else {
            limit.saturating_mul(KEYWORD_SCAN_FACTOR)
        };
        debug!(
            available = story_ids.len(),
            scan_cap, "scanning hackernews top stories"
        );

        let fetched_at = Utc::now();
        let mut items = Vec::new();
        for story_id in story_ids.into_iter().take(scan_cap) {
            if items.len() >= limit {
                break;
            }
            let story: Option<HnStory> = match self.get_json(&format!("item/{story_id}.json")).await
            {
                Ok(story) => story,
                Err(error) => {
                    warn!(story_id, %error, "skipping story");
                    continue;
                }
            };
            let Some(story) = story else { continue };
            if !matches_keywords(&story, &config.hn_keywords) {
                continue;
            }
            if let Some(item) = self.story_to_item(story, fetched_at) {
                items.push(item);
            }
        }
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct HnStory {
    id: Option<u64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    by: Option<String>,
    score: Option<i64>,
    descendants: Option<i64>,
    time: Option<i64>,
    text: Option<String>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}
