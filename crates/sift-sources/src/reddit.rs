//! Reddit adapter backed by the public JSON listing endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use sift_core::{Item, ProjectConfig};

use crate::{http_client, SourceAdapter, SourceError};

const PUBLIC_BASE_URL: &str = "https://www.reddit.com";

/// Unauthenticated Reddit listing client. One request per configured
/// subreddit, `hot` sort.
pub struct RedditSource {
    client: reqwest::Client,
    base_url: String,
}

impl RedditSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_base_url(http_client()?, PUBLIC_BASE_URL))
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_subreddit(
        &self,
        subreddit: &str,
        limit: usize,
    ) -> Result<Vec<Item>, SourceError> {
        let url = format!(
            "{}/r/{}/hot.json?limit={}&raw_json=1",
            self.base_url, subreddit, limit
        );
        debug!(%subreddit, limit, "fetching reddit listing");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                adapter: "reddit",
                status: status.as_u16(),
            });
        }

        let listing: Listing = response.json().await?;
        let fetched_at = Utc::now();
        let items = listing
            .data
            .children
            .into_iter()
            .filter_map(|child| post_to_item(child.data, fetched_at))
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for RedditSource {
    fn name(&self) -> &'static str {
        "reddit"
    }

    async fn fetch(&self, config: &ProjectConfig, limit: usize) -> Result<Vec<Item>, SourceError> {
        let mut items = Vec::new();
        for subreddit in &config.subreddits {
            match self.fetch_subreddit(subreddit, limit).await {
                Ok(mut fetched) => items.append(&mut fetched),
                Err(error) => {
                    // One bad subreddit should not sink the rest.
                    warn!(%subreddit, %error, "skipping subreddit");
                }
            }
        }
        if items.is_empty() && !config.subreddits.is_empty() {
            return Err(SourceError::Malformed {
                adapter: "reddit",
                detail: "no subreddit produced any items".to_string(),
            });
        }
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    stickied: bool,
}

fn post_to_item(post: RedditPost, fetched_at: DateTime<Utc>) -> Option<Item> {
    if post.id.is_empty() || post.stickied {
        return None;
    }

    let created_at = DateTime::from_timestamp(post.created_utc as i64, 0)?;
    Some(Item {
        id: Item::prefixed_id("reddit", &post.id),
        source: "reddit".to_string(),
        community: Some(post.subreddit),
        title: post.title,
        author: post.author,
        score: post.score,
        comment_count: post.num_comments,
        created_at,
        url: format!("https://www.reddit.com{}", post.permalink),
        content: post.selftext,
        fetched_at,
    })
}

#[cfg(test)]
mod tests {
    use super::RedditSource;
    use crate::{http_client, SourceAdapter};
    use httpmock::prelude::*;
    use serde_json::json;
    use sift_core::ProjectConfig;

    fn config(subreddits: Vec<&str>) -> ProjectConfig {
        ProjectConfig {
            name: "p1".to_string(),
            description: String::new(),
            topic: "agentic coding".to_string(),
            subreddits: subreddits.into_iter().map(String::from).collect(),
            hn_keywords: Vec::new(),
            min_confidence: 0.7,
        }
    }

    fn listing_body(id: &str, subreddit: &str) -> serde_json::Value {
        json!({
            "data": {
                "children": [
                    {"data": {
                        "id": id,
                        "subreddit": subreddit,
                        "title": "a post",
                        "author": "someone",
                        "score": 42,
                        "num_comments": 7,
                        "created_utc": 1756400000.0,
                        "permalink": format!("/r/{subreddit}/comments/{id}/a_post/"),
                        "selftext": "body text"
                    }},
                    {"data": {
                        "id": "pinned",
                        "subreddit": subreddit,
                        "title": "weekly thread",
                        "stickied": true,
                        "created_utc": 1756400000.0
                    }}
                ]
            }
        })
    }

    #[tokio::test]
    async fn fetches_and_normalizes_listing_posts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/r/ClaudeAI/hot.json")
                .query_param("limit", "25");
            then.status(200).json_body(listing_body("abc123", "ClaudeAI"));
        });

        let source = RedditSource::with_base_url(http_client().expect("client"), server.base_url());
        let items = source
            .fetch(&config(vec!["ClaudeAI"]), 25)
            .await
            .expect("fetch");

        mock.assert();
        // Stickied posts are dropped.
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "reddit_abc123");
        assert_eq!(items[0].community.as_deref(), Some("ClaudeAI"));
        assert!(items[0].url.contains("/r/ClaudeAI/comments/abc123/"));
    }

    #[tokio::test]
    async fn one_failing_subreddit_does_not_sink_the_rest() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/r/Broken/hot.json");
            then.status(403).body("forbidden");
        });
        server.mock(|when, then| {
            when.method(GET).path("/r/Works/hot.json");
            then.status(200).json_body(listing_body("ok1", "Works"));
        });

        let source = RedditSource::with_base_url(http_client().expect("client"), server.base_url());
        let items = source
            .fetch(&config(vec!["Broken", "Works"]), 25)
            .await
            .expect("fetch");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].community.as_deref(), Some("Works"));
    }

    #[tokio::test]
    async fn all_subreddits_failing_is_a_source_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/r/Broken/hot.json");
            then.status(500).body("oops");
        });

        let source = RedditSource::with_base_url(http_client().expect("client"), server.base_url());
        let error = source
            .fetch(&config(vec!["Broken"]), 25)
            .await
            .expect_err("all subreddits down");
        assert_eq!(
            error.to_string(),
            "source reddit returned an unexpected payload: no subreddit produced any items"
        );
    }

    #[tokio::test]
    async fn listing_errors_name_the_adapter_and_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/r/Blocked/hot.json");
            then.status(429).body("rate limited");
        });

        let source = RedditSource::with_base_url(http_client().expect("client"), server.base_url());
        let error = source
            .fetch_subreddit("Blocked", 25)
            .await
            .expect_err("listing rejected");
        assert_eq!(error.to_string(), "source reddit returned status 429");
    }
}
