//! Narrative generation for digest stories.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use sift_ai::{AiError, ChatRequest, LlmClient, Message};
use sift_core::Item;

/// Narrated fields for one digest story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrative {
    pub title: String,
    pub body: String,
    pub commentary: String,
}

#[derive(Debug, Error)]
/// Enumerates supported `GenerationError` values.
pub enum GenerationError {
    #[error("narrative service error: {0}")]
    Service(#[from] AiError),
    #[error("narrative response is malformed: {0}")]
    Malformed(String),
}

#[async_trait]
/// Trait contract for `NarrativeGenerator` behavior.
pub trait NarrativeGenerator: Send + Sync {
    /// Produces the narrated fields for one item. `content` is the best
    /// available body text, possibly recovered by a refetch.
    async fn generate(
        &self,
        item: &Item,
        content: &str,
        topic: &str,
    ) -> Result<Narrative, GenerationError>;
}

#[derive(Debug, Clone)]
/// Model settings for the LLM-backed generator.
pub struct NarrativeConfig {
    pub model: String,
    pub max_tokens: u32,
    /// Content is capped before prompting to bound request size.
    pub max_content_chars: usize,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4_096,
            max_content_chars: 10_000,
        }
    }
}

/// LLM-backed narrative generator.
pub struct LlmNarrativeGenerator {
    client: Arc<dyn LlmClient>,
    config: NarrativeConfig,
}

impl LlmNarrativeGenerator {
    pub fn new(client: Arc<dyn LlmClient>, config: NarrativeConfig) -> Self {
        Self { client, config }
    }

    fn prompt(&self, item: &Item, content: &str, topic: &str) -> String {
        let capped: String = content.chars().take(self.config.max_content_chars).collect();
        format!(
            "You are writing one story for a daily digest about: {topic}\n\n\
             Post title: {title}\n\
             Source: {source}\n\
             Community: {community}\n\
             Author: {author}\n\
             Score: {score}, comments: {comments}\n\
             URL: {url}\n\n\
             Content:\n{content}\n\n\
             Reply with one JSON object with fields: title (rewritten \
             headline), body (two to four paragraphs of plain prose), \
             commentary (a short spoken-style remark).",
            topic = topic,
            title = item.title,
            source = item.source,
            community = item.community.as_deref().unwrap_or("n/a"),
            author = item.author,
            score = item.score,
            comments = item.comment_count,
            url = item.url,
            content = if capped.is_empty() {
                "No content available"
            } else {
                &capped
            },
        )
    }
}

#[async_trait]
impl NarrativeGenerator for LlmNarrativeGenerator {
    async fn generate(
        &self,
        item: &Item,
        content: &str,
        topic: &str,
    ) -> Result<Narrative, GenerationError> {
        let mut request = ChatRequest::new(
            self.config.model.clone(),
            vec![Message::user(self.prompt(item, content, topic))],
        );
        request.max_tokens = Some(self.config.max_tokens);
        request.json_mode = true;

        let response = self.client.complete(request).await?;
        match parse_narrative(&response.text) {
            Some(narrative) => Ok(narrative),
            None => {
                warn!(item_id = %item.id, "narrative response failed validation");
                Err(GenerationError::Malformed(
                    "missing title/body/commentary fields".to_string(),
                ))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNarrative {
    title: String,
    body: String,
    commentary: String,
}

/// Finds the first balanced JSON object in free-form output and parses
/// the narrative fields out of it.
fn parse_narrative(text: &str) -> Option<Narrative> {
    let object = extract_json_object(text)?;
    let raw: RawNarrative = serde_json::from_str(object).ok()?;
    if raw.title.trim().is_empty() || raw.body.trim().is_empty() {
        return None;
    }
    Some(Narrative {
        title: raw.title,
        body: raw.body,
        commentary: raw.commentary,
    })
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
