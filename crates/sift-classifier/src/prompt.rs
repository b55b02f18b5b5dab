//! Prompt assembly for classification requests.

use serde_json::json;
use sift_core::{Category, Item};

pub const SYSTEM_PROMPT: &str = "You are a strict content classifier. You label \
short-form posts for relevance to a given topic and you always answer with a \
single JSON array, one object per input post, nothing else.";

fn taxonomy_lines() -> String {
    Category::ALL
        .iter()
        .map(|category| format!("- {} ({:?})", category.as_str(), category.group()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the user turn for one batch. Every submitted item appears with
/// its id so the model can echo ids back verbatim.
pub fn batch_prompt(items: &[&Item], topic: &str) -> String {
    let payload: Vec<serde_json::Value> = items
        .iter()
        .map(|item| {
            json!({
                "item_id": item.id,
                "source": item.source,
                "community": item.community,
                "title": item.title,
                "author": item.author,
                "content": item.content,
            })
        })
        .collect();

    format!(
        "Topic of interest: {topic}\n\n\
         Classify each post below into exactly one category:\n{taxonomy}\n\n\
         Posts:\n{posts}\n\n\
         Reply with a JSON array. One object per post, in any order, with \
         fields: item_id (echoed verbatim), category, confidence (0.0-1.0), \
         red_flags (array of strings), topic_tags (array of strings), \
         format_tag (string or null), reasoning (one sentence).",
        topic = topic,
        taxonomy = taxonomy_lines(),
        posts = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "[]".to_string()),
    )
}
