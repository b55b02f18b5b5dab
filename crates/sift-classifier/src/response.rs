//! Strict parsing and validation of classification responses.

use serde::Deserialize;
use sift_core::{normalize_category, Category};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
/// Enumerates supported `ResponseError` values.
pub enum ResponseError {
    #[error("no JSON array found in response")]
    NoJsonArray,
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("response references unknown item id {0}")]
    UnknownItemId(String),
    #[error("response contains duplicate entry for item id {0}")]
    DuplicateItemId(String),
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    item_id: String,
    category: String,
    confidence: f64,
    #[serde(default)]
    red_flags: Vec<String>,
    #[serde(default)]
    topic_tags: Vec<String>,
    #[serde(default)]
    format_tag: Option<String>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Debug, Clone, PartialEq)]
/// One validated, normalized entry from a classification response.
pub struct ValidatedEntry {
    pub category: Category,
    pub confidence: f64,
    pub red_flags: Vec<String>,
    pub topic_tags: Vec<String>,
    pub format_tag: Option<String>,
    pub reasoning: String,
}

/// Extracts the first JSON array from free-form model output. Models
/// occasionally wrap the payload in prose despite instructions.
fn extract_json_array(text: &str) -> Result<&str, ResponseError> {
    let start = text.find('[').ok_or(ResponseError::NoJsonArray)?;
    let end = text.rfind(']').ok_or(ResponseError::NoJsonArray)?;
    if end < start {
        return Err(ResponseError::NoJsonArray);
    }
    Ok(&text[start..=end])
}

/// Parses a batch response into validated entries keyed by item id.
///
/// Entries for ids not in `expected_ids` and duplicate ids fail the whole
/// response. Missing ids are not an error here; the caller decides what
/// to do with the unmatched remainder.
pub fn parse_batch_response(
    text: &str,
    expected_ids: &[String],
) -> Result<HashMap<String, ValidatedEntry>, ResponseError> {
    let raw = extract_json_array(text)?;
    let entries: Vec<RawEntry> = serde_json::from_str(raw)?;

    let mut validated = HashMap::new();
    for entry in entries {
        if !expected_ids.iter().any(|id| id == &entry.item_id) {
            return Err(ResponseError::UnknownItemId(entry.item_id));
        }
        if validated.contains_key(&entry.item_id) {
            return Err(ResponseError::DuplicateItemId(entry.item_id));
        }
        validated.insert(
            entry.item_id,
            ValidatedEntry {
                category: normalize_category(&entry.category),
                confidence: entry.confidence.clamp(0.0, 1.0),
                red_flags: entry.red_flags,
                topic_tags: entry.topic_tags,
                format_tag: entry.format_tag,
                reasoning: entry.reasoning,
            },
        );
    }
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::{parse_batch_response, ResponseError};
    use sift_core::Category;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn parses_fenced_response_and_normalizes_categories() {
        let text = r#"Here are the results:
```json
[
  {"item_id": "a", "category": "Technical", "confidence": 0.91,
   "red_flags": [], "topic_tags": ["mcp"], "format_tag": "text",
   "reasoning": "hands-on workflow"},
  {"item_id": "b", "category": "news", "confidence": 1.7,
   "reasoning": "release announcement"}
]
```"#;
        let parsed = parse_batch_response(text, &ids(&["a", "b"])).expect("parse");
        assert_eq!(parsed["a"].category, Category::Technical);
        assert_eq!(parsed["b"].category, Category::Community);
        assert_eq!(parsed["b"].confidence, 1.0);
        assert!(parsed["b"].topic_tags.is_empty());
    }

    #[test]
    fn rejects_prose_without_an_array() {
        let error = parse_batch_response("I cannot classify these posts.", &ids(&["a"]))
            .expect_err("refusal");
        assert!(matches!(error, ResponseError::NoJsonArray));
    }

    #[test]
    fn rejects_unknown_and_duplicate_ids() {
        let unknown = r#"[{"item_id": "ghost", "category": "technical", "confidence": 0.5}]"#;
        assert!(matches!(
            parse_batch_response(unknown, &ids(&["a"])),
            Err(ResponseError::UnknownItemId(_))
        ));

        let duplicate = r#"[
            {"item_id": "a", "category": "technical", "confidence": 0.5},
            {"item_id": "a", "category": "meme", "confidence": 0.5}
        ]"#;
        assert!(matches!(
            parse_batch_response(duplicate, &ids(&["a"])),
            Err(ResponseError::DuplicateItemId(_))
        ));
    }

    #[test]
    fn missing_ids_are_left_to_the_caller() {
        let partial = r#"[{"item_id": "a", "category": "technical", "confidence": 0.5}]"#;
        let parsed = parse_batch_response(partial, &ids(&["a", "b"])).expect("parse");
        assert_eq!(parsed.len(), 1);
        assert!(!parsed.contains_key("b"));
    }
}
