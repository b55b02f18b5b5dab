use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use sift_ai::{AiError, ChatRequest, LlmClient, Message};
use sift_core::{Category, Classification, Item};

use crate::prompt::{batch_prompt, SYSTEM_PROMPT};
use crate::response::parse_batch_response;
use crate::FALLBACK_REASONING;

pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Clone)]
/// Settings for one classification run.
pub struct ClassifierConfig {
    pub model: String,
    pub batch_size: usize,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_tokens: 4_096,
            temperature: Some(0.0),
        }
    }
}

/// Result of classifying one set of cache-miss items.
#[derive(Debug)]
pub struct ClassifyOutcome {
    /// Exactly one entry per submitted item.
    pub classifications: HashMap<String, Classification>,
    /// Items that exhausted the failure ladder and got the outlier
    /// fallback.
    pub fallbacks: usize,
}

/// Classifies items in batches with a batch -> individual -> fallback
/// failure ladder.
pub struct BatchClassifier {
    client: Arc<dyn LlmClient>,
    config: ClassifierConfig,
}

impl BatchClassifier {
    pub fn new(client: Arc<dyn LlmClient>, config: ClassifierConfig) -> Self {
        Self { client, config }
    }

    /// Classifies `items` for `project`. Always returns exactly one
    /// classification per input item; hard failures surface only as
    /// outlier fallbacks, never as missing entries.
    pub async fn classify(
        &self,
        items: &[Item],
        project: &str,
        topic: &str,
    ) -> ClassifyOutcome {
        let mut classifications = HashMap::new();
        let mut fallbacks = 0;

        let batch_size = self.config.batch_size.max(1);
        for batch in items.chunks(batch_size) {
            let batch_refs: Vec<&Item> = batch.iter().collect();
            let (resolved, batch_fallbacks) =
                self.classify_batch(&batch_refs, project, topic).await;
            fallbacks += batch_fallbacks;
            classifications.extend(resolved);
        }

        ClassifyOutcome {
            classifications,
            fallbacks,
        }
    }

    /// One rung of the ladder: try the whole batch, then individually
    /// classify whatever the batch response did not cover.
    async fn classify_batch(
        &self,
        batch: &[&Item],
        project: &str,
        topic: &str,
    ) -> (HashMap<String, Classification>, usize) {
        let expected_ids: Vec<String> = batch.iter().map(|item| item.id.clone()).collect();
        let mut resolved: HashMap<String, Classification> = HashMap::new();
        let mut fallbacks = 0;

        match self.request(batch, topic).await {
            Ok(text) => match parse_batch_response(&text, &expected_ids) {
                Ok(entries) => {
                    for (item_id, entry) in entries {
                        resolved.insert(
                            item_id.clone(),
                            self.to_classification(&item_id, project, entry),
                        );
                    }
                }
                Err(error) => {
                    warn!(batch = batch.len(), %error, "batch response failed validation");
                }
            },
            Err(error) => {
                warn!(batch = batch.len(), %error, "batch classification call failed");
            }
        }

        // Anything the batch call left unresolved gets one individual
        // attempt, then the outlier fallback.
        for item in batch {
            if resolved.contains_key(&item.id) {
                continue;
            }
            let classification = match self.classify_single(item, project, topic).await {
                Some(classification) => classification,
                None => {
                    fallbacks += 1;
                    fallback_classification(&item.id, project, &self.config.model)
                }
            };
            resolved.insert(item.id.clone(), classification);
        }

        (resolved, fallbacks)
    }

    async fn classify_single(
        &self,
        item: &Item,
        project: &str,
        topic: &str,
    ) -> Option<Classification> {
        let expected = vec![item.id.clone()];
        match self.request(&[item], topic).await {
            Ok(text) => match parse_batch_response(&text, &expected) {
                Ok(mut entries) => entries
                    .remove(&item.id)
                    .map(|entry| self.to_classification(&item.id, project, entry)),
                Err(error) => {
                    warn!(item_id = %item.id, %error, "individual response failed validation");
                    None
                }
            },
            Err(error) => {
                warn!(item_id = %item.id, %error, "individual classification call failed");
                None
            }
        }
    }

    async fn request(&self, items: &[&Item], topic: &str) -> Result<String, AiError> {
        debug!(items = items.len(), "submitting classification request");
        let mut request = ChatRequest::new(
            self.config.model.clone(),
            vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(batch_prompt(items, topic)),
            ],
        );
        request.max_tokens = Some(self.config.max_tokens);
        request.temperature = self.config.temperature;
        request.json_mode = true;

        let response = self.client.complete(request).await?;
        Ok(response.text)
    }

    fn to_classification(
        &self,
        item_id: &str,
        project: &str,
        entry: crate::response::ValidatedEntry,
    ) -> Classification {
        Classification {
            item_id: item_id.to_string(),
            project: project.to_string(),
            category: entry.category,
            confidence: entry.confidence,
            red_flags: entry.red_flags,
            topic_tags: entry.topic_tags,
            format_tag: entry.format_tag,
            reasoning: entry.reasoning,
            model_version: self.config.model.clone(),
            classified_at: Utc::now(),
            sent_in_digest_at: None,
        }
    }
}

fn fallback_classification(item_id: &str, project: &str, model: &str) -> Classification {
    Classification {
        item_id: item_id.to_string(),
        project: project.to_string(),
        category: Category::Outlier,
        confidence: 0.0,
        red_flags: Vec::new(),
        topic_tags: Vec::new(),
        format_tag: None,
        reasoning: FALLBACK_REASONING.to_string(),
        model_version: model.to_string(),
        classified_at: Utc::now(),
        sent_in_digest_at: None,
    }
}
