use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::{
    retry::{
        budget_allows_delay, is_retryable_http_error, parse_retry_after_ms, retry_delay_ms,
        should_retry_status,
    },
    AiError, ChatRequest, ChatResponse, ChatUsage, LlmClient, MessageRole,
};

const JSON_MODE_INSTRUCTION: &str =
    "Respond with valid JSON only. Do not include markdown code fences or commentary.";

#[derive(Debug, Clone)]
/// Connection and retry settings for the Anthropic messages endpoint.
pub struct AnthropicConfig {
    pub api_base: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_budget_ms: u64,
    pub retry_jitter: bool,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.anthropic.com/v1".to_string(),
            api_key: String::new(),
            request_timeout_ms: 120_000,
            max_retries: 3,
            retry_budget_ms: 60_000,
            retry_jitter: true,
        }
    }
}

#[derive(Debug, Clone)]
/// HTTP client for the Anthropic messages API with bounded retries.
pub struct AnthropicClient {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Result<Self, AiError> {
        if config.api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(config.api_key.trim())
                .map_err(|e| AiError::InvalidResponse(format!("invalid API key header: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.ends_with("/messages") {
            return base.to_string();
        }

        format!("{base}/messages")
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, AiError> {
        let body = build_messages_request_body(&request);
        let url = self.messages_url();
        let started = std::time::Instant::now();
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            let response = self.client.post(&url).json(&body).send().await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let raw = response.text().await?;
                        return parse_messages_response(&raw);
                    }

                    let retry_after_ms = parse_retry_after_ms(response.headers());
                    let raw = response.text().await?;
                    if attempt < max_retries && should_retry_status(status.as_u16()) {
                        let delay_ms =
                            retry_delay_ms(attempt, self.config.retry_jitter, retry_after_ms);
                        let elapsed_ms = started.elapsed().as_millis() as u64;
                        if budget_allows_delay(elapsed_ms, delay_ms, self.config.retry_budget_ms) {
                            sleep(std::time::Duration::from_millis(delay_ms)).await;
                            continue;
                        }
                    }

                    return Err(AiError::HttpStatus {
                        status: status.as_u16(),
                        body: raw,
                    });
                }
                Err(error) => {
                    if attempt < max_retries && is_retryable_http_error(&error) {
                        let delay_ms = retry_delay_ms(attempt, self.config.retry_jitter, None);
                        let elapsed_ms = started.elapsed().as_millis() as u64;
                        if budget_allows_delay(elapsed_ms, delay_ms, self.config.retry_budget_ms) {
                            sleep(std::time::Duration::from_millis(delay_ms)).await;
                            continue;
                        }
                    }
                    return Err(AiError::Http(error));
                }
            }
        }

        Err(AiError::InvalidResponse(
            "request retry loop terminated unexpectedly".to_string(),
        ))
    }
}

fn build_messages_request_body(request: &ChatRequest) -> Value {
    let mut system_segments: Vec<&str> = Vec::new();
    if request.json_mode {
        system_segments.push(JSON_MODE_INSTRUCTION);
    }
    system_segments.extend(
        request
            .messages
            .iter()
            .filter(|message| message.role == MessageRole::System)
            .map(|message| message.text.as_str())
            .filter(|text| !text.trim().is_empty()),
    );

    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter_map(|message| {
            let role = match message.role {
                MessageRole::System => return None,
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            if message.text.trim().is_empty() {
                return None;
            }
            Some(json!({
                "role": role,
                "content": [{ "type": "text", "text": message.text }],
            }))
        })
        .collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
        "max_tokens": request.max_tokens.unwrap_or(4_096),
    });

    if !system_segments.is_empty() {
        body["system"] = json!(system_segments.join("\n\n"));
    }

    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }

    body
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>,
    #[serde(default)]
    model: String,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

fn parse_messages_response(raw: &str) -> Result<ChatResponse, AiError> {
    let parsed: AnthropicMessageResponse = serde_json::from_str(raw)?;

    let text = parsed
        .content
        .iter()
        .filter_map(|part| match part {
            AnthropicContent::Text { text } => Some(text.as_str()),
            AnthropicContent::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    let usage = parsed
        .usage
        .map(|usage| ChatUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        text,
        model: parsed.model,
        finish_reason: parsed.stop_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::{build_messages_request_body, parse_messages_response, ChatRequest};
    use crate::Message;

    fn request() -> ChatRequest {
        ChatRequest::new(
            "claude-sonnet-4-20250514",
            vec![
                Message::system("You are a strict classifier."),
                Message::user("classify these"),
            ],
        )
    }

    #[test]
    fn json_mode_prepends_instruction_to_system_prompt() {
        let mut req = request();
        req.json_mode = true;
        let body = build_messages_request_body(&req);
        let system = body["system"].as_str().expect("system prompt");
        assert!(system.starts_with("Respond with valid JSON only."));
        assert!(system.contains("strict classifier"));
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn system_turns_never_land_in_the_messages_array() {
        let body = build_messages_request_body(&request());
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(
            body["system"].as_str(),
            Some("You are a strict classifier.")
        );
    }

    #[test]
    fn parses_text_blocks_and_usage() {
        let raw = r#"{
            "content": [
                {"type": "text", "text": "[{\"category\": \"technical\"}]"},
                {"type": "tool_use", "id": "x", "name": "n", "input": {}}
            ],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        }"#;
        let response = parse_messages_response(raw).expect("parse");
        assert_eq!(response.text, "[{\"category\": \"technical\"}]");
        assert_eq!(response.usage.total_tokens, 19);
        assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
    }
}
