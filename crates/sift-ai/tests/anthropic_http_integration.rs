use httpmock::prelude::*;
use serde_json::json;
use sift_ai::{AnthropicClient, AnthropicConfig, ChatRequest, LlmClient, Message};

fn config(api_base: String) -> AnthropicConfig {
    AnthropicConfig {
        api_base,
        api_key: "test-anthropic-key".to_string(),
        request_timeout_ms: 5_000,
        max_retries: 2,
        retry_budget_ms: 0,
        retry_jitter: false,
    }
}

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
fn missing_api_key_is_rejected() {
    let mut bad = config("http://localhost".to_string());
    bad.api_key = "  ".to_string();
    assert!(AnthropicClient::new(bad).is_err());
}

#[tokio::test]
async fn anthropic_client_sends_expected_http_request() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/messages")
            .header("x-api-key", "test-anthropic-key")
            .header("anthropic-version", "2023-06-01")
            .json_body_includes(
                json!({
                    "model": "claude-sonnet-4-20250514",
                    "system": "You are a strict classifier.",
                })
                .to_string(),
            );

        then.status(200).json_body(json!({
            "content": [{"type": "text", "text": "anthropic ok"}],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 5, "output_tokens": 3}
        }));
    });

    let client = AnthropicClient::new(config(format!("{}/v1", server.base_url())))
        .expect("anthropic client should be created");
    let response = client
        .complete(request())
        .await
        .expect("completion should succeed");

    mock.assert();
    assert_eq!(response.text, "anthropic ok");
    assert_eq!(response.usage.total_tokens, 8);
}

#[tokio::test]
async fn anthropic_client_retries_retryable_statuses_until_cap() {
    let server = MockServer::start();
    let failure = server.mock(|when, then| {
        when.method(POST).path("/v1/messages");
        then.status(529).body("overloaded");
    });

    let client = AnthropicClient::new(config(format!("{}/v1", server.base_url())))
        .expect("anthropic client should be created");
    let error = client
        .complete(request())
        .await
        .expect_err("retries should exhaust");

    // One initial attempt plus max_retries.
    failure.assert_calls(3);
    assert!(error.to_string().contains("529"), "got: {error}");
}

#[tokio::test]
async fn anthropic_client_fails_fast_on_client_errors() {
    let server = MockServer::start();
    let failure = server.mock(|when, then| {
        when.method(POST).path("/v1/messages");
        then.status(400).body("bad request");
    });

    let client = AnthropicClient::new(config(format!("{}/v1", server.base_url())))
        .expect("anthropic client should be created");
    let error = client
        .complete(request())
        .await
        .expect_err("client error should not retry");

    failure.assert_calls(1);
    assert!(error.to_string().contains("400"), "got: {error}");
}
