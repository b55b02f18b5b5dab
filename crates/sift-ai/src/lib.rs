//! Anthropic messages client used for classification and narrative generation.
mod anthropic;
mod retry;
mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use types::{AiError, ChatRequest, ChatResponse, ChatUsage, LlmClient, Message, MessageRole};
