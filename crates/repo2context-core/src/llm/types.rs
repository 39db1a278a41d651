//! Common types for completion provider integration.
//!
//! These types define the shared vocabulary for single-shot text completions
//! across all providers.

use serde::{Deserialize, Serialize};

/// A message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system" or "user".
    pub role: String,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request for a text completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier (e.g. "gpt-4o-mini", "claude-3-5-haiku-latest").
    /// Empty falls back to the provider's default model.
    pub model: String,
    /// Optional system prompt.
    pub system: Option<String>,
    /// Conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0–2.0).
    pub temperature: f32,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            system: None,
            messages: Vec::new(),
            max_tokens: 256,
            temperature: 0.0,
        }
    }
}

/// Response from a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Generated text, concatenated across content blocks.
    pub text: String,
    /// Finish reason normalized to "stop", "length", or the provider's value.
    pub finish_reason: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model identifier that served the request.
    pub model: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
