//! Anthropic Claude API provider.
//!
//! Implements the [`CompletionProvider`] trait for the Anthropic Messages API
//! via the `/v1/messages` endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BoxFuture;
use crate::credential::ApiKey;

use super::provider::{CompletionProvider, LlmError};
use super::types::*;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    default_model: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given API key.
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: ANTHROPIC_API_URL.to_string(),
            default_model: "claude-3-5-haiku-latest".to_string(),
        }
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set a custom endpoint (proxies, gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Convert our CompletionRequest into Anthropic's API format.
    fn build_request_body(&self, request: &CompletionRequest) -> AnthropicRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        // System messages go in the top-level system field
        let system = request.system.clone().or_else(|| {
            request
                .messages
                .iter()
                .find(|m| m.role == "system")
                .map(|m| m.content.clone())
        });

        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| AnthropicMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model,
            max_tokens: request.max_tokens,
            system,
            messages,
            temperature: Some(request.temperature),
        }
    }

    /// Parse Anthropic's response into our Completion.
    fn parse_response(&self, resp: AnthropicResponse) -> Completion {
        let text = resp
            .content
            .iter()
            .filter_map(|block| match block {
                AnthropicBlock::Text { text } => Some(text.as_str()),
                AnthropicBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let finish_reason = match resp.stop_reason.as_deref() {
            Some("end_turn") | Some("stop_sequence") => "stop".to_string(),
            Some("max_tokens") => "length".to_string(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        };

        Completion {
            text,
            finish_reason,
            usage: TokenUsage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            },
            model: resp.model,
        }
    }
}

impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "Anthropic"
    }

    fn complete(&self, request: &CompletionRequest) -> BoxFuture<'_, Result<Completion, LlmError>> {
        let body = self.build_request_body(request);
        Box::pin(async move {
            debug!(model = %body.model, "Anthropic completion request");

            let resp = self
                .client
                .post(&self.base_url)
                .header("x-api-key", self.api_key.expose())
                .header("anthropic-version", ANTHROPIC_API_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| LlmError::Network(e.to_string()))?;

            let status = resp.status().as_u16();
            if !resp.status().is_success() {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                let error_body = resp.text().await.unwrap_or_default();
                return Err(LlmError::from_status(status, retry_after, error_body));
            }

            let api_resp: AnthropicResponse = resp
                .json()
                .await
                .map_err(|e| LlmError::Parse(e.to_string()))?;

            Ok(self.parse_response(api_resp))
        })
    }
}

// ── Anthropic API types (private) ───────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
