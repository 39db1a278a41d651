//! OpenAI-compatible API provider.
//!
//! Implements the [`CompletionProvider`] trait for OpenAI's Chat Completions
//! API. Also compatible with any server that follows the OpenAI API format
//! (e.g. Ollama, vLLM, Together AI) via [`OpenAiProvider::with_base_url`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BoxFuture;
use crate::credential::ApiKey;

use super::provider::{CompletionProvider, LlmError};
use super::types::*;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    default_model: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider with the given API key.
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            default_model: "gpt-4o-mini".to_string(),
        }
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set a custom base URL (for OpenAI-compatible providers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Convert our CompletionRequest into OpenAI's API format.
    fn build_request_body(&self, request: &CompletionRequest) -> OpenAiRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let mut messages: Vec<OpenAiMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(system.clone()),
            });
        }

        for msg in &request.messages {
            messages.push(OpenAiMessage {
                role: msg.role.clone(),
                content: Some(msg.content.clone()),
            });
        }

        OpenAiRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
        }
    }

    /// Parse OpenAI's response into our Completion.
    fn parse_response(&self, resp: OpenAiResponse) -> Result<Completion, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("no choices in response".to_string()))?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("stop") => "stop".to_string(),
            Some("length") => "length".to_string(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        };

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage: resp.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: resp.model,
        })
    }
}

impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn complete(&self, request: &CompletionRequest) -> BoxFuture<'_, Result<Completion, LlmError>> {
        let body = self.build_request_body(request);
        Box::pin(async move {
            debug!(model = %body.model, url = %self.base_url, "OpenAI completion request");

            let resp = self
                .client
                .post(&self.base_url)
                .header(
                    "authorization",
                    format!("Bearer {}", self.api_key.expose()),
                )
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

            let api_resp: OpenAiResponse = resp
                .json()
                .await
                .map_err(|e| LlmError::Parse(e.to_string()))?;

            self.parse_response(api_resp)
        })
    }
}

// ── OpenAI API types (private) ──────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
