//! Completion provider trait, the seam between the summarizer and the network.
//!
//! Every completion backend (OpenAI-compatible, Anthropic, scripted test
//! doubles) implements this trait.

use crate::BoxFuture;

use super::types::{Completion, CompletionRequest};

/// Errors from completion provider calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("authentication failed (check API key): {0}")]
    Auth(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("provider error: {status}: {message}")]
    ProviderError { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("timeout after {0}s")]
    Timeout(u64),
}

impl LlmError {
    /// Map a non-success HTTP status to an error.
    pub(crate) fn from_status(status: u16, retry_after: Option<u64>, body: String) -> Self {
        match status {
            401 | 403 => LlmError::Auth("invalid API key".to_string()),
            404 => LlmError::ModelNotFound(body),
            429 => LlmError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(60),
            },
            _ => LlmError::ProviderError {
                status,
                message: body,
            },
        }
    }
}

/// Core trait for completion providers.
///
/// Implementations must be `Send + Sync` so the engine can hold them behind
/// `Box<dyn CompletionProvider>`. Uses `BoxFuture` for object safety.
pub trait CompletionProvider: Send + Sync {
    /// Provider display name (e.g. "Anthropic", "OpenAI").
    fn name(&self) -> &str;

    /// Perform a single non-streaming completion.
    fn complete(&self, request: &CompletionRequest) -> BoxFuture<'_, Result<Completion, LlmError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_auth() {
        assert!(matches!(
            LlmError::from_status(401, None, String::new()),
            LlmError::Auth(_)
        ));
    }

    #[test]
    fn test_from_status_rate_limited_defaults_retry() {
        assert_eq!(
            LlmError::from_status(429, None, String::new()),
            LlmError::RateLimited {
                retry_after_secs: 60
            }
        );
        assert_eq!(
            LlmError::from_status(429, Some(7), String::new()),
            LlmError::RateLimited {
                retry_after_secs: 7
            }
        );
    }

    #[test]
    fn test_from_status_other() {
        let err = LlmError::from_status(500, None, "boom".to_string());
        assert_eq!(err.to_string(), "provider error: 500: boom");
    }
}
