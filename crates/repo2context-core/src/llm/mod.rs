//! Completion provider integration for file summaries.
//!
//! The summarizer talks to completion services through a unified
//! [`CompletionProvider`] trait. Currently supported:
//!
//! - **OpenAI**: Chat Completions API (also compatible with Ollama, vLLM,
//!   Together AI, and other OpenAI-compatible endpoints)
//! - **Anthropic**: Claude models via the Messages API
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────────────┐
//! │ Summarizer │────▶│ CompletionProvider │  (trait)
//! └────────────┘     └─────────┬──────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//!       ┌──────────────┐            ┌──────────────┐
//!       │    OpenAI    │            │  Anthropic   │
//!       │ (Chat API)   │            │ (Messages)   │
//!       └──────────────┘            └──────────────┘
//! ```

pub mod anthropic;
pub mod openai;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use provider::{CompletionProvider, LlmError};
pub use types::*;

use repo2context_config::{SummaryConfig, SummaryProviderKind};

use crate::credential::ApiKey;

/// Create a completion provider from the `[summary]` config section.
///
/// The credential is passed in rather than read here; see [`ApiKey`].
pub fn create_provider(config: &SummaryConfig, api_key: ApiKey) -> Box<dyn CompletionProvider> {
    match config.provider {
        SummaryProviderKind::Anthropic => {
            let mut provider = AnthropicProvider::new(api_key);
            provider = provider.with_model(config.model());
            if let Some(ref base_url) = config.base_url {
                provider = provider.with_base_url(base_url);
            }
            Box::new(provider)
        }
        SummaryProviderKind::OpenAi => {
            let mut provider = OpenAiProvider::new(api_key);
            provider = provider.with_model(config.model());
            if let Some(ref base_url) = config.base_url {
                provider = provider.with_base_url(base_url);
            }
            Box::new(provider)
        }
    }
}
