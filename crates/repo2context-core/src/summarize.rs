//! Optional AI summaries for files that do not fit the budget.
//!
//! The [`Summarizer`] makes at most one bounded request per file. The first
//! failed request trips it: every later file in the same run is refused
//! immediately without touching the network.

use std::time::Duration;

use repo2context_config::SummaryConfig;
use tracing::{debug, warn};

use crate::credential::ApiKey;
use crate::llm::{ChatMessage, CompletionProvider, CompletionRequest, LlmError, create_provider};
use crate::select::truncate;
use crate::tokens::TokenMeter;

const SYSTEM_PROMPT: &str = "You write short summaries of source files for a document that gives a \
language model context about a repository. Describe what the file is for and name its most \
important types and functions. Reply with plain prose only.";

/// Why no summary was produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummarizerError {
    #[error("summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("summary request failed: {0}")]
    RequestFailed(String),
}

/// Request limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizerOptions {
    pub model: String,
    pub timeout: Duration,
    /// Content is clipped to a line-aligned prefix of this many tokens.
    pub max_input_tokens: usize,
    pub max_summary_tokens: u32,
}

impl SummarizerOptions {
    pub fn from_config(config: &SummaryConfig) -> Self {
        Self {
            model: config.model().to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_input_tokens: config.max_input_tokens,
            max_summary_tokens: config.max_summary_tokens,
        }
    }
}

impl Default for SummarizerOptions {
    fn default() -> Self {
        Self::from_config(&SummaryConfig::default())
    }
}

enum Backend {
    Disabled,
    Unavailable(String),
    Ready(Box<dyn CompletionProvider>),
}

/// Summarization adapter for one run.
pub struct Summarizer {
    backend: Backend,
    options: SummarizerOptions,
    tripped: Option<String>,
    attempts: usize,
}

impl Summarizer {
    /// A summarizer that is switched off.
    pub fn disabled() -> Self {
        Self {
            backend: Backend::Disabled,
            options: SummarizerOptions::default(),
            tripped: None,
            attempts: 0,
        }
    }

    /// Build from config and an injected credential.
    ///
    /// Enabled without a credential yields a summarizer that reports
    /// [`SummarizerError::Unavailable`] for every file.
    pub fn from_config(config: &SummaryConfig, api_key: Option<ApiKey>) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let backend = match api_key {
            Some(key) => {
                let provider = create_provider(config, key);
                debug!(provider = provider.name(), model = config.model(), "Summarizer ready");
                Backend::Ready(provider)
            }
            None => {
                let reason = format!("no API key found in ${}", config.api_key_env());
                warn!("{reason}");
                Backend::Unavailable(reason)
            }
        };
        Self {
            backend,
            options: SummarizerOptions::from_config(config),
            tripped: None,
            attempts: 0,
        }
    }

    /// Use an explicit provider (tests, embedding applications).
    pub fn with_provider(provider: Box<dyn CompletionProvider>, options: SummarizerOptions) -> Self {
        Self {
            backend: Backend::Ready(provider),
            options,
            tripped: None,
            attempts: 0,
        }
    }

    /// Whether summaries were asked for (even if they cannot be produced).
    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, Backend::Disabled)
    }

    /// Number of requests sent so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Whether an earlier failure has switched the summarizer off.
    pub fn is_tripped(&self) -> bool {
        self.tripped.is_some()
    }

    /// Ask for a summary of `content`.
    pub async fn summarize(
        &mut self,
        path: &str,
        content: &str,
        meter: &TokenMeter,
    ) -> Result<String, SummarizerError> {
        let provider = match self.backend {
            Backend::Disabled => {
                return Err(SummarizerError::Unavailable(
                    "summaries are disabled".to_string(),
                ));
            }
            Backend::Unavailable(ref reason) => {
                return Err(SummarizerError::Unavailable(reason.clone()));
            }
            Backend::Ready(ref provider) => provider,
        };
        if let Some(ref reason) = self.tripped {
            return Err(SummarizerError::Unavailable(format!(
                "disabled after an earlier failure ({reason})"
            )));
        }

        let clipped = clip_input(content, self.options.max_input_tokens, meter);
        let request = CompletionRequest {
            model: self.options.model.clone(),
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(format!("File: {path}\n\n{clipped}"))],
            max_tokens: self.options.max_summary_tokens,
            temperature: 0.0,
        };

        self.attempts += 1;
        debug!(path, provider = provider.name(), "Requesting summary");
        let outcome = match tokio::time::timeout(self.options.timeout, provider.complete(&request)).await {
            Ok(Ok(completion)) => {
                let text = completion.text.trim().to_string();
                if text.is_empty() {
                    Err("empty summary in response".to_string())
                } else {
                    Ok(text)
                }
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(LlmError::Timeout(self.options.timeout.as_secs()).to_string()),
        };

        outcome.map_err(|message| {
            self.tripped = Some(message.clone());
            SummarizerError::RequestFailed(message)
        })
    }
}

/// Line-aligned prefix of at most `max_tokens`; falls back to a character
/// cut when even the first line is too long.
fn clip_input<'a>(content: &'a str, max_tokens: usize, meter: &TokenMeter) -> &'a str {
    if meter.measure(content) <= max_tokens {
        return content;
    }
    let ends = truncate::line_ends(content);
    match truncate::fitting_prefix(content, &ends, max_tokens, meter) {
        Some(prefix) => prefix.text,
        None => {
            let cut = content
                .char_indices()
                .nth(max_tokens.saturating_mul(4))
                .map_or(content.len(), |(i, _)| i);
            &content[..cut]
        }
    }
}
