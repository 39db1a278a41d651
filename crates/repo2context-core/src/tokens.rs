//! Token measurement.
//!
//! A [`TokenCounter`] is resolved once per run from the configured model.
//! When no BPE scheme is known for the model the meter degrades to a
//! character estimate and says so exactly once via
//! [`TokenMeter::degraded_warning`].

use tiktoken_rs::CoreBPE;
use tiktoken_rs::tokenizer::{Tokenizer, get_tokenizer};
use tracing::debug;

use crate::error::Diagnostic;

/// Scheme name reported by the fallback estimator.
pub const ESTIMATE_SCHEME: &str = "estimate";

const ENCODINGS: &[(&str, Tokenizer)] = &[
    ("o200k_base", Tokenizer::O200kBase),
    ("cl100k_base", Tokenizer::Cl100kBase),
    ("p50k_base", Tokenizer::P50kBase),
    ("p50k_edit", Tokenizer::P50kEdit),
    ("r50k_base", Tokenizer::R50kBase),
    ("gpt2", Tokenizer::Gpt2),
];

/// Counts tokens for one tokenization scheme.
pub trait TokenCounter: Send + Sync {
    /// Scheme name (e.g. "o200k_base").
    fn scheme(&self) -> &str;

    /// Number of tokens `text` encodes to.
    fn count_tokens(&self, text: &str) -> usize;
}

/// BPE counter backed by tiktoken.
pub struct TiktokenCounter {
    scheme: &'static str,
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Resolve a counter from a model name (`gpt-4o`) or an encoding name
    /// (`cl100k_base`). Returns `None` when neither is known.
    pub fn for_model(model: &str) -> Option<Self> {
        let model = model.trim();
        let tokenizer = ENCODINGS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, t)| *t)
            .or_else(|| get_tokenizer(model))?;
        let scheme = ENCODINGS
            .iter()
            .find(|(_, t)| *t == tokenizer)
            .map(|(name, _)| *name)?;
        let bpe = tiktoken_rs::get_bpe_from_tokenizer(tokenizer).ok()?;
        Some(Self { scheme, bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn scheme(&self) -> &str {
        self.scheme
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Character-based fallback: one token per four characters, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateCounter;

impl TokenCounter for EstimateCounter {
    fn scheme(&self) -> &str {
        ESTIMATE_SCHEME
    }

    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Rough token estimate (~4 characters per token).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Measure `text` under the scheme for `model`, estimating when the scheme
/// is unknown. Resolves the scheme on every call; prefer a [`TokenMeter`]
/// for repeated measurement.
pub fn measure_for_model(text: &str, model: &str) -> usize {
    match TiktokenCounter::for_model(model) {
        Some(counter) => counter.count_tokens(text),
        None => estimate_tokens(text),
    }
}

/// The run's token meter.
pub struct TokenMeter {
    counter: Box<dyn TokenCounter>,
    model: String,
    degraded: bool,
}

impl TokenMeter {
    /// Resolve the counter for `model`, falling back to the estimate.
    pub fn for_model(model: &str) -> Self {
        match TiktokenCounter::for_model(model) {
            Some(counter) => {
                debug!(model, scheme = counter.scheme(), "Resolved tokenizer");
                Self {
                    counter: Box::new(counter),
                    model: model.to_string(),
                    degraded: false,
                }
            }
            None => {
                debug!(model, "No tokenizer for model, estimating token counts");
                Self {
                    counter: Box::new(EstimateCounter),
                    model: model.to_string(),
                    degraded: true,
                }
            }
        }
    }

    /// Use a specific counter. Never degraded.
    pub fn with_counter(counter: Box<dyn TokenCounter>) -> Self {
        let model = counter.scheme().to_string();
        Self {
            counter,
            model,
            degraded: false,
        }
    }

    pub fn measure(&self, text: &str) -> usize {
        self.counter.count_tokens(text)
    }

    pub fn scheme(&self) -> &str {
        self.counter.scheme()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The single degraded-estimate diagnostic, if the meter fell back.
    pub fn degraded_warning(&self) -> Option<Diagnostic> {
        self.degraded.then(|| Diagnostic::DegradedEstimate {
            model: self.model.clone(),
        })
    }
}

impl std::fmt::Debug for TokenMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMeter")
            .field("scheme", &self.counter.scheme())
            .field("model", &self.model)
            .field("degraded", &self.degraded)
            .finish()
    }
}
