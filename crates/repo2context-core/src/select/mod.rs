//! Content selection under the token budget.
//!
//! A single forward pass decides, per candidate, whether the file goes into
//! the document in full, as a line-aligned prefix, as a summary, or not at
//! all. Earlier candidates are privileged: nothing is revisited once decided.

pub mod budget;
pub mod priority;
pub mod truncate;

pub use budget::{BudgetExceeded, TokenBudget};
pub use priority::PriorityOrder;

use tracing::debug;

use crate::filter::{FileCandidate, FileContent};
use crate::render::lang::guess_language;
use crate::summarize::{Summarizer, SummarizerError};
use crate::tokens::TokenMeter;

/// A summary is not requested when less than this much budget remains.
pub const MIN_SUMMARY_TOKENS: usize = 8;

/// How a file is represented in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionMode {
    Full,
    Truncated,
    Summarized,
    Skipped,
}

impl DecisionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionMode::Full => "full",
            DecisionMode::Truncated => "truncated",
            DecisionMode::Summarized => "summarized",
            DecisionMode::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for DecisionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a file was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not text; nothing to measure.
    Binary,
    /// Too big for what was left, and no smaller form was allowed or fit.
    OverBudget { tokens: usize, remaining: usize },
    /// The best line-aligned prefix kept fewer lines than required.
    TruncationTooShort { lines: usize, min_lines: usize },
    /// Summarization was attempted and failed.
    Summarizer(SummarizerError),
    /// A summary was produced but did not fit either.
    SummaryOverBudget { tokens: usize, remaining: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Binary => write!(f, "binary content"),
            SkipReason::OverBudget { tokens, remaining } => write!(
                f,
                "needs {tokens} tokens but only {remaining} remain in the budget"
            ),
            SkipReason::TruncationTooShort { lines, min_lines } => write!(
                f,
                "only {lines} line(s) would fit, fewer than the minimum of {min_lines}"
            ),
            SkipReason::Summarizer(e) => write!(f, "{e}"),
            SkipReason::SummaryOverBudget { tokens, remaining } => write!(
                f,
                "summary needs {tokens} tokens but only {remaining} remain in the budget"
            ),
        }
    }
}

/// The selector's verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub path: String,
    pub mode: DecisionMode,
    /// Text placed in the document; empty when skipped.
    pub text: String,
    /// Tokens charged to the budget for `text`.
    pub tokens: usize,
    /// Tokens of the whole file.
    pub original_tokens: usize,
    pub original_lines: usize,
    /// Lines kept when truncated; equal to `original_lines` when full.
    pub kept_lines: usize,
    pub skip_reason: Option<SkipReason>,
    /// Fence info string guessed from the file name; may be empty.
    pub language: &'static str,
    pub size: u64,
}

impl Decision {
    fn skipped(path: String, size: u64, original_tokens: usize, lines: usize, reason: SkipReason) -> Self {
        Self {
            language: guess_language(&path),
            path,
            mode: DecisionMode::Skipped,
            text: String::new(),
            tokens: 0,
            original_tokens,
            original_lines: lines,
            kept_lines: 0,
            skip_reason: Some(reason),
            size,
        }
    }
}

/// Selector behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorOptions {
    pub truncate: bool,
    pub min_truncated_lines: usize,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            truncate: true,
            min_truncated_lines: 1,
        }
    }
}

/// Owns the budget for one run and decides each candidate in turn.
pub struct ContentSelector {
    meter: TokenMeter,
    summarizer: Summarizer,
    budget: TokenBudget,
    options: SelectorOptions,
}

impl ContentSelector {
    pub fn new(
        meter: TokenMeter,
        summarizer: Summarizer,
        limit: usize,
        options: SelectorOptions,
    ) -> Self {
        Self {
            meter,
            summarizer,
            budget: TokenBudget::new(limit),
            options,
        }
    }

    pub fn budget(&self) -> TokenBudget {
        self.budget
    }

    pub fn meter(&self) -> &TokenMeter {
        &self.meter
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    /// Decide one candidate, charging the budget for whatever is included.
    ///
    /// `BudgetExceeded` means the pass charged something it had not checked;
    /// callers treat it as fatal.
    pub async fn select(&mut self, candidate: FileCandidate) -> Result<Decision, BudgetExceeded> {
        let FileCandidate {
            path,
            size,
            content,
        } = candidate;
        let text = match content {
            FileContent::Text(text) => text,
            FileContent::Binary => {
                return Ok(Decision::skipped(path, size, 0, 0, SkipReason::Binary));
            }
        };

        let tokens = self.meter.measure(&text);
        let ends = truncate::line_ends(&text);
        let lines = ends.len();
        let remaining = self.budget.remaining();

        if self.budget.fits(tokens) {
            self.budget.charge(tokens)?;
            debug!(path = %path, tokens, "Included in full");
            return Ok(Decision {
                language: guess_language(&path),
                path,
                mode: DecisionMode::Full,
                text,
                tokens,
                original_tokens: tokens,
                original_lines: lines,
                kept_lines: lines,
                skip_reason: None,
                size,
            });
        }

        let mut reason = SkipReason::OverBudget { tokens, remaining };

        if self.options.truncate {
            // Strict prefixes only; the whole file is known not to fit
            let boundaries = &ends[..lines.saturating_sub(1)];
            match truncate::fitting_prefix(&text, boundaries, remaining, &self.meter) {
                Some(prefix) if prefix.lines >= self.options.min_truncated_lines => {
                    self.budget.charge(prefix.tokens)?;
                    debug!(
                        path = %path,
                        kept = prefix.lines,
                        of = lines,
                        tokens = prefix.tokens,
                        "Truncated"
                    );
                    return Ok(Decision {
                        language: guess_language(&path),
                        text: prefix.text.to_string(),
                        path,
                        mode: DecisionMode::Truncated,
                        tokens: prefix.tokens,
                        original_tokens: tokens,
                        original_lines: lines,
                        kept_lines: prefix.lines,
                        skip_reason: None,
                        size,
                    });
                }
                Some(prefix) => {
                    reason = SkipReason::TruncationTooShort {
                        lines: prefix.lines,
                        min_lines: self.options.min_truncated_lines,
                    };
                }
                None => {}
            }
        }

        if self.summarizer.is_enabled() && remaining >= MIN_SUMMARY_TOKENS {
            reason = match self.summarizer.summarize(&path, &text, &self.meter).await {
                Ok(summary) => {
                    let summary_tokens = self.meter.measure(&summary);
                    if self.budget.fits(summary_tokens) {
                        self.budget.charge(summary_tokens)?;
                        debug!(path = %path, tokens = summary_tokens, "Summarized");
                        return Ok(Decision {
                            language: guess_language(&path),
                            path,
                            mode: DecisionMode::Summarized,
                            text: summary,
                            tokens: summary_tokens,
                            original_tokens: tokens,
                            original_lines: lines,
                            kept_lines: 0,
                            skip_reason: None,
                            size,
                        });
                    }
                    SkipReason::SummaryOverBudget {
                        tokens: summary_tokens,
                        remaining,
                    }
                }
                Err(e) => SkipReason::Summarizer(e),
            };
        }

        debug!(path = %path, reason = %reason, "Skipped");
        Ok(Decision::skipped(path, size, tokens, lines, reason))
    }
}
