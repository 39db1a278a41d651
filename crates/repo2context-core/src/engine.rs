//! One run of the pipeline: filter, read, select, render.
//!
//! ```text
//! PathFilter ──▶ read step ──▶ ContentSelector ──▶ MarkdownRenderer
//!                               │        │
//!                          TokenMeter  Summarizer
//! ```
//!
//! Everything is sequential. The engine is async only because a summary
//! request may be awaited in the middle of the selection pass.

use std::path::{Path, PathBuf};

use repo2context_config::AppConfig;
use tracing::{debug, info};

use crate::credential::ApiKey;
use crate::error::{Diagnostic, EngineError};
use crate::filter::{self, FileCandidate, PathFilter, Polarity, read_candidate};
use crate::llm::CompletionProvider;
use crate::render::{BudgetSummary, ContextDocument, MarkdownRenderer, RenderOptions};
use crate::select::{
    ContentSelector, Decision, DecisionMode, PriorityOrder, SelectorOptions, SkipReason,
    TokenBudget,
};
use crate::summarize::{Summarizer, SummarizerError, SummarizerOptions};
use crate::tokens::{TokenCounter, TokenMeter};
use crate::tree::{EntryKind, EntryStatus, RepositoryTree};

/// Overall outcome, mapped to the process exit code by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every candidate went in full.
    Complete,
    /// At least one file was truncated, summarized or skipped.
    Partial,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Complete => 0,
            RunStatus::Partial => 1,
        }
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunOutput {
    pub document: ContextDocument,
    /// The rendered Markdown, ready to write.
    pub markdown: String,
    pub decisions: Vec<Decision>,
    pub tree: RepositoryTree,
    pub budget: TokenBudget,
    pub scheme: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Summary requests that reached a provider.
    pub summary_requests: usize,
}

impl RunOutput {
    pub fn status(&self) -> RunStatus {
        if self.decisions.iter().all(|d| d.mode == DecisionMode::Full) {
            RunStatus::Complete
        } else {
            RunStatus::Partial
        }
    }

    /// Decisions with the given mode.
    pub fn count(&self, mode: DecisionMode) -> usize {
        self.decisions.iter().filter(|d| d.mode == mode).count()
    }
}

/// Builds and runs the pipeline for one scan root.
pub struct ContextEngine {
    root: PathBuf,
    config: AppConfig,
    overrides: Vec<(String, Polarity)>,
    api_key: Option<ApiKey>,
    provider: Option<Box<dyn CompletionProvider>>,
    counter: Option<Box<dyn TokenCounter>>,
    timestamp: Option<String>,
}

impl ContextEngine {
    pub fn new(root: impl Into<PathBuf>, config: AppConfig) -> Self {
        Self {
            root: root.into(),
            config,
            overrides: Vec::new(),
            api_key: None,
            provider: None,
            counter: None,
            timestamp: None,
        }
    }

    /// Command-line `--exclude` / `--include` patterns, in order.
    pub fn with_overrides(mut self, overrides: Vec<(String, Polarity)>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Credential for the configured summary provider.
    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Use this provider for summaries instead of building one from config.
    /// Still only consulted when `summary.enabled` is set.
    pub fn with_provider(mut self, provider: Box<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Count tokens with this counter instead of resolving `budget.model`.
    pub fn with_token_counter(mut self, counter: Box<dyn TokenCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Fixed text for the timestamp line; implies the line is shown.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Run the pipeline. Nothing is written; see [`crate::output`].
    pub async fn run(self) -> Result<RunOutput, EngineError> {
        let Self {
            root,
            config,
            overrides,
            api_key,
            provider,
            counter,
            timestamp,
        } = self;

        filter::check_root(&root)?;
        let mut diagnostics = Vec::new();

        let rules = filter::build_rules(&root, &config.filter, &overrides)?;
        diagnostics.extend(
            rules
                .missing_files()
                .iter()
                .map(|path| Diagnostic::MissingIgnoreFile { path: path.clone() }),
        );
        let priority = PriorityOrder::new(&config.budget.priority)?;

        let meter = match counter {
            Some(counter) => TokenMeter::with_counter(counter),
            None => TokenMeter::for_model(&config.budget.model),
        };
        diagnostics.extend(meter.degraded_warning());
        let approximate = meter.is_degraded();

        let summarizer = match provider {
            Some(provider) if config.summary.enabled => Summarizer::with_provider(
                provider,
                SummarizerOptions::from_config(&config.summary),
            ),
            _ => Summarizer::from_config(&config.summary, api_key),
        };

        let mut selector = ContentSelector::new(
            meter,
            summarizer,
            config.budget.max_tokens,
            SelectorOptions {
                truncate: config.budget.truncate,
                min_truncated_lines: config.budget.min_truncated_lines,
            },
        );

        let path_filter = PathFilter::new(&root, rules)
            .with_extensions(config.filter.normalized_extensions())
            .with_max_file_bytes(config.filter.max_file_bytes);
        let mut tree = RepositoryTree::new(root_name(&root));
        let mut decisions = Vec::new();
        let mut deferred: Vec<FileCandidate> = Vec::new();

        for entry in path_filter.walk()? {
            let mut status = entry.status;
            match (entry.kind, entry.status) {
                (EntryKind::File, EntryStatus::Candidate) => {
                    match read_candidate(&entry.path, &entry.rel) {
                        Ok(candidate) if candidate.is_binary() => {
                            debug!(path = %entry.rel, "Binary content");
                            status = EntryStatus::Binary;
                        }
                        Ok(candidate) if priority.is_empty() => {
                            decisions.push(selector.select(candidate).await?);
                        }
                        Ok(candidate) => deferred.push(candidate),
                        Err(e) => {
                            status = EntryStatus::Unreadable;
                            diagnostics.push(Diagnostic::FileRead {
                                path: entry.rel.clone(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
                (_, EntryStatus::TooLarge) => diagnostics.push(Diagnostic::FileTooLarge {
                    path: entry.rel.clone(),
                    size: entry.size,
                    limit: config.filter.max_file_bytes,
                }),
                (EntryKind::Directory, EntryStatus::Unreadable) => {
                    diagnostics.push(Diagnostic::UnreadableDirectory {
                        path: entry.rel.clone(),
                        message: entry.error.clone().unwrap_or_default(),
                    });
                }
                (EntryKind::File, EntryStatus::Unreadable) => {
                    diagnostics.push(Diagnostic::FileRead {
                        path: entry.rel.clone(),
                        message: entry.error.clone().unwrap_or_default(),
                    });
                }
                _ => {}
            }
            tree.insert(&entry.rel, entry.kind, status, entry.size)?;
        }

        if !deferred.is_empty() {
            priority.sort(&mut deferred);
            for candidate in deferred {
                decisions.push(selector.select(candidate).await?);
            }
        }

        diagnostics.extend(decisions.iter().filter_map(skip_diagnostic));

        let budget = selector.budget();
        let scheme = selector.meter().scheme().to_string();
        let summary_requests = selector.summarizer().attempts();

        let timestamp = timestamp.or_else(|| {
            config
                .output
                .timestamp
                .then(|| chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string())
        });
        let renderer = MarkdownRenderer::new(RenderOptions {
            show_ignored: config.filter.show_ignored,
            timestamp,
        });
        let document = renderer.render(
            &decisions,
            &tree,
            &BudgetSummary {
                consumed: budget.consumed(),
                limit: budget.limit(),
                scheme: scheme.clone(),
                approximate,
            },
        );
        let markdown = document.to_markdown();

        let output = RunOutput {
            document,
            markdown,
            decisions,
            tree,
            budget,
            scheme,
            diagnostics,
            summary_requests,
        };
        info!(
            full = output.count(DecisionMode::Full),
            truncated = output.count(DecisionMode::Truncated),
            summarized = output.count(DecisionMode::Summarized),
            skipped = output.count(DecisionMode::Skipped),
            consumed = budget.consumed(),
            limit = budget.limit(),
            "Context assembled"
        );
        Ok(output)
    }
}

fn skip_diagnostic(decision: &Decision) -> Option<Diagnostic> {
    let path = decision.path.clone();
    match decision.skip_reason.as_ref()? {
        SkipReason::Binary => None,
        SkipReason::Summarizer(SummarizerError::Unavailable(reason)) => {
            Some(Diagnostic::SummarizerUnavailable {
                path,
                reason: reason.clone(),
            })
        }
        SkipReason::Summarizer(SummarizerError::RequestFailed(message)) => {
            Some(Diagnostic::SummarizerRequestFailed {
                path,
                message: message.clone(),
            })
        }
        reason => Some(Diagnostic::Skipped {
            path,
            reason: reason.clone(),
        }),
    }
}

/// Display name of the scan root.
fn root_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| root.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}
