//! Fatal errors and non-fatal diagnostics produced during a run.
//!
//! [`EngineError`] aborts a run before any output is written. Everything else
//! is a [`Diagnostic`]: collected while the pipeline runs and reported on
//! stderr after the document is emitted.

use std::path::PathBuf;

use crate::filter::FilterError;
use crate::output::OutputError;
use crate::select::{BudgetExceeded, SkipReason};
use crate::tree::DuplicatePath;

/// Fatal errors. A run that hits one of these produces no document.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot scan {}: {reason}", path.display())]
    Filesystem { path: PathBuf, reason: String },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("internal error: {0}")]
    Budget(#[from] BudgetExceeded),

    #[error("internal error: {0}")]
    Tree(#[from] DuplicatePath),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl EngineError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EngineError::Filesystem {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Non-fatal events collected during a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("could not read {path}: {message}")]
    FileRead { path: String, message: String },

    #[error(
        "no tokenizer for model {model:?}; token counts are estimated at 4 characters per token"
    )]
    DegradedEstimate { model: String },

    #[error("{path}: summarizer unavailable: {reason}")]
    SummarizerUnavailable { path: String, reason: String },

    #[error("{path}: summary request failed: {message}")]
    SummarizerRequestFailed { path: String, message: String },

    #[error("ignore file {} not found; continuing without it", path.display())]
    MissingIgnoreFile { path: PathBuf },

    #[error("{path} is {size} bytes, over the {limit} byte limit; not read")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    #[error("could not read directory {path}: {message}")]
    UnreadableDirectory { path: String, message: String },

    #[error("{path} skipped: {reason}")]
    Skipped { path: String, reason: SkipReason },
}
