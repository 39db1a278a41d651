#![deny(unsafe_code)]

//! repo2context core engine.
//!
//! Walks a source tree, filters it with gitignore-style rules, fits file
//! contents into a token budget (in full, truncated, or summarized), and
//! renders the result as a single Markdown document for use as LLM context.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future; the standard return type for async
/// trait methods that require dynamic dispatch (`dyn Trait`).
///
/// Native `async fn` in traits produces opaque return types that are **not**
/// object-safe. Traits consumed via `Box<dyn Trait>` must return a concrete
/// `Pin<Box<dyn Future>>` instead. This alias keeps those signatures readable.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Zeroizing API credential for the summarizer.
pub mod credential;
/// Pipeline wiring for one run.
pub mod engine;
/// Fatal errors and non-fatal diagnostics.
pub mod error;
/// Ignore rules, traversal, and the read step.
pub mod filter;
/// Completion providers used for summaries.
pub mod llm;
/// Atomic document output.
pub mod output;
/// Markdown rendering.
pub mod render;
/// Budgeted content selection.
pub mod select;
/// Summarization adapter.
pub mod summarize;
/// Token counting.
pub mod tokens;
/// Repository tree model.
pub mod tree;

pub use credential::ApiKey;
pub use engine::{ContextEngine, RunOutput, RunStatus};
pub use error::{Diagnostic, EngineError};
pub use filter::Polarity;
pub use output::OutputTarget;
