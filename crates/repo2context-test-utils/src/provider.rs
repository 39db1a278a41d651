//! A scripted completion provider.
//!
//! Replays canned replies in order and counts calls, so summarizer tests can
//! assert on network attempts without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use repo2context_core::BoxFuture;
use repo2context_core::llm::{
    Completion, CompletionProvider, CompletionRequest, LlmError, TokenUsage,
};

/// Provider returning scripted replies; once the script runs out the last
/// reply repeats.
#[derive(Clone)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    last: Arc<Mutex<Option<Result<String, LlmError>>>>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Always reply with `text`.
    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Always fail with `error`.
    pub fn failing(error: LlmError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Sleep before every reply (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter; stays valid after the provider is boxed.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn next_reply(&self) -> Result<String, LlmError> {
        let mut replies = self.replies.lock().expect("replies lock");
        let mut last = self.last.lock().expect("last lock");
        if let Some(reply) = replies.pop_front() {
            *last = Some(reply.clone());
            reply
        } else {
            last.clone()
                .unwrap_or_else(|| Err(LlmError::Request("script exhausted".to_string())))
        }
    }
}

impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn complete(&self, request: &CompletionRequest) -> BoxFuture<'_, Result<Completion, LlmError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        let reply = self.next_reply();
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            reply.map(|text| Completion {
                text,
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
                model: "scripted".to_string(),
            })
        })
    }
}
