//! Common test utilities and setup

#![allow(dead_code)]

use async_trait::async_trait;
use crew::{
    LlmProvider, Orchestrator, OutputStore, PersonaRegistry, ProjectStatus, RetryConfig,
    WorkerConfig,
};
use llm::{ChatMessage, LlmError, TextGenerator};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Replies with scripted responses in order, then with a fixed fallback.
/// Every conversation it receives is recorded.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedGenerator {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Self::with_fallback(replies, "Done.")
    }

    pub fn with_fallback(replies: &[&str], fallback: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fallback: fallback.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Concatenated message contents of call `n`.
    pub fn prompt(&self, n: usize) -> String {
        self.calls.lock()[n]
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> llm::Result<String> {
        self.calls.lock().push(messages.to_vec());
        Ok(self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Always fails with a retryable error.
#[derive(Default)]
pub struct FailingGenerator {
    pub attempts: AtomicUsize,
}

impl FailingGenerator {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> llm::Result<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::ServiceUnavailable("connection refused".to_string()))
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Answers after a delay, for observing a task while it is in progress.
pub struct SlowGenerator {
    pub delay: Duration,
}

#[async_trait]
impl TextGenerator for SlowGenerator {
    async fn generate(&self, _messages: &[ChatMessage]) -> llm::Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok("Finished eventually.".to_string())
    }

    fn model(&self) -> &str {
        "slow"
    }
}

/// Scripted replies, except that call number `panic_on` (0-based) panics.
pub struct PanickingGenerator {
    pub inner: Arc<ScriptedGenerator>,
    pub panic_on: usize,
    pub calls: AtomicUsize,
}

impl PanickingGenerator {
    pub fn new(replies: &[&str], panic_on: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: ScriptedGenerator::new(replies),
            panic_on,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for PanickingGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> llm::Result<String> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.panic_on {
            panic!("generator exploded");
        }
        self.inner.generate(messages).await
    }

    fn model(&self) -> &str {
        "panicking"
    }
}

/// Provider without retries or timeout.
pub fn provider(generator: Arc<dyn TextGenerator>) -> LlmProvider {
    LlmProvider::new(generator, RetryConfig::none())
}

/// Worker timings small enough for tests.
pub fn fast_worker_config() -> WorkerConfig {
    WorkerConfig {
        poll_wait: Duration::from_millis(100),
        idle_sleep: Duration::from_millis(10),
        error_backoff: Duration::from_millis(20),
        ..WorkerConfig::default()
    }
}

/// Orchestrator over `generator` with the specialist roster; outputs are
/// saved under `output_dir` when given.
pub fn orchestrator(generator: Arc<dyn TextGenerator>, output_dir: Option<&Path>) -> Orchestrator {
    Orchestrator::builder(provider(generator))
        .personas(PersonaRegistry::specialist())
        .outputs(output_dir.map(OutputStore::new))
        .worker_config(fast_worker_config())
        .build()
}

/// Poll until every task is completed, panicking after `timeout`.
pub async fn wait_until_finished(orchestrator: &Orchestrator, timeout: Duration) -> ProjectStatus {
    let waited = tokio::time::timeout(timeout, async {
        loop {
            let status = orchestrator.status();
            if status.is_finished() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    match waited {
        Ok(status) => status,
        Err(_) => panic!("project did not finish: {:#?}", orchestrator.status().tasks),
    }
}
