//! Model calls with timeout, bounded retry and a text fallback.
//!
//! Callers never see an LLM error: after the last attempt the failure is
//! turned into sentinel text, and the task it belongs to still completes.

use super::retry::{with_retry_when, Exhausted, RetryConfig};
use crate::config::CrewConfig;
use crate::error::Result;
use llm::local::OllamaClient;
use llm::{ChatMessage, LlmError, TextGenerator};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix of every sentinel result
pub const SENTINEL_PREFIX: &str = "Error: unable to process this task";

/// Retrying wrapper around a [`TextGenerator`]
#[derive(Clone)]
pub struct LlmProvider {
    generator: Arc<dyn TextGenerator>,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider")
            .field("model", &self.generator.model())
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmProvider {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryConfig) -> Self {
        Self {
            generator,
            retry,
            timeout: None,
        }
    }

    /// Bound each attempt with its own timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ollama-backed provider from crew configuration
    pub fn from_config(config: &CrewConfig) -> Result<Self> {
        let client = OllamaClient::new(config.llm_config())?;
        Ok(Self::new(Arc::new(client), config.retry_config()).with_timeout(config.llm_timeout()))
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// One call with retries; errors are returned.
    pub async fn try_generate(&self, context_id: &str, messages: &[ChatMessage]) -> llm::Result<String> {
        self.call(context_id, messages).await.map_err(|e| e.error)
    }

    /// One call with retries; failures become sentinel text.
    pub async fn generate(&self, context_id: &str, messages: &[ChatMessage]) -> String {
        match self.call(context_id, messages).await {
            Ok(text) => text,
            Err(Exhausted { error, attempts }) => {
                warn!(
                    context_id = %context_id,
                    attempts = attempts,
                    error = %error,
                    "Model call failed, using sentinel result"
                );
                sentinel(attempts, &error)
            }
        }
    }

    async fn call(
        &self,
        context_id: &str,
        messages: &[ChatMessage],
    ) -> std::result::Result<String, Exhausted<LlmError>> {
        debug!(
            context_id = %context_id,
            model = %self.generator.model(),
            messages = messages.len(),
            "Calling model"
        );
        with_retry_when(
            &self.retry,
            context_id,
            || self.attempt(messages),
            LlmError::is_retryable,
        )
        .await
    }

    async fn attempt(&self, messages: &[ChatMessage]) -> llm::Result<String> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.generator.generate(messages))
                .await
                .map_err(|_| LlmError::Timeout(format!("no response within {:?}", limit)))?,
            None => self.generator.generate(messages).await,
        }
    }
}

/// Text stored as a task result when the model could not be reached.
pub fn sentinel(attempts: usize, error: &LlmError) -> String {
    format!(
        "{} after {} attempt(s): {}",
        SENTINEL_PREFIX, attempts, error
    )
}

pub fn is_sentinel(text: &str) -> bool {
    text.starts_with(SENTINEL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
        error: fn() -> LlmError,
    }

    #[async_trait]
    impl TextGenerator for Flaky {
        async fn generate(&self, _messages: &[ChatMessage]) -> llm::Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)())
            } else {
                Ok("fine".to_string())
            }
        }

        fn model(&self) -> &str {
            "flaky"
        }
    }

    fn flaky(failures: usize, error: fn() -> LlmError) -> Arc<Flaky> {
        Arc::new(Flaky {
            failures,
            calls: AtomicUsize::new(0),
            error,
        })
    }

    fn unavailable() -> LlmError {
        LlmError::ServiceUnavailable("connection refused".to_string())
    }

    fn missing_model() -> LlmError {
        LlmError::ModelNotFound("nope".to_string())
    }

    #[tokio::test]
    async fn test_recovers_within_retries() {
        let generator = flaky(2, unavailable);
        let provider = LlmProvider::new(generator.clone(), RetryConfig::fixed(2, Duration::ZERO));
        assert_eq!(provider.generate("t1", &[ChatMessage::user("hi")]).await, "fine");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_yields_sentinel() {
        let generator = flaky(10, unavailable);
        let provider = LlmProvider::new(generator.clone(), RetryConfig::fixed(2, Duration::ZERO));
        let text = provider.generate("t1", &[ChatMessage::user("hi")]).await;
        assert!(is_sentinel(&text));
        assert!(text.contains("after 3 attempt(s)"));
        assert!(text.contains("connection refused"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let generator = flaky(10, missing_model);
        let provider = LlmProvider::new(generator.clone(), RetryConfig::fixed(5, Duration::ZERO));
        assert!(provider.try_generate("t1", &[]).await.is_err());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sentinel_counts_attempts_made() {
        let generator = flaky(10, missing_model);
        let provider = LlmProvider::new(generator.clone(), RetryConfig::fixed(2, Duration::ZERO));
        let text = provider.generate("t1", &[ChatMessage::user("hi")]).await;
        assert!(is_sentinel(&text));
        assert!(text.contains("after 1 attempt(s)"), "{}", text);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    struct Stalled;

    #[async_trait]
    impl TextGenerator for Stalled {
        async fn generate(&self, _messages: &[ChatMessage]) -> llm::Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }

        fn model(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_per_attempt() {
        let provider = LlmProvider::new(Arc::new(Stalled), RetryConfig::none())
            .with_timeout(Duration::from_secs(60));
        let err = provider.try_generate("t1", &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_is_reported_exactly() {
        let provider = LlmProvider::new(Arc::new(Stalled), RetryConfig::none())
            .with_timeout(Duration::from_millis(250));
        let err = provider.try_generate("t1", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Request timeout: no response within 250ms");
    }
}
