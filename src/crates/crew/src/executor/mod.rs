//! Model access for the worker and planner
//!
//! # Components
//!
//! - **LLM Provider** - wraps a [`llm::TextGenerator`] with per-call timeout,
//!   bounded retry and sentinel text on failure
//! - **Retry** - generic retry loop with configurable delay

mod llm_provider;
pub mod retry;

pub use llm_provider::{is_sentinel, sentinel, LlmProvider, SENTINEL_PREFIX};
pub use retry::{with_retry_when, Exhausted, RetryConfig};
