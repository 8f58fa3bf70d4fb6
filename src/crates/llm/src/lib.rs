//! Local LLM endpoint client for crew.
//!
//! This crate talks to a locally hosted inference server (Ollama-compatible
//! HTTP API) and hides it behind the [`TextGenerator`] trait, so callers only
//! ever see "role-tagged messages in, text out".
//!
//! Messages are flattened into a single templated prompt before transmission
//! (see [`PromptFormat`]); the server's raw-completion endpoint is used rather
//! than its chat endpoint so the template stays under our control.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::local::OllamaClient;
//! use llm::{ChatMessage, LocalLlmConfig, TextGenerator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LocalLlmConfig::new("http://localhost:11434", "llama2:13b");
//!     let client = OllamaClient::new(config)?;
//!
//!     let text = client
//!         .generate(&[
//!             ChatMessage::system("You are a helpful assistant."),
//!             ChatMessage::user("What is Rust?"),
//!         ])
//!         .await?;
//!     println!("{}", text);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod message;
pub mod provider_utils;
pub mod template;

#[cfg(feature = "local")]
pub mod local;

pub use config::LocalLlmConfig;
pub use error::{LlmError, Result};
pub use generator::TextGenerator;
pub use message::{ChatMessage, Role};
pub use provider_utils::{ModelInfo, ProviderUtils, PullProgress};
pub use template::PromptFormat;
