//! Local LLM provider implementations.
//!
//! Providers here run on localhost or a local network and need no API key.
//!
//! # Providers
//!
//! - **Ollama** - local LLM runner with wide model support

pub mod ollama;

pub use ollama::OllamaClient;
