//! Configuration for the local inference server client.

use crate::template::PromptFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a local LLM server (Ollama or compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalLlmConfig {
    /// Base URL for the local LLM server.
    ///
    /// Examples:
    /// - Ollama: "http://localhost:11434"
    /// - Remote Ollama box: "http://192.168.1.100:11434"
    pub base_url: String,

    /// Model name/identifier, e.g. "llama2:13b" or "llama3:70b".
    pub model: String,

    /// Request timeout duration.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Template used to flatten role-tagged messages into one prompt.
    #[serde(default)]
    pub prompt_format: PromptFormat,

    /// Sampling temperature passed through to the server, if set.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens, if set.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl LocalLlmConfig {
    /// Create a new local LLM configuration.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            timeout: default_timeout(),
            prompt_format: PromptFormat::default(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the prompt template.
    pub fn with_prompt_format(mut self, format: PromptFormat) -> Self {
        self.prompt_format = format;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_config_builder() {
        let config = LocalLlmConfig::new("http://localhost:11434", "llama2:13b")
            .with_timeout(Duration::from_secs(300))
            .with_prompt_format(PromptFormat::ChatMl)
            .with_temperature(0.2)
            .with_max_tokens(512);

        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "llama2:13b");
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.prompt_format, PromptFormat::ChatMl);
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(512));
    }

    #[test]
    fn test_defaults() {
        let config = LocalLlmConfig::new("http://localhost:11434", "llama2");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.prompt_format, PromptFormat::Llama2);
        assert!(config.temperature.is_none());
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let config = LocalLlmConfig::new("http://localhost:11434/", "llama2");
        assert_eq!(config.endpoint("/api/generate"), "http://localhost:11434/api/generate");
        assert_eq!(config.endpoint("api/tags"), "http://localhost:11434/api/tags");
    }
}
