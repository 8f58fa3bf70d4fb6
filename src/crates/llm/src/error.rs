//! Error types for the LLM client.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when talking to the inference server.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize data.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Model not found or not pulled on the server.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Server not reachable (e.g., Ollama not running).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Invalid response from the server.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// A model download reported an error or never finished.
    #[error("Pull of '{model}' failed: {reason}")]
    PullFailed { model: String, reason: String },

    /// Server answered with a non-success status.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Bad client configuration (URL, template name).
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Transient failures a generate call may retry. Missing models, bad
    /// configuration and malformed payloads are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            LlmError::ServiceUnavailable(_)
            | LlmError::Timeout(_)
            | LlmError::ProviderError(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::Timeout("60s".to_string()).is_retryable());
        assert!(LlmError::ServiceUnavailable("down".to_string()).is_retryable());
        assert!(LlmError::ProviderError("500".to_string()).is_retryable());
        assert!(!LlmError::ModelNotFound("llama9".to_string()).is_retryable());
        assert!(!LlmError::ConfigError("bad url".to_string()).is_retryable());
        assert!(!LlmError::PullFailed {
            model: "llama2:13b".to_string(),
            reason: "disk full".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_pull_failure_message() {
        let err = LlmError::PullFailed {
            model: "mistral".to_string(),
            reason: "manifest unknown".to_string(),
        };
        assert_eq!(err.to_string(), "Pull of 'mistral' failed: manifest unknown");
    }

    #[test]
    fn test_serde_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let llm_err: LlmError = err.into();
        assert!(matches!(llm_err, LlmError::SerializationError(_)));
        assert!(llm_err.to_string().starts_with("Serialization error"));
    }
}
