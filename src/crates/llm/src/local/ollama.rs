//! Ollama client implementation.
//!
//! Talks to the raw-completion endpoint (`/api/generate`) with a prompt that
//! has already been flattened by the configured [`PromptFormat`], plus the
//! model-management endpoints (`/api/tags`, `/api/version`, `/api/pull`).
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::local::OllamaClient;
//! use llm::{ChatMessage, LocalLlmConfig, TextGenerator};
//!
//! let config = LocalLlmConfig::new("http://localhost:11434", "llama2");
//! let client = OllamaClient::new(config)?;
//!
//! let text = client.generate(&[ChatMessage::user("Hello!")]).await?;
//! ```
//!
//! [`PromptFormat`]: crate::template::PromptFormat

use crate::config::LocalLlmConfig;
use crate::error::{LlmError, Result};
use crate::generator::TextGenerator;
use crate::message::ChatMessage;
use crate::provider_utils::{ModelInfo, ProviderUtils, PullProgress};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ollama client for local LLM inference.
#[derive(Clone)]
pub struct OllamaClient {
    config: LocalLlmConfig,
    client: Client,
}

impl OllamaClient {
    /// Create a new Ollama client with the given configuration.
    pub fn new(config: LocalLlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LocalLlmConfig {
        &self.config
    }

    /// Check if Ollama server is running.
    pub async fn check_health(&self) -> Result<bool> {
        let url = self.config.endpoint("/api/tags");
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                debug!(url = %url, error = %e, "Ollama health check failed");
                Ok(false)
            }
        }
    }

    /// Server version string as reported by `/api/version`.
    pub async fn version(&self) -> Result<String> {
        let url = self.config.endpoint("/api/version");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::ServiceUnavailable(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(LlmError::ProviderError(format!(
                "Ollama version request failed with status {}",
                response.status()
            )));
        }

        let body: VersionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(body.version)
    }

    /// Download a model, reporting each progress line to `on_progress`.
    ///
    /// Returns once the server reports `success`, or with an error if the
    /// stream ends early or carries an error line.
    pub async fn pull_model<F>(&self, model: &str, mut on_progress: F) -> Result<()>
    where
        F: FnMut(&PullProgress) + Send,
    {
        let url = self.config.endpoint("/api/pull");
        let response = self
            .client
            .post(&url)
            .json(&PullRequest { name: model, stream: true })
            // Downloads outlive the per-request generation timeout.
            .timeout(std::time::Duration::from_secs(60 * 60 * 6))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ProviderError(format!(
                "Ollama pull error {}: {}",
                status, error_text
            )));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = LineBuffer::default();
        let mut succeeded = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in buffer.push(&chunk) {
                let progress = parse_pull_line(model, &line)?;
                succeeded |= progress.is_success();
                on_progress(&progress);
            }
        }
        if let Some(line) = buffer.finish() {
            let progress = parse_pull_line(model, &line)?;
            succeeded |= progress.is_success();
            on_progress(&progress);
        }

        if succeeded {
            Ok(())
        } else {
            Err(LlmError::PullFailed {
                model: model.to_string(),
                reason: "stream ended without a success status".to_string(),
            })
        }
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        let options = if self.config.temperature.is_some() || self.config.max_tokens.is_some() {
            Some(GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            })
        } else {
            None
        };

        GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options,
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = self.config.endpoint("/api/generate");
        let prompt = self.config.prompt_format.render(messages);
        let body = self.build_request(&prompt);

        debug!(
            model = %self.config.model,
            format = %self.config.prompt_format,
            prompt_chars = prompt.len(),
            "Sending generate request"
        );

        let call = async {
            let response = self.client.post(&url).json(&body).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(LlmError::ModelNotFound(format!(
                        "{} ({})",
                        self.config.model, error_text
                    )));
                }
                return Err(LlmError::ProviderError(format!(
                    "Ollama API error {}: {}",
                    status, error_text
                )));
            }

            let generated: GenerateResponse = response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
            Ok::<GenerateResponse, LlmError>(generated)
        };

        let generated = tokio::time::timeout(self.config.timeout, call)
            .await
            .map_err(|_| {
                warn!(model = %self.config.model, timeout = ?self.config.timeout, "Generate request timed out");
                LlmError::Timeout(format!("{:?}", self.config.timeout))
            })??;

        debug!(
            model = %generated.model,
            done = generated.done,
            eval_count = generated.eval_count.unwrap_or(0),
            "Received generate response"
        );

        Ok(generated.response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ProviderUtils for OllamaClient {
    async fn ping(&self) -> Result<bool> {
        self.check_health().await
    }

    async fn fetch_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.config.endpoint("/api/tags");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(LlmError::ProviderError(
                "Failed to fetch models from Ollama".to_string(),
            ));
        }

        let models_response: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(models_response
            .models
            .into_iter()
            .map(TagEntry::into_model_info)
            .collect())
    }

    async fn use_model(&mut self, model: String) -> Result<String> {
        self.config.model = model.clone();
        Ok(model)
    }

    fn current_model(&self) -> &str {
        &self.config.model
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<usize>,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    modified_at: Option<String>,
}

impl TagEntry {
    fn into_model_info(self) -> ModelInfo {
        let mut info = ModelInfo::new(self.name);
        if let Some(size) = self.size {
            info = info.with_size(size);
        }
        if let Some(digest) = self.digest {
            info = info.with_digest(digest);
        }
        if let Some(modified) = self.modified_at {
            info = info.with_modified_at(modified);
        }
        info
    }
}

#[derive(Debug, Deserialize)]
struct PullLine {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    progress: PullProgress,
}

fn parse_pull_line(model: &str, line: &str) -> Result<PullProgress> {
    let parsed: PullLine = serde_json::from_str(line)?;
    match parsed.error {
        Some(reason) => Err(LlmError::PullFailed {
            model: model.to_string(),
            reason,
        }),
        None => Ok(parsed.progress),
    }
}

/// Splits a chunked byte stream into complete newline-terminated lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::PromptFormat;
    use std::time::Duration;

    fn client(model: &str) -> OllamaClient {
        OllamaClient::new(LocalLlmConfig::new("http://localhost:11434", model)).unwrap()
    }

    // ============================================================
    // Construction
    // ============================================================

    #[test]
    fn test_client_creation() {
        let client = client("llama2");
        assert_eq!(client.current_model(), "llama2");
        assert_eq!(TextGenerator::model(&client), "llama2");
    }

    #[test]
    fn test_config_with_custom_timeout() {
        let config = LocalLlmConfig::new("http://localhost:11434", "llama2")
            .with_timeout(Duration::from_secs(120));
        let client = OllamaClient::new(config).unwrap();
        assert_eq!(client.config().timeout, Duration::from_secs(120));
    }

    // ============================================================
    // Request Shape
    // ============================================================

    #[test]
    fn test_generate_request_is_non_streaming() {
        let client = client("llama2");
        let body = serde_json::to_value(client.build_request("hello")).unwrap();
        assert_eq!(body["model"], "llama2");
        assert_eq!(body["prompt"], "hello");
        assert_eq!(body["stream"], false);
        assert!(body.get("options").is_none());
    }

    #[test]
    fn test_generate_request_carries_options() {
        let config = LocalLlmConfig::new("http://localhost:11434", "mistral")
            .with_temperature(0.5)
            .with_max_tokens(64)
            .with_prompt_format(PromptFormat::ChatMl);
        let client = OllamaClient::new(config).unwrap();
        let body = serde_json::to_value(client.build_request("p")).unwrap();
        assert_eq!(body["options"]["temperature"], 0.5);
        assert_eq!(body["options"]["num_predict"], 64);
    }

    #[test]
    fn test_generate_response_tolerates_missing_fields() {
        let resp: GenerateResponse =
            serde_json::from_str(r#"{"response":"Hi there","done":true}"#).unwrap();
        assert_eq!(resp.response, "Hi there");
        assert!(resp.done);
        assert!(resp.eval_count.is_none());
    }

    // ============================================================
    // Model Management
    // ============================================================

    #[tokio::test]
    async fn test_use_model() {
        let mut client = client("llama2");
        let new_model = client.use_model("mistral".to_string()).await.unwrap();
        assert_eq!(new_model, "mistral");
        assert_eq!(client.current_model(), "mistral");
        assert_eq!(client.config().model, "mistral");
    }

    #[test]
    fn test_tags_response_conversion() {
        let body = r#"{"models":[{"name":"llama2:latest","size":3825819519,"digest":"fe938a","modified_at":"2024-01-01T00:00:00Z"}]}"#;
        let tags: TagsResponse = serde_json::from_str(body).unwrap();
        let models: Vec<ModelInfo> = tags.models.into_iter().map(TagEntry::into_model_info).collect();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "llama2:latest");
        assert_eq!(models[0].size, Some(3825819519));
        assert!(models[0].matches("llama2"));
    }

    #[test]
    fn test_pull_line_error_is_surfaced() {
        let err = parse_pull_line("nope", r#"{"error":"pull model manifest: file does not exist"}"#)
            .unwrap_err();
        assert!(matches!(err, LlmError::PullFailed { ref model, .. } if model == "nope"));
        let progress =
            parse_pull_line("llama2", r#"{"status":"downloading","total":10,"completed":5}"#).unwrap();
        assert_eq!(progress.percent(), Some(50.0));
    }

    #[test]
    fn test_line_buffer_handles_split_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"status\":\"pul").is_empty());
        let lines = buffer.push(b"ling\"}\n{\"status\":\"success\"}\n{\"sta");
        assert_eq!(lines, vec![r#"{"status":"pulling"}"#, r#"{"status":"success"}"#]);
        buffer.push(b"tus\":\"tail\"}");
        assert_eq!(buffer.finish().as_deref(), Some(r#"{"status":"tail"}"#));
        assert!(buffer.finish().is_none());
    }

    // ============================================================
    // Live Server (ignored by default)
    // ============================================================

    #[tokio::test]
    #[ignore]
    async fn test_health_check() {
        // Requires a running Ollama server; unreachable is `false`, not an error.
        let healthy = client("llama2").check_health().await.unwrap();
        println!("Ollama health: {}", healthy);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy() {
        let config = LocalLlmConfig::new("http://127.0.0.1:9", "llama2")
            .with_timeout(Duration::from_secs(2));
        let client = OllamaClient::new(config).unwrap();
        assert!(!client.check_health().await.unwrap());
        assert!(client.generate(&[ChatMessage::user("hi")]).await.is_err());
    }
}
