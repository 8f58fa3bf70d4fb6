//! Configuration schema for crew

use crate::executor::RetryConfig;
use crate::persona::Roster;
use crate::worker::WorkerConfig;
use llm::{LocalLlmConfig, PromptFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment override for `[llm] base_url`
pub const ENV_BASE_URL: &str = "CREW_LLM_BASE_URL";

/// Environment override for `[llm] model`
pub const ENV_MODEL: &str = "CREW_LLM_MODEL";

/// Main crew configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CrewConfig {
    /// Model endpoint and call policy
    #[serde(default)]
    pub llm: LlmConfig,

    /// Worker loop timing
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Persona roster
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Artifact persistence
    #[serde(default)]
    pub output: OutputConfig,

    /// Document context ingestion
    #[serde(default)]
    pub document: DocumentConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Model endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama-compatible server URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name as known to the server
    #[serde(default = "default_model")]
    pub model: String,

    /// Template used to flatten messages into one prompt
    #[serde(default)]
    pub prompt_format: PromptFormat,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed call
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Fixed delay between retries in seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama2:13b".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_delay_secs() -> u64 {
    2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            prompt_format: PromptFormat::default(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Worker loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Bounded wait on the internal queue, in seconds
    #[serde(default = "default_poll_wait_secs")]
    pub poll_wait_secs: u64,

    /// Sleep when nothing is runnable, in milliseconds
    #[serde(default = "default_idle_sleep_ms")]
    pub idle_sleep_ms: u64,

    /// Sleep after an unexpected worker error, in seconds
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Completed peer results shown in each task prompt
    #[serde(default = "default_peer_results")]
    pub peer_results: usize,

    /// Characters kept from each peer result
    #[serde(default = "default_peer_excerpt_chars")]
    pub peer_excerpt_chars: usize,
}

fn default_poll_wait_secs() -> u64 {
    5
}

fn default_idle_sleep_ms() -> u64 {
    500
}

fn default_error_backoff_secs() -> u64 {
    5
}

fn default_peer_results() -> usize {
    3
}

fn default_peer_excerpt_chars() -> usize {
    200
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_wait_secs: default_poll_wait_secs(),
            idle_sleep_ms: default_idle_sleep_ms(),
            error_backoff_secs: default_error_backoff_secs(),
            peer_results: default_peer_results(),
            peer_excerpt_chars: default_peer_excerpt_chars(),
        }
    }
}

/// Persona configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Built-in roster: "specialist" or "versatile"
    #[serde(default)]
    pub roster: Roster,
}

/// Output persistence configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory; one subdirectory per persona
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Save every completed result as a file
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_output_directory() -> String {
    "outputs".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            enabled: true,
        }
    }
}

/// Document context configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Characters kept before the truncation notice
    #[serde(default = "default_document_max_chars")]
    pub max_chars: usize,
}

fn default_document_max_chars() -> usize {
    crate::document::DEFAULT_MAX_CHARS
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_chars: default_document_max_chars(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_level")]
    pub level: String,

    /// Log format: "compact", "pretty", "json"
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output
    #[serde(default = "default_true")]
    pub colored: bool,

    /// Show timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "compact".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            colored: true,
            timestamps: true,
        }
    }
}

impl CrewConfig {
    /// Merge another configuration into this one.
    ///
    /// Sections are replaced whole, and only when `other` sets them to
    /// something other than the defaults.
    pub fn merge(&mut self, other: CrewConfig) {
        let defaults = CrewConfig::default();
        if other.llm != defaults.llm {
            self.llm = other.llm;
        }
        if other.execution != defaults.execution {
            self.execution = other.execution;
        }
        if other.agents != defaults.agents {
            self.agents = other.agents;
        }
        if other.output != defaults.output {
            self.output = other.output;
        }
        if other.document != defaults.document {
            self.document = other.document;
        }
        if other.logging != defaults.logging {
            self.logging = other.logging;
        }
    }

    /// Expand `${VAR}` string values, then apply the `CREW_LLM_*` overrides.
    pub fn resolve_env_vars(&mut self) {
        self.llm.base_url = Self::expand_env_var(&self.llm.base_url);
        self.llm.model = Self::expand_env_var(&self.llm.model);
        self.output.directory = Self::expand_env_var(&self.output.directory);

        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                self.llm.base_url = url;
            }
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            if !model.trim().is_empty() {
                self.llm.model = model;
            }
        }
    }

    /// Expand environment variable in a string
    ///
    /// Supports ${VAR_NAME} syntax for the whole value
    fn expand_env_var(value: &str) -> String {
        if value.starts_with("${") && value.ends_with('}') && value.len() > 3 {
            let var_name = &value[2..value.len() - 1];
            std::env::var(var_name).unwrap_or_else(|_| value.to_string())
        } else {
            value.to_string()
        }
    }

    /// Client configuration for the model endpoint
    pub fn llm_config(&self) -> LocalLlmConfig {
        let mut config = LocalLlmConfig::new(&self.llm.base_url, &self.llm.model)
            .with_timeout(Duration::from_secs(self.llm.timeout_secs))
            .with_prompt_format(self.llm.prompt_format);
        if let Some(temperature) = self.llm.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.llm.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        config
    }

    /// Fixed-delay retry policy for model calls
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::fixed(
            self.llm.max_retries,
            Duration::from_secs(self.llm.retry_delay_secs),
        )
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_wait: Duration::from_secs(self.execution.poll_wait_secs),
            idle_sleep: Duration::from_millis(self.execution.idle_sleep_ms),
            error_backoff: Duration::from_secs(self.execution.error_backoff_secs),
            peer_results: self.execution.peer_results,
            peer_excerpt_chars: self.execution.peer_excerpt_chars,
        }
    }

    /// Output root, `None` when persistence is disabled
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output
            .enabled
            .then(|| PathBuf::from(&self.output.directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrewConfig::default();
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.llm.model, "llama2:13b");
        assert_eq!(config.llm.prompt_format, PromptFormat::Llama2);
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.execution.poll_wait_secs, 5);
        assert_eq!(config.agents.roster, Roster::Specialist);
        assert_eq!(config.document.max_chars, 5000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CrewConfig = toml::from_str(
            r#"
            [llm]
            model = "mistral"
            prompt_format = "chatml"

            [agents]
            roster = "versatile"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.prompt_format, PromptFormat::ChatMl);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.llm.max_retries, 2);
        assert_eq!(config.agents.roster, Roster::Versatile);
        assert_eq!(config.output.directory, "outputs");
    }

    #[test]
    fn test_merge_keeps_sections_left_at_default() {
        let mut base = CrewConfig::default();
        base.llm.model = "user-model".to_string();

        let mut project = CrewConfig::default();
        project.output.directory = "artifacts".to_string();

        base.merge(project);

        assert_eq!(base.llm.model, "user-model");
        assert_eq!(base.output.directory, "artifacts");
    }

    #[test]
    fn test_env_var_expansion() {
        let mut config = CrewConfig::default();
        config.output.directory = "${CREW_TEST_OUTPUT_DIR_EXPANSION}".to_string();

        std::env::set_var("CREW_TEST_OUTPUT_DIR_EXPANSION", "/tmp/crew-out");
        config.resolve_env_vars();
        assert_eq!(config.output.directory, "/tmp/crew-out");
        std::env::remove_var("CREW_TEST_OUTPUT_DIR_EXPANSION");

        assert_eq!(CrewConfig::expand_env_var("${CREW_TEST_UNSET_VAR}"), "${CREW_TEST_UNSET_VAR}");
        assert_eq!(CrewConfig::expand_env_var("plain"), "plain");
    }

    #[test]
    fn test_derived_settings() {
        let mut config = CrewConfig::default();
        config.llm.temperature = Some(0.2);
        config.llm.max_retries = 4;

        let llm = config.llm_config();
        assert_eq!(llm.timeout, Duration::from_secs(60));
        assert_eq!(llm.temperature, Some(0.2));

        let retry = config.retry_config();
        assert_eq!(retry.max_retries, 4);
        assert_eq!(retry.calculate_delay(3), Duration::from_secs(2));

        assert_eq!(config.output_dir(), Some(PathBuf::from("outputs")));
        config.output.enabled = false;
        assert_eq!(config.output_dir(), None);
    }
}
