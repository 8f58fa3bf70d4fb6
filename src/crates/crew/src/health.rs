//! Health checks
//!
//! Verifies the model server, the configured model, the configuration itself
//! and the output directory before a project is run.

use crate::config::CrewConfig;
use crate::error::Result;
use llm::local::OllamaClient;
use llm::ProviderUtils;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All checks passed
    Healthy,
    /// Runs, but something will not work as configured
    Degraded,
    /// Projects cannot run
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Result of one check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: Some("OK".to_string()),
            response_time_ms,
        }
    }

    pub fn degraded(
        name: impl Into<String>,
        message: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            response_time_ms,
        }
    }

    pub fn unhealthy(
        name: impl Into<String>,
        message: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            response_time_ms,
        }
    }
}

/// Overall health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Worst status among the checks
    pub status: HealthStatus,
    pub checks: Vec<ComponentHealth>,
    pub total_response_time_ms: u64,
    pub timestamp: i64,
}

impl HealthReport {
    pub fn new(checks: Vec<ComponentHealth>) -> Self {
        let status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            total_response_time_ms: checks.iter().map(|c| c.response_time_ms).sum(),
            checks,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Health checker for crew's collaborators
pub struct HealthChecker;

impl HealthChecker {
    /// Check that the model server answers
    pub async fn check_llm_server(server: &dyn ProviderUtils) -> ComponentHealth {
        let start = Instant::now();

        match server.ping().await {
            Ok(true) => ComponentHealth::healthy("llm_server", elapsed_ms(start)),
            Ok(false) => ComponentHealth::unhealthy(
                "llm_server",
                "Server answered with an error status",
                elapsed_ms(start),
            ),
            Err(e) => ComponentHealth::unhealthy(
                "llm_server",
                format!("Cannot reach server: {}", e),
                elapsed_ms(start),
            ),
        }
    }

    /// Check that the configured model is installed
    pub async fn check_model(server: &dyn ProviderUtils, model: &str) -> ComponentHealth {
        let start = Instant::now();

        match server.has_model(model).await {
            Ok(true) => ComponentHealth::healthy("model", elapsed_ms(start)),
            Ok(false) => ComponentHealth::degraded(
                "model",
                format!("Model '{}' is not installed (run `crew pull {}`)", model, model),
                elapsed_ms(start),
            ),
            Err(e) => ComponentHealth::unhealthy(
                "model",
                format!("Cannot list models: {}", e),
                elapsed_ms(start),
            ),
        }
    }

    /// Check configuration values
    pub fn check_config(config: &CrewConfig) -> ComponentHealth {
        let start = Instant::now();
        let mut issues = Vec::new();

        if config.llm.model.trim().is_empty() {
            issues.push("LLM model not configured");
        }
        if !config.llm.base_url.starts_with("http://") && !config.llm.base_url.starts_with("https://") {
            issues.push("base_url is not an http(s) URL");
        }
        if config.llm.timeout_secs == 0 {
            issues.push("timeout_secs is 0");
        }
        if config.document.max_chars == 0 {
            issues.push("document max_chars is 0");
        }
        if config.output.enabled && config.output.directory.trim().is_empty() {
            issues.push("output directory is empty");
        }

        if issues.is_empty() {
            ComponentHealth::healthy("configuration", elapsed_ms(start))
        } else {
            ComponentHealth::degraded("configuration", issues.join("; "), elapsed_ms(start))
        }
    }

    /// Check the output directory. A missing directory is created on the
    /// first save, so it only degrades.
    pub async fn check_output_dir(dir: &Path) -> ComponentHealth {
        let start = Instant::now();

        match tokio::fs::metadata(dir).await {
            Ok(metadata) if metadata.is_dir() => {
                if metadata.permissions().readonly() {
                    ComponentHealth::unhealthy(
                        "output_directory",
                        "Output directory is read-only",
                        elapsed_ms(start),
                    )
                } else {
                    ComponentHealth::healthy("output_directory", elapsed_ms(start))
                }
            }
            Ok(_) => ComponentHealth::unhealthy(
                "output_directory",
                "Output path is not a directory",
                elapsed_ms(start),
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ComponentHealth::degraded(
                "output_directory",
                format!("{} does not exist yet", dir.display()),
                elapsed_ms(start),
            ),
            Err(e) => ComponentHealth::unhealthy(
                "output_directory",
                format!("Cannot access output directory: {}", e),
                elapsed_ms(start),
            ),
        }
    }

    /// Run every check against the configured server
    pub async fn check_all(config: &CrewConfig) -> Result<HealthReport> {
        let client = OllamaClient::new(config.llm_config())?;
        let mut checks = vec![Self::check_config(config)];

        let server = Self::check_llm_server(&client).await;
        let reachable = server.status == HealthStatus::Healthy;
        checks.push(server);
        if reachable {
            checks.push(Self::check_model(&client, &config.llm.model).await);
        }

        if let Some(dir) = config.output_dir() {
            checks.push(Self::check_output_dir(&dir).await);
        }

        Ok(HealthReport::new(checks))
    }
}
