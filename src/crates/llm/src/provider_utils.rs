//! Connection testing and model management for the inference server.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Information about a model installed on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier, e.g. "llama2:13b".
    pub id: String,

    /// On-disk size in bytes, when the server reports it.
    pub size: Option<u64>,

    /// Content digest, when the server reports it.
    pub digest: Option<String>,

    /// Last modification time as reported by the server.
    pub modified_at: Option<String>,
}

impl ModelInfo {
    /// Create a new ModelInfo with just an ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size: None,
            digest: None,
            modified_at: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn with_modified_at(mut self, modified_at: impl Into<String>) -> Self {
        self.modified_at = Some(modified_at.into());
        self
    }

    /// Whether this entry names the given model.
    ///
    /// A bare name such as "llama2" matches the implicit ":latest" tag.
    pub fn matches(&self, model: &str) -> bool {
        if self.id == model {
            return true;
        }
        !model.contains(':') && self.id == format!("{}:latest", model)
    }
}

/// One progress line from a streamed model download.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullProgress {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
}

impl PullProgress {
    /// Completion percentage for the current layer, if sizes are known.
    pub fn percent(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(done), Some(total)) if total > 0 => Some(done as f64 / total as f64 * 100.0),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Extended provider functionality for connection testing and model management.
#[async_trait]
pub trait ProviderUtils: Send + Sync {
    /// Ping the provider to check if it's reachable and responsive.
    ///
    /// Returns `Ok(true)` if the provider is available, `Ok(false)` if unreachable.
    async fn ping(&self) -> Result<bool>;

    /// Fetch the list of models installed on the provider.
    async fn fetch_models(&self) -> Result<Vec<ModelInfo>>;

    /// Whether the named model is installed.
    async fn has_model(&self, model: &str) -> Result<bool> {
        Ok(self.fetch_models().await?.iter().any(|m| m.matches(model)))
    }

    /// Switch to a different model. Returns the now-active model name.
    async fn use_model(&mut self, model: String) -> Result<String>;

    /// Get the currently active model.
    fn current_model(&self) -> &str;
}
