//! Configuration loader with dual-location support
//!
//! Loads configuration from:
//! 1. Default values
//! 2. User-level config: ~/.crew/crew.toml
//! 3. Project-level config: ./.crew/crew.toml
//!
//! Later configs override earlier ones. A file that is missing is skipped;
//! a file that exists but does not parse is an error.

use crate::config::schema::CrewConfig;
use crate::error::{CrewError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Directory name used at both locations
pub const CONFIG_DIR: &str = ".crew";

/// File name used at both locations
pub const CONFIG_FILE: &str = "crew.toml";

/// Configuration loader that handles both user and project configs
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    project_config_path: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader for the standard locations
    pub fn new() -> Self {
        Self {
            user_config_path: Self::user_config_path(),
            project_config_path: Self::project_config_path(),
        }
    }

    /// Loader for explicit locations
    pub fn with_paths(user: Option<PathBuf>, project: PathBuf) -> Self {
        Self {
            user_config_path: user,
            project_config_path: project,
        }
    }

    /// ~/.crew/crew.toml, when a home directory is known
    fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// ./.crew/crew.toml
    fn project_config_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// Load defaults, then the user file, then the project file, then
    /// environment overrides.
    pub async fn load(&self) -> Result<CrewConfig> {
        let mut config = CrewConfig::default();
        debug!("Loading configuration with defaults");

        if let Some(user_path) = &self.user_config_path {
            if let Some(user_config) = Self::load_if_present(user_path).await? {
                debug!(path = %user_path.display(), "Loaded user-level config");
                config.merge(user_config);
            }
        }

        if let Some(project_config) = Self::load_if_present(&self.project_config_path).await? {
            debug!(path = %self.project_config_path.display(), "Loaded project-level config");
            config.merge(project_config);
        }

        config.resolve_env_vars();

        info!(
            model = %config.llm.model,
            base_url = %config.llm.base_url,
            roster = %config.agents.roster,
            "Configuration loaded"
        );
        Ok(config)
    }

    async fn load_if_present(path: &Path) -> Result<Option<CrewConfig>> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found");
            return Ok(None);
        }
        Self::load_from_path(path).await.map(Some)
    }

    /// Load configuration from a specific path
    pub async fn load_from_path(path: &Path) -> Result<CrewConfig> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            CrewError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            CrewError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn get_user_config_path(&self) -> Option<&Path> {
        self.user_config_path.as_deref()
    }

    pub fn get_project_config_path(&self) -> &Path {
        &self.project_config_path
    }

    pub fn user_config_exists(&self) -> bool {
        self.user_config_path.as_ref().is_some_and(|p| p.exists())
    }

    pub fn project_config_exists(&self) -> bool {
        self.project_config_path.exists()
    }
}
