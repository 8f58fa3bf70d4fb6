//! Configuration management for crew
//!
//! Supports dual-location configuration:
//! - User-level: ~/.crew/crew.toml
//! - Project-level: ./.crew/crew.toml
//!
//! Project-level config overrides user-level config, one section at a time.

mod loader;
mod schema;

pub use loader::{ConfigLoader, CONFIG_DIR, CONFIG_FILE};
pub use schema::{
    AgentsConfig, CrewConfig, DocumentConfig, ExecutionConfig, LlmConfig, LoggingConfig,
    OutputConfig, ENV_BASE_URL, ENV_MODEL,
};

use crate::error::{CrewError, Result};

/// Load configuration from both locations with project config taking precedence
///
/// Priority order:
/// 1. Default values
/// 2. User-level config (~/.crew/crew.toml)
/// 3. Project-level config (./.crew/crew.toml)
/// 4. `CREW_LLM_BASE_URL` / `CREW_LLM_MODEL`
pub async fn load_config() -> Result<CrewConfig> {
    ConfigLoader::new().load().await
}

/// The default configuration as TOML text.
pub fn default_config_toml() -> Result<String> {
    render_config(&CrewConfig::default())
}

pub fn render_config(config: &CrewConfig) -> Result<String> {
    toml::to_string_pretty(config)
        .map_err(|e| CrewError::Config(format!("Failed to serialize config: {}", e)))
}
