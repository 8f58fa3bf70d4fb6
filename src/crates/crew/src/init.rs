//! First-time setup
//!
//! Writes a commented default configuration to `~/.crew/crew.toml`, or to
//! `./.crew/crew.toml` for a project-level override.

use crate::config::{default_config_toml, CONFIG_DIR, CONFIG_FILE};
use crate::error::{CrewError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const HEADER: &str = "\
# crew configuration
#
# User-level settings live in ~/.crew/crew.toml; a project can override any
# whole section in ./.crew/crew.toml. String values may reference environment
# variables as ${VAR}. CREW_LLM_BASE_URL and CREW_LLM_MODEL override [llm].

";

/// What [`initialize_at`] did with the configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Created(PathBuf),
    Overwritten(PathBuf),
    AlreadyExists(PathBuf),
}

impl InitOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Overwritten(p) | Self::AlreadyExists(p) => p,
        }
    }
}

/// The crew home directory (~/.crew)
pub fn get_crew_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR))
        .ok_or_else(|| CrewError::Config("Could not determine home directory".to_string()))
}

/// Initialize the user-level configuration, or the project-level one when
/// `project` is set.
pub fn initialize(project: bool, force: bool) -> Result<InitOutcome> {
    let dir = if project {
        PathBuf::from(".").join(CONFIG_DIR)
    } else {
        get_crew_home()?
    };
    initialize_at(&dir, force)
}

/// Write the default configuration into `dir`, creating it when missing.
/// An existing file is kept unless `force` is set.
pub fn initialize_at(dir: &Path, force: bool) -> Result<InitOutcome> {
    info!(path = %dir.display(), "Initializing crew");

    if !dir.exists() {
        fs::create_dir_all(dir)
            .map_err(|e| CrewError::Config(format!("Failed to create directory: {}", e)))?;
        info!(path = %dir.display(), "Created config directory");
    }

    let config_path = dir.join(CONFIG_FILE);
    let existed = config_path.exists();
    if existed && !force {
        warn!(
            path = %config_path.display(),
            "Configuration already exists (use --force to overwrite)"
        );
        return Ok(InitOutcome::AlreadyExists(config_path));
    }

    create_default_config(&config_path)?;
    info!(path = %config_path.display(), "Wrote default configuration");

    Ok(if existed {
        InitOutcome::Overwritten(config_path)
    } else {
        InitOutcome::Created(config_path)
    })
}

fn create_default_config(path: &Path) -> Result<()> {
    let content = format!("{}{}", HEADER, default_config_toml()?);
    fs::write(path, content)
        .map_err(|e| CrewError::Config(format!("Failed to write configuration: {}", e)))
}
