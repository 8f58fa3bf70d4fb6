//! Configuration helpers for the CLI

use crate::config::{render_config, ConfigLoader, CrewConfig};
use crate::error::Result;
use crate::init;
use colored::Colorize;
use tracing::info;

/// Load configuration from the user and project files
pub async fn load() -> Result<CrewConfig> {
    info!("Loading configuration");
    ConfigLoader::new().load().await
}

/// Whether a user-level configuration file exists
pub fn is_initialized() -> bool {
    ConfigLoader::new().user_config_exists()
}

pub fn get_init_instructions() -> String {
    "No configuration file found; using defaults. Run 'crew init' to create one.".to_string()
}

/// Handle `crew config`: show where configuration comes from and the
/// effective values.
pub fn handle_show(config: &CrewConfig) -> Result<()> {
    let loader = ConfigLoader::new();

    println!("{}", "Configuration sources".bold());
    match loader.get_user_config_path() {
        Some(path) => println!("  user:    {} {}", path.display(), presence(loader.user_config_exists())),
        None => println!("  user:    {}", "(no home directory)".dimmed()),
    }
    println!(
        "  project: {} {}",
        loader.get_project_config_path().display(),
        presence(loader.project_config_exists())
    );
    println!();
    println!("{}", "Effective configuration".bold());
    println!("{}", render_config(config)?);
    Ok(())
}

fn presence(exists: bool) -> String {
    if exists {
        "✓".green().to_string()
    } else {
        "(not found)".dimmed().to_string()
    }
}

/// Handle `crew init`
pub fn handle_init(project: bool, force: bool) -> Result<()> {
    let outcome = init::initialize(project, force)?;
    match outcome {
        init::InitOutcome::Created(path) => {
            println!("{}", "✓ crew initialized".green().bold());
            println!("  Configuration: {}", path.display());
        }
        init::InitOutcome::Overwritten(path) => {
            println!("{}", "✓ Configuration reset to defaults".green().bold());
            println!("  Configuration: {}", path.display());
        }
        init::InitOutcome::AlreadyExists(path) => {
            println!("{}", "Configuration already exists".yellow());
            println!("  {} (use --force to overwrite)", path.display());
        }
    }
    Ok(())
}
