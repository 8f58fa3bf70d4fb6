//! crew CLI - multi-agent task orchestrator for a local LLM server
//!
//! Main entry point for the crew command-line tool.

use clap::{Parser, Subcommand};
use crew::cli::RunOptions;
use crew::config::LoggingConfig;
use crew::{version_info, Roster};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crew")]
#[command(about = "crew - multi-agent task orchestrator for a local LLM server", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Model to use instead of the configured one
    #[arg(long, global = true)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Write ./.crew/crew.toml instead of ~/.crew/crew.toml
        #[arg(long)]
        project: bool,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show version information
    Version,

    /// Check the LLM server, model, configuration and output directory
    Health {
        /// Output format: text (default), json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show configuration sources and effective values
    Config,

    /// List models installed on the LLM server
    Models {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Download a model to the LLM server
    Pull {
        /// Model name, e.g. llama2:13b
        model: String,
    },

    /// Plan a project without executing it
    Plan {
        /// Project description
        description: String,
        /// Persona roster: specialist, versatile
        #[arg(short, long)]
        roster: Option<Roster>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Plan and execute a project
    Run {
        /// Project description
        description: String,
        /// Text or markdown file included as context in every prompt
        #[arg(short, long)]
        document: Option<PathBuf>,
        /// Persona roster: specialist, versatile
        #[arg(short, long)]
        roster: Option<Roster>,
        /// Print the final project status as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,crew={level},llm={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(logging.colored)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ if !logging.timestamps => builder.compact().without_time().init(),
        _ => builder.compact().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `init --force` must work even when the existing file does not parse.
    let mut config = match crew::cli::config::load().await {
        Ok(config) => config,
        Err(e) if matches!(cli.command, Some(Commands::Init { .. })) => {
            eprintln!("Ignoring unreadable configuration: {}", e);
            crew::CrewConfig::default()
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    init_tracing(&config.logging, cli.verbose);
    debug!(version = %version_info(), "crew starting");

    match cli.command {
        Some(Commands::Init { project, force }) => {
            crew::cli::config::handle_init(project, force)?;
        }
        Some(Commands::Version) => {
            println!("{}", version_info());
        }
        Some(Commands::Health { format }) => {
            if !crew::cli::is_initialized() {
                eprintln!("{}", crew::cli::get_init_instructions());
            }
            crew::cli::models::handle_health(&config, &format).await?;
        }
        Some(Commands::Config) => {
            crew::cli::config::handle_show(&config)?;
        }
        Some(Commands::Models { json }) => {
            crew::cli::models::handle_models(&config, json).await?;
        }
        Some(Commands::Pull { model }) => {
            crew::cli::models::handle_pull(&config, &model).await?;
        }
        Some(Commands::Plan {
            description,
            roster,
            json,
        }) => {
            crew::cli::project::handle_plan(config, description, roster, json).await?;
        }
        Some(Commands::Run {
            description,
            document,
            roster,
            json,
        }) => {
            let options = RunOptions {
                description,
                document,
                roster,
                json,
            };
            crew::cli::project::handle_run(config, options).await?;
        }
        None => {
            println!("{}", version_info());
            println!("\nUse --help to see available commands");
        }
    }

    Ok(())
}
