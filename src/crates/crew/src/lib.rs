//! # crew - Multi-agent task orchestrator
//!
//! crew turns a project description into a list of tasks, assigns each task
//! to an agent persona and runs the tasks one at a time against a locally
//! hosted LLM server (Ollama-compatible HTTP API).
//!
//! ## Features
//!
//! - **Planning** - JSON-first decomposition with a line-heuristic fallback
//! - **Scheduling** - priority and dependency ordering with a liveness fallback
//! - **Personas** - specialist or versatile rosters, selectable by config
//! - **Tools** - `ACTION:` / `INPUT:` round trip to deterministic tools
//! - **Outputs** - results saved as html/css/js/json/text files per persona
//! - **Dual-Location Config** - user-level and project-level configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crew::{load_config, Orchestrator};
//!
//! # async fn example() -> crew::Result<()> {
//! let config = load_config().await?;
//! let mut orchestrator = Orchestrator::from_config(&config)?;
//!
//! let tasks = orchestrator
//!     .start_project("Build a landing page for a bakery", None)
//!     .await?;
//! println!("planned {} tasks", tasks.len());
//!
//! // ... poll orchestrator.status() until it is finished
//! orchestrator.stop();
//! orchestrator.join().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! One [`Orchestrator`] owns the shared project state and one
//! [`WorkerLoop`] per project generation. The worker asks the
//! [`Scheduler`] for the next task, builds a prompt with the
//! [`PromptAssembler`], calls the model through [`LlmProvider`], classifies
//! the reply with [`parser::parse`] and, for tool calls, makes one follow-up
//! call with the tool's result.

// Core modules
pub mod cli;
pub mod config;
pub mod document;
pub mod events;
pub mod health;
pub mod init;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod persona;
pub mod planner;
pub mod prompt;
pub mod scheduler;
pub mod shutdown;
pub mod store;
pub mod task;
pub mod tools;
pub mod version;
pub mod worker;

// Executor module
pub mod executor;

// Error types and utilities
mod error;

// Re-export key types for convenience
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use planner::ProjectPlanner;
pub use worker::{WorkerConfig, WorkerLoop};
pub use scheduler::{Scheduler, Selection};
pub use task::{Task, TaskNote, TaskStatus};
pub use store::{ProjectState, ProjectStatus, SharedProject, StatusCounts, TaskStore};
pub use persona::{AgentPersona, PersonaRegistry, Roster};
pub use tools::{Tool, ToolInvocation, ToolRegistry};
pub use parser::Outcome;
pub use prompt::PromptAssembler;
pub use executor::{LlmProvider, RetryConfig};
pub use output::{ContentKind, OutputStore, SavedOutput};
pub use shutdown::ShutdownCoordinator;

// Error types
pub use error::{CrewError, Result};

// Re-export version utilities
pub use version::{full_version as version_info, VersionInfo};

// Re-export config types
pub use config::{load_config, ConfigLoader, CrewConfig};

// Re-export health types
pub use health::{ComponentHealth, HealthChecker, HealthReport, HealthStatus};

// Re-export event types
pub use events::{ActivityLog, ExecutionEvent, LogEntry};
