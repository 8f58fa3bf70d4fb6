//! CLI command implementations
//!
//! Provides command handlers for the crew CLI binary.

pub mod config;
pub mod display;
pub mod models;
pub mod project;

pub use config::{get_init_instructions, is_initialized};
pub use project::RunOptions;
