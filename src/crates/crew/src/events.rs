//! Execution events and the activity log
//!
//! [`ExecutionEvent`] describes what the worker and orchestrator did.
//! [`ActivityLog`] keeps the most recent human-readable lines for status
//! displays and mirrors every line to `tracing`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::info;

/// Entries kept by [`ActivityLog::default`]
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Event types for execution tracking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A project description was decomposed into tasks
    ProjectPlanned {
        task_count: usize,
        timestamp: i64,
    },
    /// A task moved to in_progress
    TaskStarted {
        task_id: String,
        agent_id: String,
        description: String,
        dependencies_met: bool,
        timestamp: i64,
    },
    /// A tool ran during a task
    ToolInvoked {
        task_id: String,
        tool: String,
        found: bool,
        timestamp: i64,
    },
    /// A task moved to completed
    TaskCompleted {
        task_id: String,
        agent_id: String,
        progress: u8,
        timestamp: i64,
        duration_ms: u64,
    },
    /// A result was written to disk
    OutputSaved {
        task_id: String,
        path: String,
        timestamp: i64,
    },
    /// The worker caught an unexpected error and is backing off
    WorkerError {
        error: String,
        timestamp: i64,
    },
    /// The project was stopped
    ProjectStopped {
        reset_tasks: usize,
        timestamp: i64,
    },
}

impl ExecutionEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> i64 {
        match self {
            ExecutionEvent::ProjectPlanned { timestamp, .. }
            | ExecutionEvent::TaskStarted { timestamp, .. }
            | ExecutionEvent::ToolInvoked { timestamp, .. }
            | ExecutionEvent::TaskCompleted { timestamp, .. }
            | ExecutionEvent::OutputSaved { timestamp, .. }
            | ExecutionEvent::WorkerError { timestamp, .. }
            | ExecutionEvent::ProjectStopped { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ExecutionEvent::ProjectPlanned { task_count, .. } => {
                format!("Project planned into {} task(s)", task_count)
            }
            ExecutionEvent::TaskStarted {
                agent_id,
                description,
                dependencies_met,
                ..
            } => {
                if *dependencies_met {
                    format!("{} started: {}", agent_id, description)
                } else {
                    format!(
                        "{} started: {} (proceeding without dependency)",
                        agent_id, description
                    )
                }
            }
            ExecutionEvent::ToolInvoked { tool, found, .. } => {
                if *found {
                    format!("Used tool '{}'", tool)
                } else {
                    format!("Requested unknown tool '{}'", tool)
                }
            }
            ExecutionEvent::TaskCompleted {
                agent_id,
                progress,
                duration_ms,
                ..
            } => {
                format!(
                    "{} completed a task in {}ms (project {}% complete)",
                    agent_id, duration_ms, progress
                )
            }
            ExecutionEvent::OutputSaved { path, .. } => format!("Saved output to {}", path),
            ExecutionEvent::WorkerError { error, .. } => format!("Worker error: {}", error),
            ExecutionEvent::ProjectStopped { reset_tasks, .. } => {
                format!("Project stopped ({} task(s) reset to pending)", reset_tasks)
            }
        }
    }

    pub fn project_planned(task_count: usize) -> Self {
        ExecutionEvent::ProjectPlanned {
            task_count,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn task_started(
        task_id: impl Into<String>,
        agent_id: impl Into<String>,
        description: impl Into<String>,
        dependencies_met: bool,
    ) -> Self {
        ExecutionEvent::TaskStarted {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            description: description.into(),
            dependencies_met,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn tool_invoked(task_id: impl Into<String>, tool: impl Into<String>, found: bool) -> Self {
        ExecutionEvent::ToolInvoked {
            task_id: task_id.into(),
            tool: tool.into(),
            found,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn task_completed(
        task_id: impl Into<String>,
        agent_id: impl Into<String>,
        progress: u8,
        duration_ms: u64,
    ) -> Self {
        ExecutionEvent::TaskCompleted {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            progress,
            timestamp: Utc::now().timestamp(),
            duration_ms,
        }
    }

    pub fn output_saved(task_id: impl Into<String>, path: impl Into<String>) -> Self {
        ExecutionEvent::OutputSaved {
            task_id: task_id.into(),
            path: path.into(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn worker_error(error: impl Into<String>) -> Self {
        ExecutionEvent::WorkerError {
            error: error.into(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn project_stopped(reset_tasks: usize) -> Self {
        ExecutionEvent::ProjectStopped {
            reset_tasks,
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// One line of the activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub message: String,
}

/// Bounded, shared activity log. Oldest entries are dropped first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    pub fn log(&self, source: &str, message: impl Into<String>) {
        let message = message.into();
        info!(source = %source, "{}", message);

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            timestamp: Utc::now(),
            source: source.to_string(),
            message,
        });
    }

    pub fn record(&self, source: &str, event: &ExecutionEvent) {
        self.log(source, event.description());
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
