//! Task definitions
//!
//! A task is one unit of work planned from a project description and executed
//! by a single persona. Status only moves forward, except for the explicit
//! reset to `pending` used when a project is stopped.

use crate::error::{CrewError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Priority assigned when the planner gives none (1 = most urgent).
pub const DEFAULT_PRIORITY: u32 = 3;

/// Task status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be picked by the scheduler
    Pending,
    /// Currently executing in the worker
    InProgress,
    /// Finished; the result is final
    Completed,
    /// Reserved; never assigned by the worker
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        match s {
            "in_progress" | "in-progress" => Self::InProgress,
            "completed" => Self::Completed,
            "blocked" => Self::Blocked,
            _ => Self::Pending,
        }
    }
}

/// A timestamped line in a task's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNote {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Represents a task in the current project generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier (UUID string)
    pub id: String,

    /// What to do, as planned
    pub description: String,

    /// Persona that executes the task
    pub agent_id: String,

    /// 1 = highest priority
    pub priority: u32,

    /// Ids of tasks that must complete first
    pub dependencies: Vec<String>,

    pub status: TaskStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Append-only history
    pub notes: Vec<TaskNote>,

    /// Final text produced by execution
    pub result: Option<String>,

    /// Where the persisted artifact landed, if saved
    pub output: Option<PathBuf>,
}

impl Task {
    /// Create a new pending task with a generated UUID and default priority
    pub fn new(description: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), description, agent_id)
    }

    /// Create a task with a specific ID
    pub fn with_id(
        id: impl Into<String>,
        description: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            description: description.into(),
            agent_id: agent_id.into(),
            priority: DEFAULT_PRIORITY,
            dependencies: Vec::new(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            notes: Vec::new(),
            result: None,
            output: None,
        }
    }

    /// Set task priority; zero is clamped to 1
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority.max(1);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn add_note(&mut self, text: impl Into<String>) {
        let now = Utc::now();
        self.notes.push(TaskNote {
            timestamp: now,
            text: text.into(),
        });
        self.updated_at = now;
    }

    /// Reassign the persona (used only when repairing an unknown agent id)
    pub fn reassign(&mut self, agent_id: impl Into<String>) {
        self.agent_id = agent_id.into();
        self.updated_at = Utc::now();
    }

    /// Mark task as in progress
    pub fn mark_in_progress(&mut self) -> Result<()> {
        if self.status != TaskStatus::Pending {
            return Err(self.transition_error(TaskStatus::InProgress));
        }
        self.status = TaskStatus::InProgress;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark task as completed with its final result
    pub fn mark_completed(&mut self, result: impl Into<String>) -> Result<()> {
        if self.status == TaskStatus::Completed {
            return Err(self.transition_error(TaskStatus::Completed));
        }
        let now = Utc::now();
        self.status = TaskStatus::Completed;
        self.result = Some(result.into());
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Put an unfinished task back to pending. Returns false for completed tasks.
    pub fn reset_to_pending(&mut self) -> bool {
        if self.status == TaskStatus::Completed {
            return false;
        }
        self.status = TaskStatus::Pending;
        self.updated_at = Utc::now();
        true
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    fn transition_error(&self, to: TaskStatus) -> CrewError {
        CrewError::InvalidTransition {
            task_id: self.id.clone(),
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("Write the copy", "ContentWriter");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert!(task.dependencies.is_empty());
        assert!(task.completed_at.is_none());
        assert!(Uuid::parse_str(&task.id).is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Task::new("a", "x");
        let b = Task::new("a", "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_priority_clamped() {
        assert_eq!(Task::new("t", "a").with_priority(0).priority, 1);
        assert_eq!(Task::new("t", "a").with_priority(5).priority, 5);
    }

    #[test]
    fn test_lifecycle() {
        let mut task = Task::new("t", "a");
        task.mark_in_progress().unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);

        task.mark_completed("done").unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result.as_deref(), Some("done"));
        let completed_at = task.completed_at;
        assert!(completed_at.is_some());

        // completed is terminal
        assert!(task.mark_completed("again").is_err());
        assert!(task.mark_in_progress().is_err());
        assert!(!task.reset_to_pending());
        assert_eq!(task.completed_at, completed_at);
        assert_eq!(task.result.as_deref(), Some("done"));
    }

    #[test]
    fn test_reset_in_progress_to_pending() {
        let mut task = Task::new("t", "a");
        task.mark_in_progress().unwrap();
        assert!(task.reset_to_pending());
        assert!(task.is_pending());
    }

    #[test]
    fn test_notes_are_append_only_and_ordered() {
        let mut task = Task::new("t", "a");
        task.add_note("first");
        task.add_note("second");
        let texts: Vec<_> = task.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(task.notes[0].timestamp <= task.notes[1].timestamp);
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ] {
            assert_eq!(TaskStatus::from(status.as_str()), status);
        }
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
