//! In-memory task storage for one project generation.
//!
//! [`TaskStore`] keeps tasks in plan order with an id index. [`ProjectState`]
//! wraps it with the project-level metadata, and is shared between the worker
//! and status readers as [`SharedProject`]. Readers only ever receive owned
//! snapshots.

use crate::error::{CrewError, Result};
use crate::task::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Insertion-ordered collection of tasks keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

/// Per-status totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
}

/// A completed task's result as seen by another persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerResult {
    pub agent_id: String,
    pub description: String,
    pub excerpt: String,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task. Ids must be unique within the store.
    pub fn insert(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(&task.id) {
            return Err(CrewError::DuplicateTask(task.id));
        }
        self.index.insert(task.id.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    pub fn insert_all(&mut self, tasks: impl IntoIterator<Item = Task>) -> Result<()> {
        for task in tasks {
            self.insert(task)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Tasks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Owned copies of every task, in insertion order.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Apply `f` to the task with this id.
    pub fn update<R>(&mut self, id: &str, f: impl FnOnce(&mut Task) -> R) -> Result<R> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| CrewError::TaskNotFound(id.to_string()))?;
        Ok(f(&mut self.tasks[idx]))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts {
            total: self.tasks.len(),
            ..Default::default()
        };
        for task in &self.tasks {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Blocked => counts.blocked += 1,
            }
        }
        counts
    }

    /// `round(100 * completed / total)`, 0 for an empty store.
    pub fn progress(&self) -> u8 {
        let counts = self.counts();
        if counts.total == 0 {
            return 0;
        }
        ((counts.completed as f64 * 100.0) / counts.total as f64).round() as u8
    }

    /// Most recently completed results from personas other than `agent_id`,
    /// newest first, each result cut to `excerpt_chars` characters.
    pub fn recent_peer_results(
        &self,
        agent_id: &str,
        limit: usize,
        excerpt_chars: usize,
    ) -> Vec<PeerResult> {
        let mut done: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.is_completed() && t.agent_id != agent_id)
            .collect();
        // Stable sort keeps plan order for equal timestamps.
        done.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        done.into_iter()
            .take(limit)
            .map(|t| PeerResult {
                agent_id: t.agent_id.clone(),
                description: t.description.clone(),
                excerpt: t
                    .result
                    .as_deref()
                    .unwrap_or_default()
                    .chars()
                    .take(excerpt_chars)
                    .collect(),
            })
            .collect()
    }

    /// Put every in-progress task back to pending. Returns how many moved.
    pub fn reset_in_progress(&mut self) -> usize {
        let mut reset = 0;
        for task in self
            .tasks
            .iter_mut()
            .filter(|t| t.status == TaskStatus::InProgress)
        {
            if task.reset_to_pending() {
                task.add_note("Reset to pending after stop");
                reset += 1;
            }
        }
        reset
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.index.clear();
    }
}

/// Mutable project state owned by the orchestrator and written by the worker.
#[derive(Debug, Clone)]
pub struct ProjectState {
    pub description: String,
    pub document_context: String,
    pub store: TaskStore,
    pub start_time: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
    pub running: bool,
}

/// Shared handle; never hold the lock across an `.await`.
pub type SharedProject = Arc<RwLock<ProjectState>>;

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            description: String::new(),
            document_context: String::new(),
            store: TaskStore::new(),
            start_time: None,
            last_update: Utc::now(),
            running: false,
        }
    }
}

impl ProjectState {
    pub fn shared() -> SharedProject {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn touch(&mut self) {
        self.last_update = Utc::now();
    }

    /// Owned, consistent view of the project.
    pub fn status(&self) -> ProjectStatus {
        ProjectStatus {
            description: self.description.clone(),
            tasks: self.store.snapshot(),
            progress: self.store.progress(),
            counts: self.store.counts(),
            start_time: self.start_time,
            last_update: self.last_update,
            running: self.running,
        }
    }
}

/// Snapshot of the project returned to status readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub description: String,
    pub tasks: Vec<Task>,
    pub progress: u8,
    pub counts: StatusCounts,
    pub start_time: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
    pub running: bool,
}

impl ProjectStatus {
    /// True when there is at least one task and all are completed.
    pub fn is_finished(&self) -> bool {
        self.counts.total > 0 && self.counts.completed == self.counts.total
    }
}
