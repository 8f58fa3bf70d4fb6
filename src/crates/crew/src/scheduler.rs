//! Priority + dependency task selection.
//!
//! Among pending tasks whose dependencies are all completed, the smallest
//! priority number wins, ties broken by plan order. When every pending task
//! is waiting on something, the smallest-priority pending task is returned
//! anyway so the single worker never stalls; the selection carries
//! `dependencies_met = false` so the caller can log it.

use crate::store::TaskStore;
use crate::task::Task;

/// A scheduling decision.
#[derive(Debug, Clone)]
pub struct Selection {
    pub task: Task,
    pub dependencies_met: bool,
}

/// Stateless selector over a [`TaskStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Scheduler;

impl Scheduler {
    /// Pick the next pending task. `None` only when nothing is pending.
    pub fn select(store: &TaskStore) -> Option<Selection> {
        let eligible = store
            .iter()
            .filter(|t| t.is_pending() && Self::is_eligible(store, t))
            .min_by_key(|t| t.priority);

        if let Some(task) = eligible {
            return Some(Selection {
                task: task.clone(),
                dependencies_met: true,
            });
        }

        store
            .iter()
            .filter(|t| t.is_pending())
            .min_by_key(|t| t.priority)
            .map(|task| Selection {
                task: task.clone(),
                dependencies_met: false,
            })
    }

    /// The task part of [`Scheduler::select`].
    pub fn next_runnable(store: &TaskStore) -> Option<Task> {
        Self::select(store).map(|s| s.task)
    }

    /// Every dependency id resolves to a completed task. Dangling ids never do.
    pub fn is_eligible(store: &TaskStore, task: &Task) -> bool {
        task.dependencies
            .iter()
            .all(|dep| store.get(dep).is_some_and(|d| d.is_completed()))
    }

    /// Dependency ids that are not yet satisfied.
    pub fn unmet_dependencies<'a>(store: &TaskStore, task: &'a Task) -> Vec<&'a str> {
        task.dependencies
            .iter()
            .filter(|dep| !store.get(dep).is_some_and(|d| d.is_completed()))
            .map(String::as_str)
            .collect()
    }
}
