//! The single task-execution loop.
//!
//! Each iteration asks the [`Scheduler`] for work when the internal queue is
//! empty, takes the next selection with a bounded wait raced against
//! shutdown, and runs it to completion:
//!
//! ```text
//! pending -> in_progress -> prompt -> model -> [tool -> model] -> completed -> save
//! ```
//!
//! Errors inside an iteration are logged and followed by a back-off; only a
//! shutdown request ends the loop. A panic while executing a task completes
//! that task with an error result and is handled like any other error.

use crate::error::{CrewError, Result};
use crate::events::{ActivityLog, ExecutionEvent};
use crate::executor::{LlmProvider, SENTINEL_PREFIX};
use crate::output::{detect_kind, extract_content, OutputStore};
use crate::parser::{self, Outcome};
use crate::persona::{AgentPersona, PersonaRegistry};
use crate::prompt::PromptAssembler;
use crate::scheduler::{Scheduler, Selection};
use crate::shutdown::ShutdownCoordinator;
use crate::store::SharedProject;
use crate::tools::ToolRegistry;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Timing and context limits for the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Bounded wait when taking the next selection
    pub poll_wait: Duration,
    /// Pause when nothing is runnable
    pub idle_sleep: Duration,
    /// Pause after an unexpected error
    pub error_backoff: Duration,
    /// Peer results included in each prompt
    pub peer_results: usize,
    /// Characters kept from each peer result
    pub peer_excerpt_chars: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_wait: Duration::from_secs(5),
            idle_sleep: Duration::from_millis(500),
            error_backoff: Duration::from_secs(5),
            peer_results: 3,
            peer_excerpt_chars: 200,
        }
    }
}

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Executed,
    Idle,
    Stopped,
}

/// Task-execution loop for one project generation
pub struct WorkerLoop {
    project: SharedProject,
    personas: Arc<PersonaRegistry>,
    tools: Arc<ToolRegistry>,
    llm: LlmProvider,
    prompts: PromptAssembler,
    outputs: Option<OutputStore>,
    activity: ActivityLog,
    shutdown: ShutdownCoordinator,
    config: WorkerConfig,
}

impl WorkerLoop {
    pub fn new(
        project: SharedProject,
        personas: Arc<PersonaRegistry>,
        tools: Arc<ToolRegistry>,
        llm: LlmProvider,
        prompts: PromptAssembler,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            project,
            personas,
            tools,
            llm,
            prompts,
            outputs: None,
            activity: ActivityLog::default(),
            shutdown,
            config: WorkerConfig::default(),
        }
    }

    pub fn with_outputs(mut self, outputs: Option<OutputStore>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_activity(mut self, activity: ActivityLog) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run on the tokio runtime until shutdown.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Loop until shutdown is requested.
    pub async fn run(self) {
        info!("Worker started");
        let (tx, mut rx) = mpsc::channel::<Selection>(1);

        while !self.shutdown.is_shutdown_requested() {
            match self.iteration(&tx, &mut rx).await {
                Ok(Step::Executed) => {}
                Ok(Step::Idle) => self.pause(self.config.idle_sleep).await,
                Ok(Step::Stopped) => break,
                Err(e) => {
                    error!(error = %e, "Worker iteration failed");
                    self.activity
                        .record("Worker", &ExecutionEvent::worker_error(e.to_string()));
                    self.pause(self.config.error_backoff).await;
                }
            }
        }

        info!("Worker stopped");
    }

    async fn iteration(
        &self,
        tx: &mpsc::Sender<Selection>,
        rx: &mut mpsc::Receiver<Selection>,
    ) -> Result<Step> {
        if rx.is_empty() {
            let selection = {
                let state = self.project.read();
                Scheduler::select(&state.store)
            };
            match selection {
                Some(selection) => tx
                    .try_send(selection)
                    .map_err(|e| CrewError::Worker(format!("cannot queue task: {}", e)))?,
                None => return Ok(Step::Idle),
            }
        }

        let received = tokio::select! {
            _ = self.shutdown.wait_for_shutdown() => return Ok(Step::Stopped),
            received = tokio::time::timeout(self.config.poll_wait, rx.recv()) => received,
        };

        match received {
            Ok(Some(selection)) => {
                let task_id = selection.task.id.clone();
                match AssertUnwindSafe(self.execute(selection)).catch_unwind().await {
                    Ok(executed) => executed?,
                    Err(payload) => self.recover_from_panic(&task_id, payload)?,
                }
                Ok(Step::Executed)
            }
            Ok(None) => Err(CrewError::Worker("task queue closed".to_string())),
            Err(_) => Ok(Step::Idle),
        }
    }

    /// Complete a task whose execution panicked with an error result, so the
    /// scheduler moves on, then report the panic as a worker error.
    fn recover_from_panic(&self, task_id: &str, payload: Box<dyn Any + Send>) -> Result<()> {
        let message = panic_message(payload.as_ref());
        {
            let mut state = self.project.write();
            state.store.update(task_id, |task| {
                if !task.is_completed() {
                    let _ = task.mark_completed(format!(
                        "{}: worker panicked: {}",
                        SENTINEL_PREFIX, message
                    ));
                }
                task.add_note(format!("Worker panicked: {}", message));
            })?;
            state.touch();
        }
        Err(CrewError::Worker(format!(
            "task {} panicked: {}",
            task_id, message
        )))
    }

    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown.wait_for_shutdown() => {}
        }
    }

    /// Execute one selected task to completion.
    async fn execute(&self, selection: Selection) -> Result<()> {
        let started = Instant::now();
        let task_id = selection.task.id.clone();

        // Claim the task and gather its context under one short write lock.
        let (persona, description, project_description, document_context, peers) = {
            let mut state = self.project.write();
            let personas = &self.personas;
            let persona_id = state.store.update(&task_id, |task| -> Result<String> {
                task.mark_in_progress()?;
                let persona_id = repair_persona(personas, task);
                task.add_note(format!("Started by {}", persona_id));
                if !selection.dependencies_met {
                    task.add_note("Proceeding without completed dependencies");
                }
                Ok(persona_id)
            })??;
            state.touch();

            let description = state
                .store
                .get(&task_id)
                .map(|t| t.description.clone())
                .unwrap_or_default();
            let peers = state.store.recent_peer_results(
                &persona_id,
                self.config.peer_results,
                self.config.peer_excerpt_chars,
            );
            (
                self.personas.resolve(Some(persona_id.as_str())),
                description,
                state.description.clone(),
                state.document_context.clone(),
                peers,
            )
        };

        if !selection.dependencies_met {
            let unmet = {
                let state = self.project.read();
                Scheduler::unmet_dependencies(&state.store, &selection.task)
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            };
            warn!(
                task_id = %task_id,
                unmet = ?unmet,
                "No eligible task, proceeding without dependency"
            );
        }
        info!(task_id = %task_id, agent_id = %persona.id, "Task started");
        self.activity.record(
            &persona.id,
            &ExecutionEvent::task_started(
                &task_id,
                &persona.id,
                &description,
                selection.dependencies_met,
            ),
        );

        let result = if let Some(expression) = parser::direct_calculation(&description) {
            self.direct_calculation(&task_id, persona, expression).await?
        } else {
            let messages = self.prompts.messages(
                persona,
                &description,
                &project_description,
                &document_context,
                &peers,
            );
            let first = self.llm.generate(&task_id, &messages).await;
            match parser::parse(&first, false) {
                Outcome::ToolCall { name, input } => {
                    self.tool_round_trip(&task_id, persona, &description, &name, &input)
                        .await?
                }
                Outcome::Structured { .. } | Outcome::PlainText { .. } => first,
            }
        };

        let progress = {
            let mut state = self.project.write();
            state.store.update(&task_id, |task| -> Result<()> {
                task.mark_completed(result.clone())?;
                task.add_note("Completed");
                Ok(())
            })??;
            state.touch();
            state.store.progress()
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            task_id = %task_id,
            agent_id = %persona.id,
            progress = progress,
            duration_ms = duration_ms,
            "Task completed"
        );
        self.activity.record(
            &persona.id,
            &ExecutionEvent::task_completed(&task_id, &persona.id, progress, duration_ms),
        );

        self.save_output(&task_id, persona, &description, &result).await;
        Ok(())
    }

    async fn direct_calculation(
        &self,
        task_id: &str,
        persona: &AgentPersona,
        expression: &str,
    ) -> Result<String> {
        debug!(task_id = %task_id, expression = %expression, "Direct calculation");
        let invocation = self.tools.invoke(persona, "calculator", expression).await;
        self.note_tool(task_id, persona, &invocation.tool, invocation.found)?;

        let output = &invocation.output;
        if let Some(value) = output.strip_prefix("Result: ") {
            return Ok(format!("The result of {} is {}", expression, value));
        }
        let reason = output
            .strip_prefix("Error in calculation: ")
            .unwrap_or(output);
        Ok(format!("Could not calculate {}: {}", expression, reason))
    }

    async fn tool_round_trip(
        &self,
        task_id: &str,
        persona: &AgentPersona,
        description: &str,
        name: &str,
        input: &str,
    ) -> Result<String> {
        let invocation = self.tools.invoke(persona, name, input).await;
        if invocation.found {
            debug!(task_id = %task_id, tool = %invocation.tool, "Tool invoked");
        } else {
            warn!(task_id = %task_id, tool = %name, "Model requested an unknown tool");
        }
        self.note_tool(task_id, persona, &invocation.tool, invocation.found)?;

        let followup =
            self.prompts
                .tool_followup_messages(description, &invocation.tool, &invocation.output);
        Ok(self.llm.generate(task_id, &followup).await)
    }

    fn note_tool(&self, task_id: &str, persona: &AgentPersona, tool: &str, found: bool) -> Result<()> {
        {
            let mut state = self.project.write();
            state.store.update(task_id, |task| {
                if found {
                    task.add_note(format!("Used tool '{}'", tool));
                } else {
                    task.add_note(format!("Requested unknown tool '{}'", tool));
                }
            })?;
            state.touch();
        }
        self.activity
            .record(&persona.id, &ExecutionEvent::tool_invoked(task_id, tool, found));
        Ok(())
    }

    async fn save_output(&self, task_id: &str, persona: &AgentPersona, description: &str, result: &str) {
        let Some(outputs) = &self.outputs else {
            return;
        };

        let kind = detect_kind(description, result);
        let content = extract_content(result, kind);
        match outputs.save(&persona.id, description, &content, kind).await {
            Ok(saved) => {
                let path = saved.path.display().to_string();
                {
                    let mut state = self.project.write();
                    let recorded = state.store.update(task_id, |task| {
                        task.output = Some(saved.path.clone());
                        task.add_note(format!("Output saved to {}", path));
                    });
                    if let Err(e) = recorded {
                        warn!(task_id = %task_id, error = %e, "Could not record output path");
                    }
                    state.touch();
                }
                self.activity
                    .record(&persona.id, &ExecutionEvent::output_saved(task_id, &path));
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Failed to save output");
                self.activity
                    .log(&persona.id, format!("Failed to save output: {}", e));
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Point the task at a known persona, falling back to the default.
fn repair_persona(personas: &PersonaRegistry, task: &mut crate::task::Task) -> String {
    match personas.find(&task.agent_id) {
        Some(persona) => {
            if persona.id != task.agent_id {
                task.reassign(persona.id.clone());
            }
            persona.id.clone()
        }
        None => {
            let default = personas.default_id().to_string();
            warn!(
                task_id = %task.id,
                agent_id = %task.agent_id,
                assigned = %default,
                "Unknown agent, using default persona"
            );
            task.add_note(format!(
                "Unknown agent '{}', reassigned to {}",
                task.agent_id, default
            ));
            task.reassign(default.clone());
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn test_repair_unknown_persona() {
        let registry = PersonaRegistry::specialist();
        let mut task = Task::new("t", "Wizard");
        assert_eq!(repair_persona(&registry, &mut task), "ContentWriter");
        assert_eq!(task.agent_id, "ContentWriter");
        assert!(task.notes[0].text.contains("Unknown agent 'Wizard'"));
    }

    #[test]
    fn test_repair_canonicalizes_case() {
        let registry = PersonaRegistry::specialist();
        let mut task = Task::new("t", "qatester");
        assert_eq!(repair_persona(&registry, &mut task), "QATester");
        assert_eq!(task.agent_id, "QATester");
        assert!(task.notes.is_empty());
    }

    #[test]
    fn test_panic_message_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(literal.as_ref()), "boom");
        let owned: Box<dyn Any + Send> = Box::new(format!("index {}", 3));
        assert_eq!(panic_message(owned.as_ref()), "index 3");
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[test]
    fn test_repair_empty_agent() {
        let registry = PersonaRegistry::versatile();
        let mut task = Task::new("t", "");
        assert_eq!(repair_persona(&registry, &mut task), "Agent1");
    }
}
