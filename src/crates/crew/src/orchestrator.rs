//! Project lifecycle.
//!
//! The [`Orchestrator`] owns the shared project state and at most one worker
//! per project generation. Starting a project stops and joins the previous
//! worker before the task list is replaced.

use crate::config::CrewConfig;
use crate::document;
use crate::error::Result;
use crate::events::{ActivityLog, ExecutionEvent};
use crate::executor::LlmProvider;
use crate::output::OutputStore;
use crate::persona::PersonaRegistry;
use crate::planner::ProjectPlanner;
use crate::prompt::PromptAssembler;
use crate::shutdown::ShutdownCoordinator;
use crate::store::{ProjectState, ProjectStatus, SharedProject};
use crate::task::Task;
use crate::tools::ToolRegistry;
use crate::worker::{WorkerConfig, WorkerLoop};
use chrono::Utc;
use llm::PromptFormat;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const SOURCE: &str = "Coordinator";

/// Worker of one project generation
struct Generation {
    shutdown: ShutdownCoordinator,
    handle: JoinHandle<()>,
}

/// Plans projects and drives the worker
pub struct Orchestrator {
    project: SharedProject,
    personas: Arc<PersonaRegistry>,
    tools: Arc<ToolRegistry>,
    llm: LlmProvider,
    prompts: PromptAssembler,
    outputs: Option<OutputStore>,
    activity: ActivityLog,
    worker_config: WorkerConfig,
    document_max_chars: usize,
    generation: Option<Generation>,
}

impl Orchestrator {
    pub fn builder(llm: LlmProvider) -> OrchestratorBuilder {
        OrchestratorBuilder::new(llm)
    }

    /// Ollama-backed orchestrator from configuration
    pub fn from_config(config: &CrewConfig) -> Result<Self> {
        let llm = LlmProvider::from_config(config)?;
        Ok(Self::builder(llm)
            .personas(PersonaRegistry::from_roster(config.agents.roster))
            .prompt_format(config.llm.prompt_format)
            .outputs(config.output_dir().map(OutputStore::new))
            .worker_config(config.worker_config())
            .document_max_chars(config.document.max_chars)
            .build())
    }

    pub fn planner(&self) -> ProjectPlanner {
        ProjectPlanner::new(
            self.llm.clone(),
            Arc::clone(&self.personas),
            self.prompts.clone(),
        )
    }

    /// Plan `description` and start a worker on the resulting tasks.
    ///
    /// A running project is stopped and its worker joined first. The
    /// document, when given, is read and truncated before planning.
    pub async fn start_project(
        &mut self,
        description: &str,
        document_path: Option<&Path>,
    ) -> Result<Vec<Task>> {
        self.stop();
        self.join().await;

        let document_context = match document_path {
            Some(path) => document::load(path, self.document_max_chars).await?,
            None => String::new(),
        };

        self.activity
            .log(SOURCE, format!("Planning project: {}", description));
        let tasks = self.planner().plan(description).await;

        {
            let mut state = self.project.write();
            state.store.clear();
            state.store.insert_all(tasks.iter().cloned())?;
            state.description = description.to_string();
            state.document_context = document_context;
            state.start_time = Some(Utc::now());
            state.running = true;
            state.touch();
        }
        info!(task_count = tasks.len(), "Project planned");
        self.activity
            .record(SOURCE, &ExecutionEvent::project_planned(tasks.len()));

        let shutdown = ShutdownCoordinator::new();
        let handle = WorkerLoop::new(
            Arc::clone(&self.project),
            Arc::clone(&self.personas),
            Arc::clone(&self.tools),
            self.llm.clone(),
            self.prompts.clone(),
            shutdown.clone(),
        )
        .with_outputs(self.outputs.clone())
        .with_activity(self.activity.clone())
        .with_config(self.worker_config.clone())
        .spawn();
        self.generation = Some(Generation { shutdown, handle });

        Ok(tasks)
    }

    /// Request the worker to stop and put in-progress tasks back to pending.
    /// Returns how many tasks were reset. A task already executing finishes.
    pub fn stop(&mut self) -> usize {
        let Some(generation) = &self.generation else {
            return 0;
        };
        generation.shutdown.request_shutdown();

        let reset = {
            let mut state = self.project.write();
            if !state.running {
                return 0;
            }
            let reset = state.store.reset_in_progress();
            state.running = false;
            state.touch();
            reset
        };
        info!(reset_tasks = reset, "Project stopped");
        self.activity
            .record(SOURCE, &ExecutionEvent::project_stopped(reset));
        reset
    }

    /// Wait for the current worker to exit.
    pub async fn join(&mut self) {
        if let Some(generation) = self.generation.take() {
            generation.shutdown.request_shutdown();
            if let Err(e) = generation.handle.await {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
    }

    /// Stop, join and drop every task of the current generation.
    pub async fn clear(&mut self) {
        self.stop();
        self.join().await;
        {
            let mut state = self.project.write();
            *state = ProjectState::default();
        }
        self.activity.log(SOURCE, "Project cleared");
    }

    pub fn status(&self) -> ProjectStatus {
        self.project.read().status()
    }

    pub fn is_running(&self) -> bool {
        self.project.read().running
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn project(&self) -> SharedProject {
        Arc::clone(&self.project)
    }

    /// Cancellation handle of the running generation, for signal wiring.
    pub fn shutdown_handle(&self) -> Option<ShutdownCoordinator> {
        self.generation.as_ref().map(|g| g.shutdown.clone())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Some(generation) = &self.generation {
            generation.shutdown.request_shutdown();
        }
    }
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    llm: LlmProvider,
    personas: PersonaRegistry,
    tools: ToolRegistry,
    prompt_format: PromptFormat,
    outputs: Option<OutputStore>,
    activity: ActivityLog,
    worker_config: WorkerConfig,
    document_max_chars: usize,
}

impl OrchestratorBuilder {
    pub fn new(llm: LlmProvider) -> Self {
        Self {
            llm,
            personas: PersonaRegistry::specialist(),
            tools: ToolRegistry::with_defaults(),
            prompt_format: PromptFormat::default(),
            outputs: None,
            activity: ActivityLog::default(),
            worker_config: WorkerConfig::default(),
            document_max_chars: document::DEFAULT_MAX_CHARS,
        }
    }

    pub fn personas(mut self, personas: PersonaRegistry) -> Self {
        self.personas = personas;
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn prompt_format(mut self, format: PromptFormat) -> Self {
        self.prompt_format = format;
        self
    }

    pub fn outputs(mut self, outputs: Option<OutputStore>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn activity(mut self, activity: ActivityLog) -> Self {
        self.activity = activity;
        self
    }

    pub fn worker_config(mut self, config: WorkerConfig) -> Self {
        self.worker_config = config;
        self
    }

    pub fn document_max_chars(mut self, max_chars: usize) -> Self {
        self.document_max_chars = max_chars;
        self
    }

    pub fn build(self) -> Orchestrator {
        let tools = Arc::new(self.tools);
        Orchestrator {
            project: ProjectState::shared(),
            personas: Arc::new(self.personas),
            prompts: PromptAssembler::new(self.prompt_format, Arc::clone(&tools)),
            tools,
            llm: self.llm,
            outputs: self.outputs,
            activity: self.activity,
            worker_config: self.worker_config,
            document_max_chars: self.document_max_chars,
            generation: None,
        }
    }
}
