//! Project decomposition.
//!
//! One model call turns a project description into tasks. A JSON array in
//! the reply is preferred; failing that, bullet lines are read as tasks;
//! failing that, the whole description becomes a single task for the
//! default persona.

use crate::executor::{is_sentinel, LlmProvider};
use crate::parser::{self, Outcome};
use crate::persona::PersonaRegistry;
use crate::prompt::PromptAssembler;
use crate::task::{Task, DEFAULT_PRIORITY};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•+]|\d+[.)])\s+(.+?)\s*$").unwrap());

static DECORATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]|\*\*|__").unwrap());

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[-–:]?\s*(?:assigned to|assign to|for|by|agent:?)\s*$").unwrap()
});

/// Turns a project description into an ordered task list
#[derive(Debug, Clone)]
pub struct ProjectPlanner {
    llm: LlmProvider,
    personas: Arc<PersonaRegistry>,
    prompts: PromptAssembler,
}

impl ProjectPlanner {
    pub fn new(llm: LlmProvider, personas: Arc<PersonaRegistry>, prompts: PromptAssembler) -> Self {
        Self {
            llm,
            personas,
            prompts,
        }
    }

    /// Ask the model for a plan. Never empty.
    pub async fn plan(&self, description: &str) -> Vec<Task> {
        let messages = self.prompts.planning_messages(description, &self.personas);
        let response = self.llm.generate("planner", &messages).await;
        self.tasks_from_response(description, &response)
    }

    /// Interpret a planning reply.
    pub fn tasks_from_response(&self, description: &str, response: &str) -> Vec<Task> {
        let mut tasks = if is_sentinel(response) {
            warn!("Planner received no model output");
            Vec::new()
        } else {
            let structured = match parser::parse(response, true) {
                Outcome::Structured { value } => self.from_structured(&value),
                _ => Vec::new(),
            };
            if structured.is_empty() {
                self.from_lines(response)
            } else {
                structured
            }
        };

        if tasks.is_empty() {
            info!("No tasks parsed from plan, using single fallback task");
            tasks.push(self.fallback(description));
        }

        tasks.sort_by_key(|t| t.priority);
        info!(tasks = tasks.len(), "Project planned");
        tasks
    }

    /// Tasks from a JSON array (or an object holding one under `tasks`).
    pub fn from_structured(&self, value: &Value) -> Vec<Task> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(map) => match map.get("tasks") {
                Some(Value::Array(items)) => items,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };

        // Position in the model's list (1-based) -> planned task, for
        // resolving numeric dependencies.
        let mut planned: Vec<(usize, Task, Vec<Value>)> = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let Some(obj) = item.as_object() else {
                debug!(index, "Skipping non-object plan entry");
                continue;
            };
            let description = obj
                .get("description")
                .or_else(|| obj.get("task"))
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();
            if description.is_empty() {
                debug!(index, "Skipping plan entry without description");
                continue;
            }

            let requested = obj
                .get("agent_id")
                .or_else(|| obj.get("agent"))
                .and_then(Value::as_str);
            let agent_id = self.resolve_agent(requested);
            let priority = obj
                .get("priority")
                .and_then(parse_priority)
                .unwrap_or(DEFAULT_PRIORITY);
            let raw_deps = match obj.get("dependencies") {
                Some(Value::Array(deps)) => deps.clone(),
                Some(Value::Null) | None => Vec::new(),
                Some(single) => vec![single.clone()],
            };

            let task = Task::new(description, agent_id).with_priority(priority);
            planned.push((index + 1, task, raw_deps));
        }

        let resolved: Vec<Vec<String>> = planned
            .iter()
            .map(|(_, task, raw)| {
                raw.iter()
                    .filter_map(|dep| self.resolve_dependency(dep, &planned, &task.id))
                    .collect()
            })
            .collect();

        planned
            .into_iter()
            .zip(resolved)
            .map(|((_, task, _), deps)| task.with_dependencies(deps))
            .collect()
    }

    fn resolve_dependency(
        &self,
        dep: &Value,
        planned: &[(usize, Task, Vec<Value>)],
        own_id: &str,
    ) -> Option<String> {
        let by_position = |n: u64| {
            planned
                .iter()
                .find(|(pos, _, _)| *pos as u64 == n)
                .map(|(_, t, _)| t.id.clone())
                .unwrap_or_else(|| format!("#{}", n))
        };

        let resolved = match dep {
            Value::Number(n) => by_position(n.as_u64().or_else(|| n.as_f64().map(|f| f as u64))?),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                if let Ok(n) = s.trim_start_matches('#').parse::<u64>() {
                    by_position(n)
                } else {
                    planned
                        .iter()
                        .find(|(_, t, _)| t.description.eq_ignore_ascii_case(s) || t.id == s)
                        .map(|(_, t, _)| t.id.clone())
                        .unwrap_or_else(|| s.to_string())
                }
            }
            _ => return None,
        };

        (resolved != own_id).then_some(resolved)
    }

    /// Tasks from bullet or numbered lines.
    pub fn from_lines(&self, text: &str) -> Vec<Task> {
        text.lines()
            .filter_map(|line| BULLET.captures(line))
            .filter_map(|caps| {
                let item = caps.get(1)?.as_str();
                let persona = self.personas.find_mentioned(item);
                let agent_id = persona
                    .map(|p| p.id.clone())
                    .unwrap_or_else(|| self.personas.default_id().to_string());
                let description = strip_decoration(item, persona.map(|p| p.id.as_str()));
                (!description.is_empty()).then(|| Task::new(description, agent_id))
            })
            .collect()
    }

    /// The single task used when nothing could be parsed.
    pub fn fallback(&self, description: &str) -> Task {
        Task::new(description.trim(), self.personas.default_id())
    }

    fn resolve_agent(&self, requested: Option<&str>) -> String {
        let persona = self.personas.resolve(requested);
        if let Some(requested) = requested {
            if !persona.id.eq_ignore_ascii_case(requested.trim()) {
                warn!(
                    requested = %requested,
                    assigned = %persona.id,
                    "Unknown agent in plan, using default persona"
                );
            }
        }
        persona.id.clone()
    }
}

fn parse_priority(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(1.0, u32::MAX as f64) as u32)
}

fn strip_decoration(item: &str, persona_id: Option<&str>) -> String {
    let mut text = DECORATION.replace_all(item, "").into_owned();

    if let Some(id) = persona_id {
        // "FrontendDev: build the nav" / "Build the nav - FrontendDev"
        let lower = text.to_ascii_lowercase();
        let id_lower = id.to_ascii_lowercase();
        if lower.trim_start().starts_with(&id_lower) {
            let start = lower.find(&id_lower).unwrap_or(0) + id.len();
            text = text[start..]
                .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '–'))
                .to_string();
        } else if lower.trim_end().ends_with(&id_lower) {
            let end = lower.rfind(&id_lower).unwrap_or(text.len());
            text = text[..end].to_string();
            text = ASSIGNMENT.replace(&text, "").into_owned();
        }
    }

    text.trim()
        .trim_end_matches(|c: char| matches!(c, ':' | '-' | '–' | ','))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RetryConfig;
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use llm::{ChatMessage, PromptFormat, TextGenerator};

    struct Silent;

    #[async_trait]
    impl TextGenerator for Silent {
        async fn generate(&self, _messages: &[ChatMessage]) -> llm::Result<String> {
            Ok(String::new())
        }

        fn model(&self) -> &str {
            "silent"
        }
    }

    fn planner() -> ProjectPlanner {
        let tools = Arc::new(ToolRegistry::with_defaults());
        ProjectPlanner::new(
            LlmProvider::new(Arc::new(Silent), RetryConfig::none()),
            Arc::new(PersonaRegistry::specialist()),
            PromptAssembler::new(PromptFormat::Plain, tools),
        )
    }

    #[test]
    fn test_json_plan_with_positional_dependencies() {
        let response = r#"[
            {"description": "Write the copy", "agent_id": "ContentWriter", "priority": 2},
            {"description": "Build the page", "agent_id": "frontenddev", "priority": "1", "dependencies": [1]},
            {"description": "", "agent_id": "QATester"},
            {"description": "Review everything", "agent_id": "Wizard", "dependencies": ["build the page", "ghost"]}
        ]"#;
        let tasks = planner().tasks_from_response("site", response);
        assert_eq!(tasks.len(), 3);

        // sorted by priority, stable
        assert_eq!(tasks[0].description, "Build the page");
        assert_eq!(tasks[0].agent_id, "FrontendDev");
        assert_eq!(tasks[1].description, "Write the copy");
        assert_eq!(tasks[2].description, "Review everything");
        assert_eq!(tasks[2].priority, DEFAULT_PRIORITY);
        assert_eq!(tasks[2].agent_id, "ContentWriter");

        assert_eq!(tasks[0].dependencies, vec![tasks[1].id.clone()]);
        assert_eq!(tasks[2].dependencies, vec![tasks[0].id.clone(), "ghost".to_string()]);
    }

    #[test]
    fn test_priority_parsing() {
        assert_eq!(parse_priority(&serde_json::json!(0)), Some(1));
        assert_eq!(parse_priority(&serde_json::json!(2.4)), Some(2));
        assert_eq!(parse_priority(&serde_json::json!(" 4 ")), Some(4));
        assert_eq!(parse_priority(&serde_json::json!("high")), None);
    }

    #[test]
    fn test_object_with_tasks_key() {
        let response = r#"{"tasks": [{"description": "Only task", "agent_id": "DataAnalyst"}]}"#;
        let tasks = planner().tasks_from_response("x", response);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].agent_id, "DataAnalyst");
    }

    #[test]
    fn test_line_heuristic() {
        let response = "Plan:\n\
            1. Design the hero section (FrontendDev)\n\
            2) BackendDev: set up the signup API\n\
            - **Write launch copy**\n\
            * Test the signup flow [QATester]\n\
            Thanks!";
        let tasks = planner().tasks_from_response("x", response);
        let got: Vec<_> = tasks
            .iter()
            .map(|t| (t.description.as_str(), t.agent_id.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Design the hero section", "FrontendDev"),
                ("set up the signup API", "BackendDev"),
                ("Write launch copy", "ContentWriter"),
                ("Test the signup flow", "QATester"),
            ]
        );
    }

    #[test]
    fn test_trailing_assignment_stripped() {
        assert_eq!(
            strip_decoration("Build the nav - assigned to FrontendDev", Some("FrontendDev")),
            "Build the nav"
        );
    }

    #[test]
    fn test_fallback_on_unparsable_reply() {
        let tasks = planner().tasks_from_response("Build a landing page", "Sure, sounds fun!");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Build a landing page");
        assert_eq!(tasks[0].agent_id, "ContentWriter");
        assert_eq!(tasks[0].priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn test_sentinel_reply_falls_back() {
        let sentinel = crate::executor::sentinel(
            3,
            &llm::LlmError::ServiceUnavailable("down".to_string()),
        );
        let tasks = planner().tasks_from_response("Build a landing page", &sentinel);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Build a landing page");
    }

    #[tokio::test]
    async fn test_plan_with_empty_reply() {
        let tasks = planner().plan("Write a haiku").await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Write a haiku");
    }
}
