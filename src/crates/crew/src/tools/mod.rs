//! Tools a persona can invoke through an `ACTION:` / `INPUT:` reply.
//!
//! Every persona gets the default set; persona-specific extras are listed on
//! [`AgentPersona::tools`](crate::persona::AgentPersona). Lookup ignores case.

mod builtin;
pub mod calculator;

pub use builtin::{
    CalculatorTool, JsonValidateTool, SearchTool, SummarizeTool, WeatherTool, WordCountTool,
};

use crate::persona::AgentPersona;
use async_trait::async_trait;
use std::sync::Arc;

/// Names every persona can use.
pub const DEFAULT_TOOLS: &[&str] = &["search", "weather", "calculator", "summarize"];

/// A named tool taking and returning text. Failures are reported in the
/// returned text, never as errors.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn run(&self, input: &str) -> String;
}

/// Result of dispatching one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Canonical tool name, or the requested name when not found
    pub tool: String,
    pub output: String,
    pub found: bool,
}

/// Registry of every known tool.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default tools plus the built-in extras.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchTool));
        registry.register(Arc::new(WeatherTool));
        registry.register(Arc::new(CalculatorTool));
        registry.register(Arc::new(SummarizeTool));
        registry.register(Arc::new(WordCountTool));
        registry.register(Arc::new(JsonValidateTool));
        registry
    }

    /// Add a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools
            .retain(|t| !t.name().eq_ignore_ascii_case(tool.name()));
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        let name = name.trim();
        self.tools.iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Tools visible to `persona`: defaults first, then its extras, skipping
    /// names that are not registered.
    pub fn available_for(&self, persona: &AgentPersona) -> Vec<&Arc<dyn Tool>> {
        let mut available: Vec<&Arc<dyn Tool>> = Vec::new();
        let wanted = DEFAULT_TOOLS
            .iter()
            .copied()
            .chain(persona.tools.iter().map(String::as_str));
        for name in wanted {
            if let Some(tool) = self.get(name) {
                if !available.iter().any(|t| t.name() == tool.name()) {
                    available.push(tool);
                }
            }
        }
        available
    }

    /// Human-readable tool list for prompts.
    pub fn describe_for(&self, persona: &AgentPersona) -> String {
        self.available_for(persona)
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run `name` on behalf of `persona`. Unknown names yield a descriptive
    /// error string listing what is available.
    pub async fn invoke(&self, persona: &AgentPersona, name: &str, input: &str) -> ToolInvocation {
        let available = self.available_for(persona);
        let name = name.trim();
        match available.iter().find(|t| t.name().eq_ignore_ascii_case(name)) {
            Some(tool) => ToolInvocation {
                tool: tool.name().to_string(),
                output: tool.run(input).await,
                found: true,
            },
            None => {
                let names: Vec<&str> = available.iter().map(|t| t.name()).collect();
                ToolInvocation {
                    tool: name.to_string(),
                    output: format!(
                        "Error: Tool '{}' not found. Available tools: {}",
                        name,
                        names.join(", ")
                    ),
                    found: false,
                }
            }
        }
    }
}
