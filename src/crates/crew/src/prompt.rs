//! Prompt assembly.
//!
//! Prompts are built as role-tagged messages. The LLM client flattens them
//! with the configured [`PromptFormat`]; [`PromptAssembler::build`] performs
//! the same flattening locally so callers can inspect the exact text.

use crate::persona::{AgentPersona, PersonaRegistry};
use crate::store::PeerResult;
use crate::tools::ToolRegistry;
use llm::{ChatMessage, PromptFormat};
use std::fmt::Write as _;
use std::sync::Arc;

/// Peer results included in a task prompt.
pub const MAX_PEER_RESULTS: usize = 3;

/// Characters of each peer result included in a task prompt.
pub const PEER_EXCERPT_CHARS: usize = 200;

/// Fixed tool-use instructions appended to every task prompt.
pub const TOOL_INSTRUCTIONS: &str = "\
When you need to perform an action, use one of the available tools by responding in this exact format:
ACTION: tool_name
INPUT: input for the tool

Only use a tool when the task requires information that tool provides.
If you don't need a tool, just complete the task directly.";

/// Builds prompts for task execution, tool follow-ups and planning.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    format: PromptFormat,
    tools: Arc<ToolRegistry>,
}

impl PromptAssembler {
    pub fn new(format: PromptFormat, tools: Arc<ToolRegistry>) -> Self {
        Self { format, tools }
    }

    pub fn format(&self) -> PromptFormat {
        self.format
    }

    /// Messages for executing one task.
    pub fn messages(
        &self,
        persona: &AgentPersona,
        task_description: &str,
        project_description: &str,
        document_context: &str,
        recent_peer_results: &[PeerResult],
    ) -> Vec<ChatMessage> {
        let mut system = persona.system_prompt.trim().to_string();

        let tools = self.tools.describe_for(persona);
        if tools.is_empty() {
            system.push_str("\n\nNo tools available.");
        } else {
            let _ = write!(system, "\n\nAvailable tools:\n{}", tools);
        }
        let _ = write!(system, "\n\n{}", TOOL_INSTRUCTIONS);

        let mut user = String::new();
        if !project_description.trim().is_empty() {
            let _ = write!(user, "Project: {}\n\n", project_description.trim());
        }
        let _ = write!(user, "Your task: {}", task_description);

        if !document_context.trim().is_empty() {
            let _ = write!(
                user,
                "\n\nThe user has provided a document with the following content:\n{}\n\nRefer to this document where it is relevant.",
                document_context
            );
        }

        let peers: Vec<&PeerResult> = recent_peer_results
            .iter()
            .filter(|p| p.agent_id != persona.id)
            .take(MAX_PEER_RESULTS)
            .collect();
        if !peers.is_empty() {
            user.push_str("\n\nRecent work by other agents:");
            for peer in peers {
                let excerpt: String = peer.excerpt.chars().take(PEER_EXCERPT_CHARS).collect();
                let _ = write!(
                    user,
                    "\n- {} ({}): {}",
                    peer.description, peer.agent_id, excerpt
                );
            }
        }

        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }

    /// Task prompt flattened with the configured template.
    pub fn build(
        &self,
        persona: &AgentPersona,
        task_description: &str,
        project_description: &str,
        document_context: &str,
        recent_peer_results: &[PeerResult],
    ) -> String {
        self.format.render(&self.messages(
            persona,
            task_description,
            project_description,
            document_context,
            recent_peer_results,
        ))
    }

    /// Second-round messages after a tool ran.
    pub fn tool_followup_messages(
        &self,
        task_description: &str,
        tool: &str,
        tool_output: &str,
    ) -> Vec<ChatMessage> {
        vec![ChatMessage::system(format!(
            "You are a helpful assistant. The task was: '{}'. You used the {} tool and got this result: '{}'. Now complete the task based on this information.",
            task_description, tool, tool_output
        ))]
    }

    pub fn tool_followup(&self, task_description: &str, tool: &str, tool_output: &str) -> String {
        self.format
            .render(&self.tool_followup_messages(task_description, tool, tool_output))
    }

    /// Messages asking the model to decompose a project into tasks.
    pub fn planning_messages(
        &self,
        description: &str,
        personas: &PersonaRegistry,
    ) -> Vec<ChatMessage> {
        let mut system = String::from(
            "You are a project coordinator. Break the project into a small number of concrete \
             tasks and assign each task to the most suitable agent.",
        );
        system.push_str("\n\nAvailable agents:");
        for persona in personas.iter() {
            let _ = write!(
                system,
                "\n- {}: {} (skills: {})",
                persona.id,
                persona.role,
                persona.skills.join(", ")
            );
        }
        system.push_str(
            "\n\nRespond with a JSON array only. Each element must be an object with the keys \
             \"description\" (string), \"agent_id\" (one of the agent ids above), \"priority\" \
             (integer, 1 = highest) and \"dependencies\" (array of 1-based positions of tasks \
             in this list that must finish first).",
        );

        vec![
            ChatMessage::system(system),
            ChatMessage::user(format!("Project: {}", description.trim())),
        ]
    }

    pub fn planning(&self, description: &str, personas: &PersonaRegistry) -> String {
        self.format
            .render(&self.planning_messages(description, personas))
    }
}
