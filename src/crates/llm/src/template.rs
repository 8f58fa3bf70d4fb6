//! Prompt templates that flatten role-tagged messages into one string.
//!
//! The raw-completion endpoint takes a single prompt, so the chat structure
//! has to be encoded in the text itself. Each [`PromptFormat`] is one such
//! encoding.

use crate::error::LlmError;
use crate::message::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Template used to render a conversation into a single prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptFormat {
    /// `[INST]` blocks with the system prompt folded into the first turn.
    #[default]
    Llama2,
    /// `<|im_start|>role ... <|im_end|>` blocks.
    ChatMl,
    /// Messages separated by blank lines, no markup.
    Plain,
}

impl PromptFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llama2 => "llama2",
            Self::ChatMl => "chatml",
            Self::Plain => "plain",
        }
    }

    /// Render the messages into one prompt string.
    pub fn render(&self, messages: &[ChatMessage]) -> String {
        match self {
            Self::Llama2 => render_llama2(messages),
            Self::ChatMl => render_chatml(messages),
            Self::Plain => render_plain(messages),
        }
    }
}

impl std::fmt::Display for PromptFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PromptFormat {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llama2" | "llama" => Ok(Self::Llama2),
            "chatml" => Ok(Self::ChatMl),
            "plain" | "raw" => Ok(Self::Plain),
            other => Err(LlmError::ConfigError(format!(
                "unknown prompt format '{}' (expected llama2, chatml or plain)",
                other
            ))),
        }
    }
}

fn render_llama2(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    let mut pending_system: Option<&str> = None;

    for message in messages {
        match message.role {
            Role::System => pending_system = Some(message.content.as_str()),
            Role::User => {
                out.push_str("<s>[INST] ");
                if let Some(system) = pending_system.take() {
                    out.push_str("<<SYS>>\n");
                    out.push_str(system);
                    out.push_str("\n<</SYS>>\n\n");
                }
                out.push_str(&message.content);
                out.push_str(" [/INST]");
            }
            Role::Assistant => {
                out.push(' ');
                out.push_str(&message.content);
                out.push_str(" </s>");
            }
        }
    }

    // A trailing system message with no user turn still has to reach the model.
    if let Some(system) = pending_system {
        out.push_str("<s>[INST] <<SYS>>\n");
        out.push_str(system);
        out.push_str("\n<</SYS>>\n\n [/INST]");
    }

    out
}

fn render_chatml(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str("<|im_start|>");
        out.push_str(message.role.as_str());
        out.push('\n');
        out.push_str(&message.content);
        out.push_str("<|im_end|>\n");
    }
    out.push_str("<|im_start|>assistant\n");
    out
}

fn render_plain(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| m.content.as_str())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
