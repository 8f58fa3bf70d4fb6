//! Agent personas
//!
//! A persona is plain data: an id, a role label, skill tags, the system
//! prompt used when it executes a task, and the names of any extra tools it
//! may call. Two built-in rosters are provided; which one is active is a
//! configuration choice and nothing downstream depends on it.

use crate::error::{CrewError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// One agent persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPersona {
    pub id: String,
    pub role: String,
    pub skills: Vec<String>,
    pub system_prompt: String,
    /// Tools available to this persona on top of the default set
    #[serde(default)]
    pub tools: Vec<String>,
}

impl AgentPersona {
    pub fn new(
        id: impl Into<String>,
        role: impl Into<String>,
        skills: &[&str],
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = tools.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Built-in persona tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Roster {
    /// Five role specialists
    #[default]
    Specialist,
    /// Four interchangeable general agents
    Versatile,
}

impl Roster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Specialist => "specialist",
            Self::Versatile => "versatile",
        }
    }
}

impl std::fmt::Display for Roster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Roster {
    type Err = CrewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "specialist" | "specialists" => Ok(Self::Specialist),
            "versatile" => Ok(Self::Versatile),
            other => Err(CrewError::Config(format!(
                "unknown roster '{}' (expected specialist or versatile)",
                other
            ))),
        }
    }
}

/// Read-only persona table with a designated default.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<AgentPersona>,
    default_id: String,
}

impl PersonaRegistry {
    /// Build a registry. Ids must be unique and `default_id` must be one of them.
    pub fn new(personas: Vec<AgentPersona>, default_id: impl Into<String>) -> Result<Self> {
        let default_id = default_id.into();
        if personas.is_empty() {
            return Err(CrewError::Persona("persona table is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for persona in &personas {
            if !seen.insert(persona.id.to_ascii_lowercase()) {
                return Err(CrewError::Persona(format!("duplicate persona id '{}'", persona.id)));
            }
        }
        if !personas.iter().any(|p| p.id == default_id) {
            return Err(CrewError::Persona(format!(
                "default persona '{}' is not in the table",
                default_id
            )));
        }

        Ok(Self {
            personas,
            default_id,
        })
    }

    pub fn from_roster(roster: Roster) -> Self {
        match roster {
            Roster::Specialist => Self::specialist(),
            Roster::Versatile => Self::versatile(),
        }
    }

    /// FrontendDev, BackendDev, DataAnalyst, ContentWriter and QATester.
    /// Unassigned work goes to ContentWriter.
    pub fn specialist() -> Self {
        let personas = vec![
            AgentPersona::new(
                "FrontendDev",
                "Frontend Developer",
                &["html", "css", "javascript", "ui", "accessibility"],
                "You are FrontendDev, a frontend developer. You write clean, \
                 semantic HTML, modern CSS and plain JavaScript. When you produce \
                 code, put it in a fenced code block tagged with its language.",
            )
            .with_tools(&["word_count"]),
            AgentPersona::new(
                "BackendDev",
                "Backend Developer",
                &["apis", "databases", "server logic", "json"],
                "You are BackendDev, a backend developer. You design APIs, data \
                 models and server logic. Prefer concrete code and JSON examples \
                 in fenced code blocks.",
            )
            .with_tools(&["json_validate"]),
            AgentPersona::new(
                "DataAnalyst",
                "Data Analyst",
                &["analysis", "statistics", "reporting"],
                "You are DataAnalyst. You analyse data, compute figures carefully \
                 and report findings with the numbers that support them.",
            )
            .with_tools(&["json_validate"]),
            AgentPersona::new(
                "ContentWriter",
                "Content Writer",
                &["copywriting", "documentation", "editing"],
                "You are ContentWriter, a writer. You produce clear, well-structured \
                 prose suited to the audience of the project.",
            )
            .with_tools(&["word_count"]),
            AgentPersona::new(
                "QATester",
                "QA Tester",
                &["testing", "review", "edge cases"],
                "You are QATester. You review the work of other agents, write test \
                 plans and point out defects precisely.",
            )
            .with_tools(&["word_count", "json_validate"]),
        ];
        Self::builtin(personas, "ContentWriter")
    }

    /// Agent1 to Agent4, identical generalists. Agent1 is the default.
    pub fn versatile() -> Self {
        let personas = (1..=4)
            .map(|n| {
                AgentPersona::new(
                    format!("Agent{}", n),
                    "Versatile Agent",
                    &["development", "writing", "analysis", "testing"],
                    format!(
                        "You are Agent{}, a versatile assistant able to write code, \
                         prose and analysis. Complete the task you are given fully \
                         and put any code in fenced code blocks.",
                        n
                    ),
                )
                .with_tools(&["word_count", "json_validate"])
            })
            .collect();
        Self::builtin(personas, "Agent1")
    }

    fn builtin(personas: Vec<AgentPersona>, default_id: &str) -> Self {
        Self {
            personas,
            default_id: default_id.to_string(),
        }
    }

    /// Exact-id lookup.
    pub fn get(&self, id: &str) -> Option<&AgentPersona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Case-insensitive lookup returning the canonical persona.
    pub fn find(&self, id: &str) -> Option<&AgentPersona> {
        let id = id.trim();
        self.personas.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn default_persona(&self) -> &AgentPersona {
        // `new` and `builtin` guarantee the default exists.
        self.get(&self.default_id).unwrap_or(&self.personas[0])
    }

    pub fn default_id(&self) -> &str {
        &self.default_persona().id
    }

    /// Persona for `id`, or the default when missing or unknown.
    pub fn resolve(&self, id: Option<&str>) -> &AgentPersona {
        id.and_then(|id| self.find(id))
            .unwrap_or_else(|| self.default_persona())
    }

    /// Persona whose id appears earliest in `text` as a whole word,
    /// ignoring case. Longer ids win at the same position.
    pub fn find_mentioned(&self, text: &str) -> Option<&AgentPersona> {
        let haystack = text.to_ascii_lowercase();
        self.personas
            .iter()
            .filter_map(|p| whole_word_position(&haystack, &p.id.to_ascii_lowercase()).map(|pos| (pos, p)))
            .min_by_key(|(pos, p)| (*pos, std::cmp::Reverse(p.id.len())))
            .map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentPersona> {
        self.personas.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.personas.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

fn whole_word_position(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !is_word(before) && !is_word(after)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specialist_roster() {
        let registry = PersonaRegistry::specialist();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.default_id(), "ContentWriter");
        assert!(registry.contains("FrontendDev"));
        assert!(!registry.contains("Agent1"));
    }

    #[test]
    fn test_versatile_roster() {
        let registry = PersonaRegistry::from_roster(Roster::Versatile);
        assert_eq!(registry.ids(), vec!["Agent1", "Agent2", "Agent3", "Agent4"]);
        assert_eq!(registry.default_id(), "Agent1");
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let registry = PersonaRegistry::specialist();
        assert_eq!(registry.resolve(Some("backenddev")).id, "BackendDev");
        assert_eq!(registry.resolve(Some("Wizard")).id, "ContentWriter");
        assert_eq!(registry.resolve(None).id, "ContentWriter");
    }

    #[test]
    fn test_find_mentioned_whole_word() {
        let registry = PersonaRegistry::specialist();
        let found = registry.find_mentioned("- Design the hero section (FrontendDev)");
        assert_eq!(found.map(|p| p.id.as_str()), Some("FrontendDev"));
        assert!(registry.find_mentioned("- Write docs for the frontend").is_none());
        assert!(registry.find_mentioned("FrontendDevelopers unite").is_none());
    }

    #[test]
    fn test_find_mentioned_prefers_longer_id() {
        let p1 = AgentPersona::new("Agent1", "a", &[], "p");
        let p10 = AgentPersona::new("Agent10", "a", &[], "p");
        let registry = PersonaRegistry::new(vec![p1, p10], "Agent1").unwrap();
        assert_eq!(registry.find_mentioned("assign to agent10").unwrap().id, "Agent10");
    }

    #[test]
    fn test_new_validates_table() {
        let p = AgentPersona::new("Solo", "Solo", &[], "prompt");
        assert!(PersonaRegistry::new(vec![p.clone()], "Solo").is_ok());
        assert!(PersonaRegistry::new(vec![p.clone()], "Other").is_err());
        assert!(PersonaRegistry::new(vec![p.clone(), p], "Solo").is_err());
        assert!(PersonaRegistry::new(Vec::new(), "Solo").is_err());
    }

    #[test]
    fn test_roster_from_str() {
        assert_eq!("Versatile".parse::<Roster>().unwrap(), Roster::Versatile);
        assert_eq!("specialist".parse::<Roster>().unwrap(), Roster::Specialist);
        assert!("chaotic".parse::<Roster>().is_err());
    }
}
