//! Error types for crew
//!
//! Worker-level failures never escape the worker loop; these errors surface
//! from configuration, persistence and store operations.

use thiserror::Error;

/// Result type alias for crew operations
pub type Result<T> = std::result::Result<T, CrewError>;

/// Main error type for crew operations
#[derive(Debug, Error)]
pub enum CrewError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No task with this id in the current generation
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A task id was inserted twice into the same store
    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    /// Status change not permitted by the task lifecycle
    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: String,
        to: String,
    },

    /// Unknown or malformed persona table
    #[error("Persona error: {0}")]
    Persona(String),

    /// Tool registration or execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// Document could not be read as context
    #[error("Document error: {0}")]
    Document(String),

    /// Output persistence error
    #[error("Output error: {0}")]
    Output(String),

    /// Worker lifecycle error (spawn/join)
    #[error("Worker error: {0}")]
    Worker(String),

    /// LLM client error
    #[error("LLM error: {0}")]
    Llm(#[from] llm::LlmError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<String> for CrewError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}

impl From<&str> for CrewError {
    fn from(msg: &str) -> Self {
        Self::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message() {
        let err = CrewError::InvalidTransition {
            task_id: "t1".to_string(),
            from: "completed".to_string(),
            to: "in_progress".to_string(),
        };
        assert_eq!(err.to_string(), "Task t1 cannot move from completed to in_progress");
    }

    #[test]
    fn test_conversions() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(CrewError::from(io), CrewError::Io(_)));

        let llm_err = llm::LlmError::Timeout("60s".to_string());
        assert!(CrewError::from(llm_err).to_string().contains("Request timeout"));

        assert!(matches!(CrewError::from("boom"), CrewError::Other(_)));
    }
}
