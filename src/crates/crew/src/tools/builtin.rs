//! Built-in tools.
//!
//! `search`, `weather` and `summarize` are deterministic stand-ins that return
//! fixed-format text; `calculator`, `word_count` and `json_validate` compute
//! real answers.

use super::calculator;
use super::Tool;
use async_trait::async_trait;

pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web for information"
    }

    async fn run(&self, input: &str) -> String {
        format!("Search results for '{}' would appear here", input)
    }
}

pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location"
    }

    async fn run(&self, input: &str) -> String {
        format!("The weather in {} is currently sunny and 72°F", input)
    }
}

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations"
    }

    async fn run(&self, input: &str) -> String {
        match calculator::evaluate(input) {
            Ok(value) => format!("Result: {}", calculator::format_number(value)),
            Err(e) => format!("Error in calculation: {}", e),
        }
    }
}

pub struct SummarizeTool;

#[async_trait]
impl Tool for SummarizeTool {
    fn name(&self) -> &str {
        "summarize"
    }

    fn description(&self) -> &str {
        "Summarize text content"
    }

    async fn run(&self, input: &str) -> String {
        format!(
            "Summary of text ({} characters): This is a placeholder for text summarization.",
            input.chars().count()
        )
    }
}

pub struct WordCountTool;

#[async_trait]
impl Tool for WordCountTool {
    fn name(&self) -> &str {
        "word_count"
    }

    fn description(&self) -> &str {
        "Count words, lines and characters in text"
    }

    async fn run(&self, input: &str) -> String {
        format!(
            "Words: {}, Lines: {}, Characters: {}",
            input.split_whitespace().count(),
            input.lines().count(),
            input.chars().count()
        )
    }
}

pub struct JsonValidateTool;

#[async_trait]
impl Tool for JsonValidateTool {
    fn name(&self) -> &str {
        "json_validate"
    }

    fn description(&self) -> &str {
        "Check whether text is valid JSON"
    }

    async fn run(&self, input: &str) -> String {
        match serde_json::from_str::<serde_json::Value>(input.trim()) {
            Ok(value) => {
                let kind = match value {
                    serde_json::Value::Object(ref m) => format!("object with {} keys", m.len()),
                    serde_json::Value::Array(ref a) => format!("array with {} items", a.len()),
                    _ => "scalar".to_string(),
                };
                format!("Valid JSON: {}", kind)
            }
            Err(e) => format!("Invalid JSON: {}", e),
        }
    }
}
