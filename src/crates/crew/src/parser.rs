//! Classification of raw model text.
//!
//! A reply is either a tool call (`ACTION:` / `INPUT:` or one of the
//! paraphrases models tend to produce), a structured JSON value embedded in
//! the text, or plain text. Parsing is pure; malformed candidates fall
//! through to the next rule.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static ACTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bACTION:[ \t]*([^\r\n]*)").unwrap());

static INPUT_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bINPUT:").unwrap());

static WILL_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bI(?:'ll|’ll| will) use the\s+["'`]?([A-Za-z_][\w-]*)["'`]?\s+tool\b.*?\binput:\s*(.+)"#)
        .unwrap()
});

static USING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\busing the\s+["'`]?([A-Za-z_][\w-]*)["'`]?\s+tool\b.*?\bwith(?: the)? input:?\s*(.+)"#)
        .unwrap()
});

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+\-]*)[^\n]*\n(.*?)```").unwrap());

static DIRECT_CALC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s*[+\-*/]\s*\d+\s*$").unwrap());

/// What a model reply turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    ToolCall { name: String, input: String },
    Structured { value: Value },
    PlainText { value: String },
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolCall { .. } => "tool_call",
            Self::Structured { .. } => "structured",
            Self::PlainText { .. } => "plain_text",
        }
    }
}

/// A fenced code block: optional language tag and raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    pub lang: Option<String>,
    pub body: String,
}

/// Classify `text`. Structured detection only runs when `expect_structured`.
pub fn parse(text: &str, expect_structured: bool) -> Outcome {
    if let Some((name, input)) = tool_call(text) {
        return Outcome::ToolCall { name, input };
    }

    if expect_structured {
        if let Some(value) = structured(text) {
            return Outcome::Structured { value };
        }
    }

    Outcome::PlainText {
        value: text.to_string(),
    }
}

/// Tool name and input, trying the formal marker first.
pub fn tool_call(text: &str) -> Option<(String, String)> {
    action_marker(text)
        .or_else(|| paraphrase(&WILL_USE, text))
        .or_else(|| paraphrase(&USING, text))
}

fn action_marker(text: &str) -> Option<(String, String)> {
    let action = ACTION_LINE.captures(text)?;
    let name = clean_name(action.get(1)?.as_str());
    if name.is_empty() {
        return None;
    }
    let after = &text[action.get(0)?.end()..];
    let marker = INPUT_MARKER.find(after)?;
    let input = after[marker.end()..].trim();
    if input.is_empty() {
        return None;
    }
    Some((name, input.to_string()))
}

fn paraphrase(pattern: &Regex, text: &str) -> Option<(String, String)> {
    let caps = pattern.captures(text)?;
    let name = clean_name(caps.get(1)?.as_str());
    let input = caps.get(2)?.as_str().trim();
    if name.is_empty() || input.is_empty() {
        return None;
    }
    Some((name, input.to_string()))
}

fn clean_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '[' | ']' | '.' | ','))
        .trim()
        .to_string()
}

/// First JSON value found in fenced blocks, then in balanced bracket spans.
pub fn structured(text: &str) -> Option<Value> {
    fenced_blocks(text)
        .into_iter()
        .find_map(|block| serde_json::from_str::<Value>(block.body.trim()).ok())
        .or_else(|| {
            json_spans(text)
                .into_iter()
                .find_map(|span| serde_json::from_str::<Value>(span).ok())
        })
}

/// Every fenced code block in order of appearance.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock> {
    FENCE
        .captures_iter(text)
        .map(|caps| {
            let lang = caps
                .get(1)
                .map(|m| m.as_str().trim().to_ascii_lowercase())
                .filter(|l| !l.is_empty());
            let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            FencedBlock {
                lang,
                body: body.to_string(),
            }
        })
        .collect()
}

/// Balanced `{...}` / `[...]` candidates, in order of their opening bracket.
/// Brackets inside JSON strings are ignored.
pub fn json_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    for (start, &b) in bytes.iter().enumerate() {
        if b == b'{' || b == b'[' {
            if let Some(end) = matching_close(bytes, start) {
                spans.push(&text[start..=end]);
            }
        }
    }
    spans
}

fn matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// The trimmed expression when `description` is a bare `a op b` calculation.
pub fn direct_calculation(description: &str) -> Option<&str> {
    DIRECT_CALC
        .is_match(description)
        .then(|| description.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ------------------------------------------------------------------------
    // Tool calls
    // ------------------------------------------------------------------------

    #[test]
    fn test_action_marker() {
        let outcome = parse("ACTION: search\nINPUT: weather in Rome", false);
        assert_eq!(
            outcome,
            Outcome::ToolCall {
                name: "search".to_string(),
                input: "weather in Rome".to_string()
            }
        );
    }

    #[test]
    fn test_action_marker_with_preamble_and_multiline_input() {
        let text = "Let me look that up.\naction: Summarize \nINPUT: line one\nline two\n";
        match parse(text, false) {
            Outcome::ToolCall { name, input } => {
                assert_eq!(name, "Summarize");
                assert_eq!(input, "line one\nline two");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_action_without_input_is_plain() {
        let text = "ACTION: search\nINPUT:   ";
        assert_eq!(parse(text, false).kind(), "plain_text");
        assert_eq!(parse("ACTION: search", false).kind(), "plain_text");
    }

    #[test]
    fn test_paraphrases() {
        let (name, input) =
            tool_call("I'll use the calculator tool for this. Input: 3 * 7").unwrap();
        assert_eq!((name.as_str(), input.as_str()), ("calculator", "3 * 7"));

        let (name, input) =
            tool_call("Using the weather tool with input: Paris").unwrap();
        assert_eq!((name.as_str(), input.as_str()), ("weather", "Paris"));
    }

    #[test]
    fn test_plain_text_is_verbatim() {
        assert_eq!(
            parse("just a plain answer", false),
            Outcome::PlainText {
                value: "just a plain answer".to_string()
            }
        );
    }

    // ------------------------------------------------------------------------
    // Structured
    // ------------------------------------------------------------------------

    #[test]
    fn test_fenced_json_array() {
        let text = "Here is the plan:\n```json\n[{\"description\":\"Write copy\",\"agent_id\":\"ContentWriter\",\"priority\":1,\"dependencies\":[]}]\n```";
        match parse(text, true) {
            Outcome::Structured { value } => {
                let items = value.as_array().unwrap();
                assert_eq!(items.len(), 1);
                assert_eq!(items[0]["priority"], json!(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_structured_not_attempted_unless_expected() {
        assert_eq!(parse("{\"a\": 1}", false).kind(), "plain_text");
    }

    #[test]
    fn test_bad_fence_falls_through_to_raw_span() {
        let text = "```\nnot json\n```\nAnswer: {\"ok\": true}";
        assert_eq!(
            parse(text, true),
            Outcome::Structured {
                value: json!({"ok": true})
            }
        );
    }

    #[test]
    fn test_spans_ignore_brackets_in_strings() {
        let text = r#"noise {"text": "a } b [", "n": [1, 2]} tail"#;
        assert_eq!(structured(text), Some(json!({"text": "a } b [", "n": [1, 2]})));
    }

    #[test]
    fn test_unparsable_candidates_yield_plain() {
        let text = "{not json} and [also, not]";
        assert_eq!(parse(text, true).kind(), "plain_text");
    }

    #[test]
    fn test_fenced_blocks_lang() {
        let blocks = fenced_blocks("```HTML\n<p>hi</p>\n```\n```\nplain\n```");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lang.as_deref(), Some("html"));
        assert_eq!(blocks[0].body, "<p>hi</p>\n");
        assert_eq!(blocks[1].lang, None);
    }

    // ------------------------------------------------------------------------
    // Direct calculation
    // ------------------------------------------------------------------------

    #[test]
    fn test_direct_calculation() {
        assert_eq!(direct_calculation(" 12 * 4 "), Some("12 * 4"));
        assert_eq!(direct_calculation("12 * 4 apples"), None);
        assert_eq!(direct_calculation("1 + 2 + 3"), None);
    }
}
