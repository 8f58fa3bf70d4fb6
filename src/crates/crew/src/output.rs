//! Persisting task results as files.
//!
//! Results land in `<root>/<agent_id>/<name>_<timestamp>.<ext>`. The content
//! kind is guessed from the task description first and the result body
//! second; when the result wraps code in a fenced block of that kind, only
//! the block body is written.

use crate::error::{CrewError, Result};
use crate::parser::fenced_blocks;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Longest logical name kept in a file name
pub const MAX_NAME_LEN: usize = 50;

static HTML_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(html|web ?page|landing page|homepage|markup)\b").unwrap()
});
static CSS_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(css|stylesheet|styles|styling)\b").unwrap());
static JS_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(javascript|js|script)\b").unwrap());
static JSON_WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bjson\b").unwrap());

static CLOSING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</[A-Za-z][A-Za-z0-9]*\s*>").unwrap());
static CSS_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(@[a-z-]+[^{;]*|[.#:A-Za-z*\[][^{};]*)\{[^}]*:[^}]*\}").unwrap()
});
static JS_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(function|const|let|var)\b|=>").unwrap());
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").unwrap());

/// What a result looks like, for naming and extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Html,
    Css,
    Js,
    Json,
    Text,
}

impl ContentKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Css => "text/css",
            Self::Js => "application/javascript",
            Self::Json => "application/json",
            Self::Text => "text/plain",
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Self::Html,
            "css" => Self::Css,
            "js" | "mjs" => Self::Js,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Fence tags that mark a block of this kind
    fn fence_tags(&self) -> &'static [&'static str] {
        match self {
            Self::Html => &["html", "htm"],
            Self::Css => &["css"],
            Self::Js => &["js", "javascript"],
            Self::Json => &["json"],
            Self::Text => &[],
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Guess the kind from the task description, then from the result body.
pub fn detect_kind(description: &str, content: &str) -> ContentKind {
    if HTML_WORDS.is_match(description) {
        return ContentKind::Html;
    }
    if CSS_WORDS.is_match(description) {
        return ContentKind::Css;
    }
    if JS_WORDS.is_match(description) {
        return ContentKind::Js;
    }
    if JSON_WORDS.is_match(description) {
        return ContentKind::Json;
    }

    let body = fenced_blocks(content)
        .into_iter()
        .next()
        .map(|b| b.body)
        .unwrap_or_else(|| content.to_string());
    sniff(&body)
}

fn sniff(body: &str) -> ContentKind {
    let trimmed = body.trim();
    if trimmed.starts_with('<') && CLOSING_TAG.is_match(trimmed) {
        return ContentKind::Html;
    }
    // A selector must precede the first brace, so JSON objects are not CSS.
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') && CSS_RULE.is_match(trimmed) {
        return ContentKind::Css;
    }
    if JS_DECL.is_match(trimmed) && (trimmed.contains(';') || trimmed.contains('}')) {
        return ContentKind::Js;
    }
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return ContentKind::Json;
    }
    ContentKind::Text
}

/// The part of `content` worth saving for `kind`.
///
/// A fenced block tagged for the kind wins; for code kinds the first
/// untagged block is used next; otherwise the whole text is kept.
pub fn extract_content(content: &str, kind: ContentKind) -> String {
    if kind == ContentKind::Text {
        return content.to_string();
    }
    let blocks = fenced_blocks(content);
    blocks
        .iter()
        .find(|b| {
            b.lang
                .as_deref()
                .is_some_and(|lang| kind.fence_tags().contains(&lang))
        })
        .or_else(|| blocks.iter().find(|b| b.lang.is_none()))
        .map(|b| b.body.clone())
        .unwrap_or_else(|| content.to_string())
}

/// Filesystem-safe token: `[A-Za-z0-9_-]`, at most 50 chars, never empty.
pub fn sanitize_name(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let token: String = replaced
        .trim_matches('_')
        .chars()
        .take(MAX_NAME_LEN)
        .collect();
    let token = token.trim_end_matches('_');
    if token.is_empty() {
        "output".to_string()
    } else {
        token.to_string()
    }
}

/// Handle returned for a saved artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedOutput {
    pub path: PathBuf,
    /// File name inside the agent directory
    pub name: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
    pub kind: ContentKind,
}

impl SavedOutput {
    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }
}

/// Directory-backed output store
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` without ever replacing an existing file.
    pub async fn save(
        &self,
        agent_id: &str,
        logical_name: &str,
        content: &str,
        kind: ContentKind,
    ) -> Result<SavedOutput> {
        let agent_dir_name = sanitize_name(agent_id);
        let dir = self.root.join(&agent_dir_name);
        fs::create_dir_all(&dir).await.map_err(|e| {
            CrewError::Output(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let timestamp = Utc::now();
        let stem = format!(
            "{}_{}",
            sanitize_name(logical_name),
            timestamp.format("%Y%m%d_%H%M%S_%6f")
        );

        let mut suffix = 0u32;
        loop {
            let name = if suffix == 0 {
                format!("{}.{}", stem, kind.extension())
            } else {
                format!("{}_{}.{}", stem, suffix, kind.extension())
            };
            let path = dir.join(&name);

            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(mut file) => {
                    file.write_all(content.as_bytes()).await?;
                    file.flush().await?;
                    debug!(path = %path.display(), bytes = content.len(), "Saved output");
                    return Ok(SavedOutput {
                        path,
                        name,
                        agent_id: agent_id.to_string(),
                        timestamp,
                        size: content.len() as u64,
                        kind,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                }
                Err(e) => {
                    return Err(CrewError::Output(format!(
                        "cannot write {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
    }

    /// Every saved artifact, sorted by path. A missing root lists nothing.
    pub async fn list(&self) -> Result<Vec<SavedOutput>> {
        let mut outputs = Vec::new();
        let mut agents = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(outputs),
            Err(e) => return Err(e.into()),
        };

        while let Some(agent_entry) = agents.next_entry().await? {
            if !agent_entry.file_type().await?.is_dir() {
                continue;
            }
            let agent_id = agent_entry.file_name().to_string_lossy().into_owned();
            let mut files = fs::read_dir(agent_entry.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let metadata = file.metadata().await?;
                if !metadata.is_file() {
                    continue;
                }
                let path = file.path();
                let kind = path
                    .extension()
                    .map(|ext| ContentKind::from_extension(&ext.to_string_lossy()))
                    .unwrap_or(ContentKind::Text);
                let timestamp = metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                outputs.push(SavedOutput {
                    name: file.file_name().to_string_lossy().into_owned(),
                    path,
                    agent_id: agent_id.clone(),
                    timestamp,
                    size: metadata.len(),
                    kind,
                });
            }
        }

        outputs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(outputs)
    }
}
