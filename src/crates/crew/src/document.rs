//! Plain-text document context.
//!
//! A document supplied with a project is read once, cut to a fixed number of
//! characters, and included in every task prompt.

use crate::error::{CrewError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Characters of document text kept by default
pub const DEFAULT_MAX_CHARS: usize = 5000;

/// Extensions read as plain text
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Cut `text` to `max_chars` characters, appending a note when anything was
/// removed.
pub fn truncate(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let mut kept: String = text.chars().take(max_chars).collect();
    kept.push_str(&format!(
        "\n[Note: Document truncated from {} characters to {} characters]",
        total, max_chars
    ));
    kept
}

/// Read a `.txt` or `.md` file and truncate it.
pub async fn load(path: &Path, max_chars: usize) -> Result<String> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(CrewError::Document(format!(
            "unsupported document type '{}' for {} (expected .txt or .md)",
            ext,
            path.display()
        )));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CrewError::Document(format!("cannot read {}: {}", path.display(), e)))?;
    let text = String::from_utf8_lossy(&bytes);
    debug!(path = %path.display(), chars = text.chars().count(), "Read document");

    let context = truncate(&text, max_chars);
    info!(
        path = %path.display(),
        chars = context.chars().count(),
        "Loaded document context"
    );
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("", 10), "");
    }

    #[test]
    fn test_truncation_notice() {
        let text = "é".repeat(12);
        let cut = truncate(&text, 5);
        assert!(cut.starts_with(&"é".repeat(5)));
        assert!(cut.ends_with("[Note: Document truncated from 12 characters to 5 characters]"));
    }

    #[tokio::test]
    async fn test_load_markdown() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brief.md");
        tokio::fs::write(&path, "# Brief\nSell more boats.").await.unwrap();
        assert_eq!(load(&path, 100).await.unwrap(), "# Brief\nSell more boats.");
    }

    #[tokio::test]
    async fn test_load_rejects_other_types() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brief.pdf");
        tokio::fs::write(&path, b"%PDF").await.unwrap();
        assert!(matches!(load(&path, 100).await, Err(CrewError::Document(_))));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir.path().join("none.txt"), 100).await.is_err());
    }
}
