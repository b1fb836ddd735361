//! In-memory, append-only history of summaries.
//!
//! Lives for the lifetime of the process. Appends from concurrent batch workers
//! are serialised through a mutex so positions always match call order.

use crate::summary::SummaryResult;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("unknown export format '{0}', expected json, markdown or text")]
    UnknownFormat(String),
}

/// A recorded result with its position in the append order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub position: usize,
    #[serde(flatten)]
    pub result: SummaryResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Structured records, every field
    #[default]
    Json,
    Markdown,
    /// Flat plain-text records
    Text,
}

impl FromStr for ExportFormat {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(HistoryError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Text => "text",
        })
    }
}

/// Process-scoped record of summary results.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // entries are only ever pushed whole, poisoning is ignored
    fn entries(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a result and return its position.
    pub fn append(&self, result: SummaryResult) -> usize {
        let mut entries = self.entries();
        let position = entries.len();
        debug!("history[{position}] <- {}", result.url());
        entries.push(HistoryEntry { position, result });
        position
    }

    /// Snapshot of all entries in insertion order
    pub fn list(&self) -> Vec<HistoryEntry> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop every entry; positions restart at zero.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Render the history without modifying it.
    pub fn export(&self, format: ExportFormat) -> Result<String, HistoryError> {
        let entries = self.list();
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&entries)?),
            ExportFormat::Markdown => Ok(render_markdown(&entries)),
            ExportFormat::Text => Ok(render_text(&entries)),
        }
    }
}

fn display_title(result: &SummaryResult) -> &str {
    result.title().unwrap_or("Unknown Title")
}

fn image_list(result: &SummaryResult) -> String {
    result
        .images()
        .iter()
        .map(|image| match image.width {
            Some(width) => format!("{} ({width}px)", image.url),
            None => image.url.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_markdown(entries: &[HistoryEntry]) -> String {
    let mut out = String::from("# Website Summaries Export\n\n");
    for entry in entries {
        let result = &entry.result;
        let _ = writeln!(out, "## {}", display_title(result));
        let _ = writeln!(out, "**URL:** {}", result.url());
        let _ = writeln!(out, "**Summary Type:** {}", result.summary_type());
        let _ = writeln!(out, "**Date:** {}", result.created_at().to_rfc3339());
        if let Some(favicon) = result.favicon() {
            let _ = writeln!(out, "**Favicon:** {favicon}");
        }
        if !result.images().is_empty() {
            let _ = writeln!(out, "**Images:** {}", image_list(result));
        }
        out.push('\n');
        match (result.summary_text(), result.error()) {
            (Some(text), _) => out.push_str(text),
            (None, Some(error)) => {
                let _ = write!(out, "**Error** (`{}`): {error}", error.kind_label());
            }
            (None, None) => {}
        }
        out.push_str("\n\n---\n\n");
    }
    out
}

fn render_text(entries: &[HistoryEntry]) -> String {
    let mut out = String::from("WEBSITE SUMMARIES EXPORT\n\n");
    for entry in entries {
        let result = &entry.result;
        let _ = writeln!(out, "Title: {}", display_title(result));
        let _ = writeln!(out, "URL: {}", result.url());
        let _ = writeln!(out, "Type: {}", result.summary_type());
        let _ = writeln!(out, "Date: {}", result.created_at().to_rfc3339());
        let _ = writeln!(
            out,
            "Favicon: {}",
            result.favicon().map(|url| url.as_str()).unwrap_or("-")
        );
        let _ = writeln!(out, "Images: {}", image_list(result));
        match (result.summary_text(), result.error()) {
            (Some(text), _) => {
                let _ = writeln!(out, "Summary:\n{text}");
            }
            (None, Some(error)) => {
                let _ = writeln!(out, "Error [{}]: {error}", error.kind_label());
            }
            (None, None) => {}
        }
        let _ = write!(out, "\n{}\n\n", "=".repeat(50));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, FetchErrorKind};
    use crate::extractor::ImageRef;
    use crate::summary::SummaryType;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use url::Url;

    fn ok(url: &str) -> SummaryResult {
        SummaryResult::success(url, SummaryType::Short, format!("summary of {url}"))
            .with_title("Example")
    }

    #[test]
    fn append_and_list_preserve_order() {
        let store = HistoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.append(ok("https://a.test")), 0);
        assert_eq!(store.append(ok("https://b.test")), 1);
        assert_eq!(store.append(ok("https://a.test")), 2);

        let urls: Vec<_> = store.list().iter().map(|e| e.result.url().to_string()).collect();
        assert_eq!(urls, vec!["https://a.test", "https://b.test", "https://a.test"]);
        assert_eq!(
            store.list().iter().map(|e| e.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn concurrent_appends_lose_nothing() {
        let store = Arc::new(HistoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for n in 0..50 {
                        store.append(ok(&format!("https://{worker}.test/{n}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = store.list();
        assert_eq!(entries.len(), 400);
        assert!(entries.iter().enumerate().all(|(i, e)| e.position == i));
        // per-writer order survives interleaving
        for worker in 0..8 {
            let prefix = format!("https://{worker}.test/");
            let seen: Vec<usize> = entries
                .iter()
                .filter_map(|e| e.result.url().strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(seen, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn export_does_not_mutate() {
        let store = HistoryStore::new();
        store.append(ok("https://a.test"));
        let before = store.list();
        for format in [ExportFormat::Json, ExportFormat::Markdown, ExportFormat::Text] {
            store.export(format).unwrap();
        }
        assert_eq!(store.list(), before);
    }

    #[test]
    fn json_export_covers_every_field() {
        let store = HistoryStore::new();
        store.append(
            ok("https://a.test")
                .with_images(vec![ImageRef {
                    url: Url::parse("https://a.test/hero.png").unwrap(),
                    width: Some(640),
                }])
                .with_favicon(Url::parse("https://a.test/favicon.ico").ok()),
        );
        store.append(SummaryResult::failure(
            "https://b.test",
            SummaryType::Detailed,
            FetchError::new(FetchErrorKind::HttpStatus(503), "Service Unavailable").into(),
        ));

        let json: serde_json::Value = serde_json::from_str(&store.export(ExportFormat::Json).unwrap()).unwrap();
        let first = &json[0];
        for field in ["position", "url", "summary_type", "title", "summary_text", "images", "favicon", "error", "created_at"] {
            assert!(first.get(field).is_some(), "missing {field}");
        }
        assert_eq!(first["summary_type"], "short");
        assert_eq!(first["images"][0]["width"], 640);
        assert!(first["error"].is_null());

        let second = &json[1];
        assert_eq!(second["position"], 1);
        assert!(second["summary_text"].is_null());
        assert_eq!(second["error"]["stage"], "fetch");
        assert_eq!(second["error"]["error"]["kind"]["code"], 503);
    }

    #[test]
    fn text_and_markdown_layouts() {
        let store = HistoryStore::new();
        store.append(ok("https://a.test"));

        let markdown = store.export(ExportFormat::Markdown).unwrap();
        assert!(markdown.starts_with("# Website Summaries Export\n\n## Example\n**URL:** https://a.test\n"));
        assert!(markdown.contains("summary of https://a.test\n\n---\n\n"));

        let text = store.export(ExportFormat::Text).unwrap();
        assert!(text.starts_with("WEBSITE SUMMARIES EXPORT\n\nTitle: Example\nURL: https://a.test\nType: short\n"));
        assert!(text.contains(&"=".repeat(50)));
    }

    #[test]
    fn clear_resets_positions() {
        let store = HistoryStore::new();
        store.append(ok("https://a.test"));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.append(ok("https://b.test")), 0);
    }

    #[test]
    fn parses_export_formats() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("csv".parse::<ExportFormat>().is_err());
    }
}
