//! `get_release_notes`: the published release notes used as a style exemplar.

use std::path::{Path, PathBuf};

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::ToolError;

/// The tool takes no arguments; the path is configuration, not model input.
#[derive(Debug, Default, Deserialize)]
pub struct GetReleaseNotesArgs {}

/// Read the configured release-notes document.
///
/// When `max_output_chars` is set the document is cut after that many
/// characters. Release notes are newest-first, so the kept head is the part
/// that best reflects the current style.
pub struct ReleaseNotesTool {
    pub path: PathBuf,
    /// Maximum characters to return. 0 = unlimited.
    pub max_output_chars: usize,
}

impl ReleaseNotesTool {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            max_output_chars: 0,
        }
    }

    pub fn with_max_output_chars(mut self, max_output_chars: usize) -> Self {
        self.max_output_chars = max_output_chars;
        self
    }

    /// Read the document synchronously.
    pub fn read(&self) -> Result<String, ToolError> {
        if !self.path.exists() {
            return Err(ToolError::ReferenceNotFound(self.path.clone()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(truncate_head(content, self.max_output_chars))
    }
}

impl Tool for ReleaseNotesTool {
    const NAME: &'static str = "get_release_notes";
    type Error = ToolError;
    type Args = GetReleaseNotesArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: "get_release_notes".into(),
            description: format!(
                "Load the existing published release notes ({}) to use as the style reference.",
                self.path.display()
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::info!(path = %self.path.display(), "get_release_notes");
        let tool = Self {
            path: self.path.clone(),
            max_output_chars: self.max_output_chars,
        };
        tokio::task::spawn_blocking(move || tool.read()).await?
    }
}

/// Keep whole lines up to `max_chars`, then a marker naming what was cut.
fn truncate_head(content: String, max_chars: usize) -> String {
    if max_chars == 0 || content.chars().count() <= max_chars {
        return content;
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut truncated = String::with_capacity(max_chars + 100);
    let mut used = 0;
    let mut included_lines = 0;
    for line in &lines {
        let cost = line.chars().count() + 1;
        if used + cost > max_chars {
            break;
        }
        truncated.push_str(line);
        truncated.push('\n');
        used += cost;
        included_lines += 1;
    }
    let remaining = lines.len() - included_lines;
    truncated.push_str(&format!("\n[...{remaining} older lines omitted...]\n"));
    truncated
}
