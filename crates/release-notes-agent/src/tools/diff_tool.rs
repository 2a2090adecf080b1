//! `make_diff`: markdown diff report for the configured repository.

use std::path::{Path, PathBuf};

use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;

use super::ToolError;
use crate::diff_report::{make_diff_string, DiffOptions};

#[derive(Debug, Default, Deserialize)]
pub struct MakeDiffArgs {
    /// Start of the range (branch, tag or commit). Defaulted when omitted.
    #[serde(default)]
    pub from_ref: Option<String>,
    /// End of the range. Defaulted when omitted.
    #[serde(default)]
    pub to_ref: Option<String>,
    /// Substring patterns of paths to leave out. Empty = lockfile defaults.
    #[serde(default)]
    pub ignore_patterns: Option<Vec<String>>,
}

/// Diff two references of the repository into a markdown report.
///
/// The repository is fixed at construction; the model only picks the range.
pub struct MakeDiffTool {
    pub repo_path: PathBuf,
    /// Cap on the full-diff section. 0 = unlimited.
    pub max_diff_chars: usize,
}

impl MakeDiffTool {
    pub fn new(repo_path: &Path) -> Self {
        Self {
            repo_path: repo_path.to_path_buf(),
            max_diff_chars: 0,
        }
    }

    pub fn with_max_diff_chars(mut self, max_diff_chars: usize) -> Self {
        self.max_diff_chars = max_diff_chars;
        self
    }
}

impl Tool for MakeDiffTool {
    const NAME: &'static str = "make_diff";
    type Error = ToolError;
    type Args = MakeDiffArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: "make_diff".into(),
            description: "Return a markdown git diff report (commit range, commits, changed files, \
                          full diff) for the repository. Omit from_ref/to_ref to use the default \
                          range: main -> develop."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "from_ref": {
                        "type": "string",
                        "description": "Start of the range: branch, tag or commit"
                    },
                    "to_ref": {
                        "type": "string",
                        "description": "End of the range: branch, tag or commit"
                    },
                    "ignore_patterns": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Substrings of file paths to exclude (default: uv.lock, package-lock.json)"
                    }
                },
                "required": []
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let repo_path = self.repo_path.clone();
        let options = DiffOptions::default()
            .with_ignore_patterns(args.ignore_patterns.unwrap_or_default())
            .with_max_diff_chars(self.max_diff_chars);

        tracing::info!(
            repo = %repo_path.display(),
            from = args.from_ref.as_deref().unwrap_or("<default>"),
            to = args.to_ref.as_deref().unwrap_or("<default>"),
            "make_diff"
        );

        let report = tokio::task::spawn_blocking(move || {
            make_diff_string(
                &repo_path,
                args.from_ref.as_deref(),
                args.to_ref.as_deref(),
                &options,
            )
        })
        .await??;
        Ok(report)
    }
}
