//! Rig-compatible tools for the release-notes agent.
//!
//! Both tools are read-only. Each implements `rig::tool::Tool` and can be
//! attached to an agent via `AgentBuilder::tool()`, or called directly when
//! the pipeline gathers context itself.

pub mod diff_tool;
pub mod reference_tool;

use std::path::PathBuf;

use crate::diff_report::DiffError;

/// Errors that can occur during tool execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("Release notes file not found at {}", .0.display())]
    ReferenceNotFound(PathBuf),

    #[error("blocking task failed: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for ToolError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Join(e.to_string())
    }
}
