//! One drafting run: gather context, prompt the model, normalize the answer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rig::tool::Tool;
use tracing::info;

use crate::config::NotesConfig;
use crate::drafter::{DraftError, Drafter, ReleaseNotesDraft};
use crate::prompts;
use crate::tools::diff_tool::{MakeDiffArgs, MakeDiffTool};
use crate::tools::reference_tool::{GetReleaseNotesArgs, ReleaseNotesTool};

/// How the model gets its context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DraftMode {
    /// Gather diff and style example up front, one prompt, no tools.
    #[default]
    Direct,
    /// Hand the model `make_diff` and `get_release_notes` and let it drive.
    Agentic,
}

impl std::fmt::Display for DraftMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Agentic => write!(f, "agentic"),
        }
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, Default)]
pub struct DraftRequest {
    pub from_ref: Option<String>,
    pub to_ref: Option<String>,
    /// Empty = default lockfile patterns.
    pub ignore_patterns: Vec<String>,
    /// Free-form request text. `None` = [`prompts::DEFAULT_REQUEST`].
    pub request: Option<String>,
}

impl DraftRequest {
    fn request_text(&self) -> &str {
        self.request
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(prompts::DEFAULT_REQUEST)
    }

    fn diff_args(&self) -> MakeDiffArgs {
        MakeDiffArgs {
            from_ref: self.from_ref.clone(),
            to_ref: self.to_ref.clone(),
            ignore_patterns: Some(self.ignore_patterns.clone()),
        }
    }
}

/// The three text inputs of a direct-mode prompt.
#[derive(Debug, Clone)]
pub struct DraftContext {
    pub instructions: String,
    pub style_example: String,
    pub diff_report: String,
}

impl DraftContext {
    pub fn to_prompt(&self, request: &str) -> String {
        prompts::assemble_prompt(
            &self.instructions,
            &self.style_example,
            &self.diff_report,
            request,
        )
    }
}

/// Load the instruction text configured for this run.
pub fn load_instructions(config: &NotesConfig) -> Result<String> {
    let path = config.instructions_path.as_deref();
    prompts::load_instructions(path).with_context(|| {
        format!(
            "Failed to read instructions from {}",
            path.map(|p| p.display().to_string()).unwrap_or_default()
        )
    })
}

/// Run the diff and reference tools and load the instructions.
pub async fn gather_context(config: &NotesConfig, req: &DraftRequest) -> Result<DraftContext> {
    let instructions = load_instructions(config)?;

    let style_example = ReleaseNotesTool::new(&config.reference_path)
        .with_max_output_chars(config.max_reference_chars)
        .call(GetReleaseNotesArgs::default())
        .await
        .context("Failed to load the style reference")?;

    let diff_report = MakeDiffTool::new(&config.repo_path)
        .with_max_diff_chars(config.max_diff_chars)
        .call(req.diff_args())
        .await
        .context("Failed to build the diff report")?;

    info!(
        instructions_chars = instructions.len(),
        style_chars = style_example.len(),
        diff_chars = diff_report.len(),
        "Gathered drafting context"
    );

    Ok(DraftContext {
        instructions,
        style_example,
        diff_report,
    })
}

/// Direct mode: gather everything, then one prompt.
pub async fn draft_direct(
    config: &NotesConfig,
    req: &DraftRequest,
    drafter: &dyn Drafter,
) -> Result<ReleaseNotesDraft> {
    let context = gather_context(config, req).await?;
    let prompt = context.to_prompt(req.request_text());
    finish(drafter, &prompt, config.timeout_secs).await
}

/// Agentic mode: the drafter's agent carries the instructions and tools;
/// the prompt only states the request and any explicit range.
pub async fn draft_agentic(
    config: &NotesConfig,
    req: &DraftRequest,
    drafter: &dyn Drafter,
) -> Result<ReleaseNotesDraft> {
    finish(drafter, &agentic_prompt(req), config.timeout_secs).await
}

/// Prompt the drafter under the wall-clock budget and normalize its answer.
/// `timeout_secs == 0` waits indefinitely.
async fn finish(drafter: &dyn Drafter, prompt: &str, timeout_secs: u64) -> Result<ReleaseNotesDraft> {
    info!(
        drafter = drafter.name(),
        prompt_version = prompts::PROMPT_VERSION,
        "Drafting release notes"
    );
    // Rig does not bound wall-clock time of a multi-turn prompt.
    let answer = if timeout_secs == 0 {
        drafter.draft(prompt).await
    } else {
        match tokio::time::timeout(Duration::from_secs(timeout_secs), drafter.draft(prompt)).await {
            Ok(answer) => answer,
            Err(_) => Err(DraftError::Timeout {
                seconds: timeout_secs,
            }),
        }
    };
    let raw = answer.context("Release notes generation failed")?;
    let draft = ReleaseNotesDraft::from_model_output(&raw)?;
    info!(chars = draft.content.len(), "Draft ready");
    Ok(draft)
}

/// User prompt for the tool-calling agent.
pub fn agentic_prompt(req: &DraftRequest) -> String {
    let mut prompt = req.request_text().to_string();
    match (&req.from_ref, &req.to_ref) {
        (None, None) => {}
        (from, to) => {
            prompt.push_str(&format!(
                "\n\nUse `make_diff` with from_ref `{}` and to_ref `{}`.",
                from.as_deref().unwrap_or("<default>"),
                to.as_deref().unwrap_or("<default>")
            ));
        }
    }
    if !req.ignore_patterns.is_empty() {
        prompt.push_str(&format!(
            "\nPass ignore_patterns: {}.",
            req.ignore_patterns.join(", ")
        ));
    }
    prompt
}

/// Write the draft to `<dir>/release-notes-<YYYYmmdd-HHMMSS>.md`.
pub fn save_draft(content: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("release-notes-{timestamp}.md"));
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write draft: {}", path.display()))?;
    Ok(path)
}
