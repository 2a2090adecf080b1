//! Live model tests: require a reachable OpenAI-compatible endpoint.
//!
//! All tests are `#[ignore]`. Run with
//! `cargo test -p release-notes-agent -- --ignored` after exporting
//! `RELNOTES_API_URL`, `RELNOTES_API_KEY` and optionally `RELNOTES_MODEL`.

mod common;

use rig::completion::Prompt;
use release_notes_agent::agents::AgentFactory;
use release_notes_agent::config::{check_endpoint, ConfigOverrides, NotesConfig};
use release_notes_agent::pipeline::{self, DraftRequest};

use common::{TwoCommitRepo, STYLE_EXAMPLE};

/// Config for a fresh two-commit repository and a written style reference.
fn live_config(repo: &TwoCommitRepo, notes_dir: &tempfile::TempDir) -> NotesConfig {
    let reference = notes_dir.path().join("release-notes.md");
    std::fs::write(&reference, STYLE_EXAMPLE).unwrap();
    NotesConfig::from_env(&ConfigOverrides {
        repo_path: Some(repo.path().to_path_buf()),
        reference_path: Some(reference),
        model: None,
    })
    .expect("config from environment")
}

// ---------------------------------------------------------------------------
// Endpoint reachability
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore]
async fn test_endpoint_reachable() {
    let repo = TwoCommitRepo::new();
    let notes_dir = tempfile::tempdir().unwrap();
    let config = live_config(&repo, &notes_dir);
    let ok = check_endpoint(&config.endpoint.url, Some(&config.endpoint.api_key)).await;
    assert!(ok, "Endpoint at {} is not reachable", config.endpoint.url);
}

// ---------------------------------------------------------------------------
// Direct writer
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore]
async fn test_direct_writer_responds() {
    let repo = TwoCommitRepo::new();
    let notes_dir = tempfile::tempdir().unwrap();
    let config = live_config(&repo, &notes_dir);
    let factory = AgentFactory::new(&config).expect("factory");

    let response = factory
        .build_direct_writer()
        .prompt("Reply with a markdown heading `## Test` followed by one bullet.")
        .await
        .expect("writer should respond");
    assert!(response.contains('#'), "got: {response}");
}

#[tokio::test]
#[ignore]
async fn test_direct_draft_mentions_changed_file() {
    let repo = TwoCommitRepo::new();
    let notes_dir = tempfile::tempdir().unwrap();
    let config = live_config(&repo, &notes_dir);
    let factory = AgentFactory::new(&config).expect("factory");

    let req = DraftRequest {
        from_ref: Some(repo.first.clone()),
        to_ref: Some(repo.second.clone()),
        ..Default::default()
    };
    let draft = pipeline::draft_direct(&config, &req, &factory.direct_drafter())
        .await
        .expect("draft");

    assert!(draft.has_heading_and_list(), "draft:\n{}", draft.content);
    let lower = draft.content.to_lowercase();
    assert!(
        lower.contains("foo") || lower.contains("greeting"),
        "draft should describe the added file:\n{}",
        draft.content
    );
}

// ---------------------------------------------------------------------------
// Tool-calling writer
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore]
async fn test_agentic_draft_uses_tools() {
    let repo = TwoCommitRepo::new();
    let notes_dir = tempfile::tempdir().unwrap();
    let config = live_config(&repo, &notes_dir);
    let factory = AgentFactory::new(&config).expect("factory");
    let instructions = pipeline::load_instructions(&config).expect("instructions");

    let draft = pipeline::draft_agentic(
        &config,
        &DraftRequest::default(),
        &factory.tool_drafter(&instructions),
    )
    .await
    .expect("draft");

    assert!(!draft.content.is_empty());
    assert!(
        draft.content.to_lowercase().contains("foo"),
        "draft should reflect the make_diff output:\n{}",
        draft.content
    );
}
