//! Release-notes writer agents: direct (no tools) and tool-calling.

use rig::client::CompletionClient;
use rig::providers::openai;

use crate::config::NotesConfig;
use crate::prompts;
use crate::tools::diff_tool::MakeDiffTool;
use crate::tools::reference_tool::ReleaseNotesTool;

use super::OaiAgent;

/// Build the direct writer.
///
/// NO tools: instructions, style example and diff all arrive in one prompt.
pub fn build_direct_writer(
    client: &openai::CompletionsClient,
    model: &str,
    temperature: f64,
) -> OaiAgent {
    client
        .agent(model)
        .name("direct_writer")
        .description("Drafts release notes from a prepared diff report and style example")
        .preamble(prompts::DIRECT_PREAMBLE)
        .temperature(temperature)
        .build()
}

/// Build the tool-calling writer.
///
/// Tools: make_diff, get_release_notes. Both are read-only and scoped to the
/// configured repository and reference document.
pub fn build_tool_writer(
    client: &openai::CompletionsClient,
    config: &NotesConfig,
    instructions: &str,
) -> OaiAgent {
    let preamble = prompts::agent_preamble(instructions, &config.reference_path);

    client
        .agent(&config.endpoint.model)
        .name("tool_writer")
        .description("Gathers the diff and the existing notes with tools, then drafts release notes")
        .preamble(&preamble)
        .temperature(config.temperature)
        .tool(MakeDiffTool::new(&config.repo_path).with_max_diff_chars(config.max_diff_chars))
        .tool(
            ReleaseNotesTool::new(&config.reference_path)
                .with_max_output_chars(config.max_reference_chars),
        )
        .default_max_turns(config.max_turns)
        .build()
}
