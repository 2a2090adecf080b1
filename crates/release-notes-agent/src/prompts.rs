//! Instruction text and prompt assembly for the release-notes writer.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever instruction content
//! changes so a draft can be traced back to the text that produced it.

use std::path::Path;

/// Prompt version. Bump on any instruction content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Default user request when none is given on the command line.
pub const DEFAULT_REQUEST: &str = "Draft release notes for the latest changes in the repo.";

/// Tone and format rules shared by both drafting modes.
pub const BASE_INSTRUCTIONS: &str = "\
You are helping to generate the release notes for an upcoming version of a software project.

You will be given a diff summary containing the set of changes that have been made in this \
release. Your job is to draft the release notes in the same style used in the current \
published release notes.

Important instructions:

- Read the existing release notes to get a feel for the style.
- The general format is: 1-2 sentences describing the release followed by a detailed list of changes.
- If a feature is large you can call it out into its own section at the top, but if there \
  aren't any large features there is no need to do this.
- Wherever possible use information from the commit messages to understand the intent of the changes.
- Describe every change by its practical effect. If a change only touches templates, build \
  scaffolding or internal markup, translate it into what a user would notice, e.g. \
  \"Fixed a bug that only applied when teams were enabled\".
- For library upgrades there is no need to mention specific libraries unless explicitly called \
  out in a commit message.
- Reply with the release notes markdown only. No preamble, no commentary, no code fences.";

/// Preamble for direct mode, where all context arrives in the user prompt.
pub const DIRECT_PREAMBLE: &str = "\
You are a technical writer who drafts release notes. You are given instructions, an example \
of the project's existing release notes, and a git diff report. Follow the instructions and \
match the example's tone and structure exactly.";

/// Tool usage guidance appended to the instructions in agentic mode.
pub fn tool_guidance(reference_path: &Path) -> String {
    format!(
        "\
You can call tools to gather context:
- Use `get_release_notes` to load the current published notes for style reference. Path: {}.
- Use `make_diff` to pull the markdown-formatted git diff summary for the requested commit \
  range. Default range is main -> develop when none is provided.

Workflow: read the reference notes to mirror tone and structure, call `make_diff` to gather \
the changes, then draft updated notes. Keep the summary concise (1-2 sentences) followed by a \
detailed bullet list. Translate internal-only changes into user-facing impacts.",
        reference_path.display()
    )
}

/// Full preamble for the tool-calling agent.
pub fn agent_preamble(instructions: &str, reference_path: &Path) -> String {
    format!("{instructions}\n\n{}", tool_guidance(reference_path))
}

/// Read instruction text from `path`, or fall back to [`BASE_INSTRUCTIONS`].
pub fn load_instructions(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p),
        None => Ok(BASE_INSTRUCTIONS.to_string()),
    }
}

/// Assemble the single-shot drafting prompt.
///
/// Order is fixed: instructions, then the style example, then the diff
/// report, then the user's request.
pub fn assemble_prompt(instructions: &str, style_example: &str, diff: &str, request: &str) -> String {
    format!(
        "{instructions}

## Style example

The existing release notes below show the tone and structure to follow.

<style_example>
{style}
</style_example>

## Changes in this release

<diff_report>
{diff}
</diff_report>

## Request

{request}",
        instructions = instructions.trim(),
        style = style_example.trim(),
        diff = diff.trim(),
        request = request.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_prompt_order() {
        let prompt = assemble_prompt("INSTRUCTIONS", "STYLE", "DIFF", "REQUEST");
        let i = prompt.find("INSTRUCTIONS").unwrap();
        let s = prompt.find("STYLE").unwrap();
        let d = prompt.find("DIFF").unwrap();
        let r = prompt.find("REQUEST").unwrap();
        assert!(i < s && s < d && d < r, "sections out of order:\n{prompt}");
    }

    #[test]
    fn test_assemble_prompt_wraps_sections() {
        let prompt = assemble_prompt("i", "## 1.0\n- thing\n", "# Git Diff Report", "r");
        assert!(prompt.contains("<style_example>\n## 1.0\n- thing\n</style_example>"));
        assert!(prompt.contains("<diff_report>\n# Git Diff Report\n</diff_report>"));
    }

    #[test]
    fn test_agent_preamble_mentions_tools_and_path() {
        let preamble = agent_preamble(BASE_INSTRUCTIONS, Path::new("docs/release-notes.md"));
        assert!(preamble.starts_with(BASE_INSTRUCTIONS));
        assert!(preamble.contains("`make_diff`"));
        assert!(preamble.contains("`get_release_notes`"));
        assert!(preamble.contains("docs/release-notes.md"));
    }

    #[test]
    fn test_load_instructions_default_and_file() {
        assert_eq!(load_instructions(None).unwrap(), BASE_INSTRUCTIONS);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instructions.md");
        std::fs::write(&path, "Be brief.").unwrap();
        assert_eq!(load_instructions(Some(&path)).unwrap(), "Be brief.");
        assert!(load_instructions(Some(&dir.path().join("missing.md"))).is_err());
    }
}
