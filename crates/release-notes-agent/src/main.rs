use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use release_notes_agent::agents::AgentFactory;
use release_notes_agent::check;
use release_notes_agent::config::{self, ConfigOverrides, DiffConfig, NotesConfig};
use release_notes_agent::diff_report::{DiffOptions, GitRepo};
use release_notes_agent::pipeline::{self, DraftMode, DraftRequest};

/// Draft release notes from a git diff in the style of existing notes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository to diff (overrides RELNOTES_REPO_PATH)
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Existing release notes used as the style reference (overrides RELNOTES_REFERENCE_PATH)
    #[arg(long, global = true)]
    reference: Option<PathBuf>,

    /// Model name (overrides RELNOTES_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draft release notes (default)
    Draft(DraftArgs),
    /// Print or save the markdown diff report without calling a model
    Diff(DiffArgs),
    /// Validate configuration, repository, reference file and endpoint
    Check,
}

#[derive(clap::Args, Debug, Default)]
struct RangeArgs {
    /// Start of the range: branch, tag or commit (default: main, develop, or last tag)
    #[arg(long)]
    from: Option<String>,

    /// End of the range (default: develop, main, or HEAD)
    #[arg(long)]
    to: Option<String>,

    /// Leave out paths containing this substring (repeatable; default: uv.lock, package-lock.json)
    #[arg(long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,
}

#[derive(clap::Args, Debug, Default)]
struct DraftArgs {
    /// Free-form request passed to the model
    request: Vec<String>,

    #[command(flatten)]
    range: RangeArgs,

    /// How the model gathers its context
    #[arg(long, value_enum, default_value_t = DraftMode::Direct)]
    mode: DraftMode,

    /// Also write the draft to this directory
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct DiffArgs {
    #[command(flatten)]
    range: RangeArgs,

    /// Write the report to this directory instead of stdout
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    config::load_dotenv();

    let args = Args::parse();
    let overrides = ConfigOverrides {
        repo_path: args.repo,
        reference_path: args.reference,
        model: args.model,
    };

    match args.command.unwrap_or_else(|| Command::Draft(DraftArgs::default())) {
        Command::Draft(draft) => run_draft(&overrides, draft).await,
        Command::Diff(diff) => run_diff(&overrides, diff).await,
        Command::Check => run_check(&overrides).await,
    }
}

async fn run_draft(overrides: &ConfigOverrides, args: DraftArgs) -> Result<()> {
    let config = NotesConfig::from_env(overrides)?;
    info!(
        model = %config.endpoint.model,
        url = %config.endpoint.url,
        repo = %config.repo_path.display(),
        mode = %args.mode,
        "Release notes agent starting"
    );

    let request = DraftRequest {
        from_ref: args.range.from,
        to_ref: args.range.to,
        ignore_patterns: args.range.ignore,
        request: (!args.request.is_empty()).then(|| args.request.join(" ")),
    };

    let factory = AgentFactory::new(&config)?;
    let draft = match args.mode {
        DraftMode::Direct => {
            let drafter = factory.direct_drafter();
            pipeline::draft_direct(&config, &request, &drafter).await?
        }
        DraftMode::Agentic => {
            let instructions = pipeline::load_instructions(&config)?;
            let drafter = factory.tool_drafter(&instructions);
            pipeline::draft_agentic(&config, &request, &drafter).await?
        }
    };

    if !draft.has_heading_and_list() {
        warn!("Draft has no markdown heading or bullet list; check the output");
    }

    println!("Response:\n");
    println!("{}", draft.content);

    if let Some(dir) = args.save_dir {
        let path = pipeline::save_draft(&draft.content, &dir)?;
        println!("\nSaved draft to: {}", path.display());
    }
    Ok(())
}

async fn run_diff(overrides: &ConfigOverrides, args: DiffArgs) -> Result<()> {
    let config = DiffConfig::from_env(overrides)?;
    let options = DiffOptions::default()
        .with_ignore_patterns(args.range.ignore)
        .with_max_diff_chars(config.max_diff_chars);
    info!(ignore = ?options.ignore_patterns, "Generating diff report");

    let (from, to) = (args.range.from, args.range.to);
    let report = tokio::task::spawn_blocking(move || {
        GitRepo::open(&config.repo_path)?.report(from.as_deref(), to.as_deref(), &options)
    })
    .await
    .context("diff task failed")??;

    let markdown = report.to_markdown();
    match args.output_dir {
        None => println!("{markdown}"),
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
            let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
            let path = dir.join(report.file_name(&timestamp));
            std::fs::write(&path, markdown)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            println!("Diff report saved to: {}", path.display());
        }
    }
    Ok(())
}

async fn run_check(overrides: &ConfigOverrides) -> Result<()> {
    let config = NotesConfig::from_env(overrides)?;
    let report = check::run_checks(&config).await;
    for result in &report.results {
        println!("{result}");
    }

    let failures = report.failures();
    if failures > 0 {
        bail!("{failures} check(s) failed");
    }
    Ok(())
}
