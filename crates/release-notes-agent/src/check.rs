//! Preflight checks behind the `check` subcommand.

use std::fmt;

use crate::config::{check_endpoint, NotesConfig};
use crate::diff_report::GitRepo;
use crate::tools::reference_tool::ReleaseNotesTool;

/// Outcome of one preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(name: &'static str, detail: String) -> Self {
        Self {
            name,
            ok: true,
            detail,
        }
    }

    fn fail(name: &'static str, detail: String) -> Self {
        Self {
            name,
            ok: false,
            detail,
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.ok { "ok" } else { "FAIL" };
        write!(f, "{:<11} {:<5} {}", self.name, status, self.detail)
    }
}

/// All results of one `check` run, in the order they ran.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.ok).count()
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// The repository opens and the default range is reported.
pub fn check_repository(config: &NotesConfig) -> CheckResult {
    match GitRepo::open(&config.repo_path) {
        Ok(repo) => CheckResult::pass(
            "repository",
            format!(
                "{} (default range {} -> {})",
                repo.path().display(),
                repo.default_from(),
                repo.default_to()
            ),
        ),
        Err(e) => CheckResult::fail("repository", e.to_string()),
    }
}

/// The style reference is present and readable.
pub fn check_reference(config: &NotesConfig) -> CheckResult {
    match ReleaseNotesTool::new(&config.reference_path).read() {
        Ok(text) => CheckResult::pass(
            "reference",
            format!(
                "{} ({} bytes)",
                config.reference_path.display(),
                text.len()
            ),
        ),
        Err(e) => CheckResult::fail("reference", e.to_string()),
    }
}

/// Run every check. Blocking git and file work goes to the blocking pool.
pub async fn run_checks(config: &NotesConfig) -> CheckReport {
    let mut results = vec![CheckResult::pass(
        "config",
        format!(
            "model={} url={}",
            config.endpoint.model, config.endpoint.url
        ),
    )];

    let local = config.clone();
    match tokio::task::spawn_blocking(move || [check_repository(&local), check_reference(&local)])
        .await
    {
        Ok(local_results) => results.extend(local_results),
        Err(e) => results.push(CheckResult::fail("local", format!("check task failed: {e}"))),
    }

    let url = &config.endpoint.url;
    results.push(
        if check_endpoint(url, Some(&config.endpoint.api_key)).await {
            CheckResult::pass("endpoint", url.clone())
        } else {
            CheckResult::fail("endpoint", format!("{url} is not reachable"))
        },
    );

    CheckReport { results }
}
