//! Git diff reports between two references.
//!
//! Shells out to `git` inside the target repository (read-only commands
//! only) and renders the commit range, the commit list, the changed files
//! and the full patch as one markdown document for the drafting prompt.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, warn};

/// Paths skipped by default: lockfiles dominate diffs without telling the
/// reader anything about the release.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["uv.lock", "package-lock.json"];

/// Result type alias for diff report operations.
pub type DiffResult<T> = Result<T, DiffError>;

/// Errors produced while building a diff report.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The configured path is missing or is not inside a git work tree.
    #[error("not a git repository: {}", path.display())]
    InvalidRepository { path: PathBuf },

    /// A branch, tag or commit could not be resolved to a commit.
    #[error("cannot resolve git reference `{reference}`: {detail}")]
    UnresolvedReference { reference: String, detail: String },

    /// Any other git command failure.
    #[error("`git {command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    /// The git binary could not be spawned.
    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

/// Change kind reported by `git diff --name-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    /// Any other status letter (type change, unmerged, ...), kept verbatim.
    Other(char),
}

impl FileStatus {
    pub fn from_code(code: char) -> Self {
        match code {
            'A' => Self::Added,
            'M' => Self::Modified,
            'D' => Self::Deleted,
            'R' => Self::Renamed,
            'C' => Self::Copied,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "Added"),
            Self::Modified => write!(f, "Modified"),
            Self::Deleted => write!(f, "Deleted"),
            Self::Renamed => write!(f, "Renamed"),
            Self::Copied => write!(f, "Copied"),
            Self::Other(c) => write!(f, "{c}"),
        }
    }
}

/// A single changed path between the two references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub status: FileStatus,
    /// Path in the new tree. Renames and copies render as `old -> new`.
    pub path: String,
}

/// Subject line and author date of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub date: String,
}

impl CommitInfo {
    pub fn short_sha(&self) -> &str {
        short_sha(&self.sha)
    }
}

/// The requested (or defaulted) pointers plus the commits they resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRange {
    pub from_label: String,
    pub to_label: String,
    pub from_sha: String,
    pub to_sha: String,
}

impl DiffRange {
    /// `from..to` revision range syntax.
    pub fn revspec(&self) -> String {
        format!("{}..{}", self.from_sha, self.to_sha)
    }

    pub fn is_empty(&self) -> bool {
        self.from_sha == self.to_sha
    }
}

/// Knobs for report generation.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Substring patterns; matching paths are dropped from the file list
    /// and from the full diff.
    pub ignore_patterns: Vec<String>,
    /// Cap on the full-diff body in characters. 0 = unlimited.
    pub max_diff_chars: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            max_diff_chars: 0,
        }
    }
}

impl DiffOptions {
    /// Replace the ignore list, falling back to the defaults when `patterns`
    /// is empty.
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        if !patterns.is_empty() {
            self.ignore_patterns = patterns;
        }
        self
    }

    pub fn with_max_diff_chars(mut self, max_diff_chars: usize) -> Self {
        self.max_diff_chars = max_diff_chars;
        self
    }
}

/// Read-only handle on a git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    repo_dir: PathBuf,
}

impl GitRepo {
    /// Open a repository, failing if `repo_dir` is not inside a git work tree.
    pub fn open(repo_dir: impl AsRef<Path>) -> DiffResult<Self> {
        let repo_dir = repo_dir.as_ref().to_path_buf();
        if !repo_dir.is_dir() {
            return Err(DiffError::InvalidRepository { path: repo_dir });
        }

        let repo = Self { repo_dir };
        repo.run_git(&["rev-parse", "--git-dir"])
            .map_err(|_| DiffError::InvalidRepository {
                path: repo.repo_dir.clone(),
            })?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.repo_dir
    }

    /// Run git command and return trimmed stdout.
    fn run_git(&self, args: &[&str]) -> DiffResult<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DiffError::Git {
                command: args.join(" "),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Whether `reference` names a commit in this repository.
    pub fn verifies(&self, reference: &str) -> bool {
        self.resolve(reference).is_ok()
    }

    /// Resolve a branch, tag or commit-ish to a full commit SHA.
    pub fn resolve(&self, reference: &str) -> DiffResult<String> {
        // Leading dashes would be parsed as options by rev-parse.
        if reference.is_empty() || reference.starts_with('-') {
            return Err(DiffError::UnresolvedReference {
                reference: reference.to_string(),
                detail: "not a valid revision name".into(),
            });
        }

        let commitish = format!("{reference}^{{commit}}");
        self.run_git(&["rev-parse", "--verify", &commitish])
            .map_err(|e| match e {
                DiffError::Git { stderr, .. } => DiffError::UnresolvedReference {
                    reference: reference.to_string(),
                    detail: if stderr.is_empty() {
                        "unknown revision".into()
                    } else {
                        stderr
                    },
                },
                other => other,
            })
    }

    /// Start of the range when none is given: `main`, then `develop`, then
    /// the nearest tag before `HEAD^`, then `main` again so the failure
    /// names a sensible ref.
    pub fn default_from(&self) -> String {
        if self.verifies("main") {
            return "main".into();
        }
        if self.verifies("develop") {
            return "develop".into();
        }
        match self.run_git(&["describe", "--tags", "--abbrev=0", "HEAD^"]) {
            Ok(tag) if !tag.is_empty() => tag,
            _ => "main".into(),
        }
    }

    /// End of the range when none is given: `develop`, then `main`, then `HEAD`.
    pub fn default_to(&self) -> String {
        if self.verifies("develop") {
            "develop".into()
        } else if self.verifies("main") {
            "main".into()
        } else {
            "HEAD".into()
        }
    }

    /// Apply defaults to missing pointers and resolve both ends.
    pub fn resolve_range(&self, from: Option<&str>, to: Option<&str>) -> DiffResult<DiffRange> {
        let from_label = match from.filter(|s| !s.trim().is_empty()) {
            Some(f) => f.trim().to_string(),
            None => self.default_from(),
        };
        let to_label = match to.filter(|s| !s.trim().is_empty()) {
            Some(t) => t.trim().to_string(),
            None => self.default_to(),
        };

        let from_sha = self.resolve(&from_label)?;
        debug!(pointer = %from_label, sha = %from_sha, "Resolved 'from' pointer");
        let to_sha = self.resolve(&to_label)?;
        debug!(pointer = %to_label, sha = %to_sha, "Resolved 'to' pointer");

        let range = DiffRange {
            from_label,
            to_label,
            from_sha,
            to_sha,
        };
        if range.is_empty() {
            warn!(
                from = %range.from_label,
                to = %range.to_label,
                "'from' and 'to' point to the same commit; the report will be empty"
            );
        }
        Ok(range)
    }

    pub fn commit_info(&self, sha: &str) -> DiffResult<CommitInfo> {
        // Date first: stdout is trimmed, so an empty subject must come last.
        let out = self.run_git(&["log", "-1", "--pretty=format:%ai%n%s", sha])?;
        let (date, message) = out.split_once('\n').unwrap_or((out.as_str(), ""));
        Ok(CommitInfo {
            sha: sha.to_string(),
            message: message.trim().to_string(),
            date: date.trim().to_string(),
        })
    }

    /// Commits reachable from `to` but not from `from`, newest first.
    pub fn commit_list(&self, range: &DiffRange) -> DiffResult<Vec<CommitInfo>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let out = self.run_git(&["log", "--pretty=format:%H|%s|%ai", &range.revspec()])?;
        Ok(out.lines().filter_map(parse_commit_line).collect())
    }

    pub fn changed_files(
        &self,
        range: &DiffRange,
        ignore_patterns: &[String],
    ) -> DiffResult<Vec<ChangedFile>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let out = self.run_git(&["diff", "--name-status", &range.revspec()])?;
        Ok(parse_name_status(&out, ignore_patterns))
    }

    /// Full unified diff with blocks for ignored paths removed.
    pub fn full_diff(&self, range: &DiffRange, ignore_patterns: &[String]) -> DiffResult<String> {
        if range.is_empty() {
            return Ok(String::new());
        }
        let diff = self.run_git(&["diff", &range.revspec()])?;
        Ok(filter_diff_blocks(&diff, ignore_patterns))
    }

    /// Resolve the range and collect everything the report needs.
    pub fn report(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        options: &DiffOptions,
    ) -> DiffResult<DiffReport> {
        let range = self.resolve_range(from, to)?;
        let from_info = self.commit_info(&range.from_sha)?;
        let to_info = self.commit_info(&range.to_sha)?;
        let commits = self.commit_list(&range)?;
        let files = self.changed_files(&range, &options.ignore_patterns)?;
        let full_diff = truncate_diff(
            &self.full_diff(&range, &options.ignore_patterns)?,
            options.max_diff_chars,
        );

        debug!(
            commits = commits.len(),
            files = files.len(),
            diff_bytes = full_diff.len(),
            "Collected diff report"
        );

        Ok(DiffReport {
            range,
            from_info,
            to_info,
            commits,
            files,
            full_diff,
        })
    }
}

/// Everything known about the changes between two references.
#[derive(Debug, Clone)]
pub struct DiffReport {
    pub range: DiffRange,
    pub from_info: CommitInfo,
    pub to_info: CommitInfo,
    pub commits: Vec<CommitInfo>,
    pub files: Vec<ChangedFile>,
    pub full_diff: String,
}

impl DiffReport {
    /// Render the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            "# Git Diff Report".to_string(),
            String::new(),
            "## Commit Range".to_string(),
            format!(
                "- **From**: `{}` ({})",
                self.from_info.short_sha(),
                self.range.from_label
            ),
            format!("  - Message: {}", self.from_info.message),
            format!("  - Date: {}", self.from_info.date),
            format!(
                "- **To**: `{}` ({})",
                self.to_info.short_sha(),
                self.range.to_label
            ),
            format!("  - Message: {}", self.to_info.message),
            format!("  - Date: {}", self.to_info.date),
            String::new(),
            "## Commits".to_string(),
            String::new(),
        ];

        if self.commits.is_empty() {
            lines.push("*No commits between the specified range.*".into());
        } else {
            for commit in &self.commits {
                lines.push(format!(
                    "- `{}` - {} ({})",
                    commit.short_sha(),
                    commit.message,
                    commit.date
                ));
            }
        }
        lines.push(String::new());

        lines.push("## Changed Files".into());
        lines.push(String::new());
        if self.files.is_empty() {
            lines.push("*No files changed.*".into());
        } else {
            for file in &self.files {
                lines.push(format!("- **{}**: `{}`", file.status, file.path));
            }
        }
        lines.push(String::new());

        lines.push("## Full Diff".into());
        lines.push(String::new());
        lines.push("```diff".into());
        lines.push(self.full_diff.clone());
        lines.push("```".into());

        lines.join("\n")
    }

    /// File name used when the report is written to disk:
    /// `diff_<timestamp>_<from7>_to_<to7>.md`.
    pub fn file_name(&self, timestamp: &str) -> String {
        format!(
            "diff_{timestamp}_{}_to_{}.md",
            short_sha(&self.range.from_sha),
            short_sha(&self.range.to_sha)
        )
    }
}

/// Build the markdown report for `repo_dir` in one call.
pub fn make_diff_string(
    repo_dir: &Path,
    from: Option<&str>,
    to: Option<&str>,
    options: &DiffOptions,
) -> DiffResult<String> {
    let repo = GitRepo::open(repo_dir)?;
    Ok(repo.report(from, to, options)?.to_markdown())
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

fn is_ignored(path: &str, ignore_patterns: &[String]) -> bool {
    ignore_patterns
        .iter()
        .any(|pattern| !pattern.is_empty() && path.contains(pattern.as_str()))
}

/// Parse one `%H|%s|%ai` line. The subject may itself contain `|`.
fn parse_commit_line(line: &str) -> Option<CommitInfo> {
    let (sha, rest) = line.split_once('|')?;
    let (message, date) = rest.rsplit_once('|')?;
    Some(CommitInfo {
        sha: sha.to_string(),
        message: message.to_string(),
        date: date.to_string(),
    })
}

/// Parse `git diff --name-status` output, dropping ignored paths.
///
/// Rename and copy lines carry a similarity score and two paths
/// (`R100\told\tnew`); they render as `old -> new`.
fn parse_name_status(output: &str, ignore_patterns: &[String]) -> Vec<ChangedFile> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let code = fields.next()?.chars().next()?;
            let paths: Vec<&str> = fields.map(str::trim).filter(|p| !p.is_empty()).collect();
            if paths.is_empty() {
                return None;
            }
            let path = paths.join(" -> ");
            if is_ignored(&path, ignore_patterns) {
                return None;
            }
            Some(ChangedFile {
                status: FileStatus::from_code(code),
                path,
            })
        })
        .collect()
}

/// Drop whole `diff --git` blocks whose path matches an ignore pattern.
fn filter_diff_blocks(diff: &str, ignore_patterns: &[String]) -> String {
    if diff.is_empty() || ignore_patterns.is_empty() {
        return diff.to_string();
    }

    let mut kept = Vec::new();
    let mut skip_block = false;
    for line in diff.lines() {
        if line.starts_with("diff --git") {
            let file_path = if let Some((_, b)) = line.rsplit_once(" b/") {
                b
            } else if let Some((_, a)) = line.rsplit_once(" a/") {
                a
            } else {
                line
            };
            skip_block = is_ignored(file_path, ignore_patterns);
        }
        if !skip_block {
            kept.push(line);
        }
    }
    kept.join("\n")
}

/// Cut `diff` at a line boundary so it fits in `max_chars`, appending a
/// marker with the number of dropped lines. 0 = unlimited.
fn truncate_diff(diff: &str, max_chars: usize) -> String {
    if max_chars == 0 || diff.chars().count() <= max_chars {
        return diff.to_string();
    }

    let lines: Vec<&str> = diff.lines().collect();
    let mut out = String::with_capacity(max_chars + 64);
    let mut used = 0;
    let mut included = 0;
    for line in &lines {
        let cost = line.chars().count() + 1;
        if used + cost > max_chars {
            break;
        }
        out.push_str(line);
        out.push('\n');
        used += cost;
        included += 1;
    }
    let remaining = lines.len() - included;
    out.push_str(&format!("[...{remaining} more diff lines truncated...]"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_file_status_labels() {
        assert_eq!(FileStatus::from_code('A').to_string(), "Added");
        assert_eq!(FileStatus::from_code('D').to_string(), "Deleted");
        assert_eq!(FileStatus::from_code('T').to_string(), "T");
    }

    #[test]
    fn test_parse_commit_line_pipe_in_subject() {
        let c = parse_commit_line("abc123|fix a | b parsing|2024-01-02 10:00:00 +0000").unwrap();
        assert_eq!(c.sha, "abc123");
        assert_eq!(c.message, "fix a | b parsing");
        assert_eq!(c.date, "2024-01-02 10:00:00 +0000");
    }

    #[test]
    fn test_parse_commit_line_malformed() {
        assert!(parse_commit_line("no separators here").is_none());
    }

    #[test]
    fn test_parse_name_status_with_ignores_and_renames() {
        let out = "A\tfoo.txt\nM\tuv.lock\nR087\told/name.rs\tnew/name.rs\nD\tgone.md";
        let files = parse_name_status(out, &patterns(&["uv.lock"]));
        assert_eq!(files.len(), 3);
        assert_eq!(files[0].status, FileStatus::Added);
        assert_eq!(files[0].path, "foo.txt");
        assert_eq!(files[1].status, FileStatus::Renamed);
        assert_eq!(files[1].path, "old/name.rs -> new/name.rs");
        assert_eq!(files[2].status, FileStatus::Deleted);
    }

    #[test]
    fn test_filter_diff_blocks_drops_ignored_file() {
        let diff = "diff --git a/package-lock.json b/package-lock.json\n\
                    +noise\n\
                    diff --git a/src/app.rs b/src/app.rs\n\
                    +fn app() {}";
        let filtered = filter_diff_blocks(diff, &patterns(&["package-lock.json"]));
        assert!(!filtered.contains("noise"));
        assert!(filtered.contains("src/app.rs"));
        assert!(filtered.contains("+fn app() {}"));
    }

    #[test]
    fn test_filter_diff_blocks_no_patterns_is_identity() {
        let diff = "diff --git a/x b/x\n+1";
        assert_eq!(filter_diff_blocks(diff, &[]), diff);
    }

    #[test]
    fn test_truncate_diff_marks_remaining_lines() {
        let diff = "line one\nline two\nline three\nline four";
        let out = truncate_diff(diff, 20);
        assert!(out.starts_with("line one\nline two\n"));
        assert!(out.ends_with("[...2 more diff lines truncated...]"));
    }

    #[test]
    fn test_truncate_diff_counts_chars_not_bytes() {
        // 8 chars, 14 bytes per line.
        let diff = "+ äöüßéè\n+ äöüßéè\n+ äöüßéè";
        let out = truncate_diff(diff, 20);
        assert!(out.starts_with("+ äöüßéè\n+ äöüßéè\n"));
        assert!(out.ends_with("[...1 more diff lines truncated...]"));
        assert_eq!(truncate_diff(diff, 29), diff);
    }

    #[test]
    fn test_truncate_diff_unlimited() {
        assert_eq!(truncate_diff("abc", 0), "abc");
    }

    #[test]
    fn test_with_ignore_patterns_empty_keeps_defaults() {
        let opts = DiffOptions::default().with_ignore_patterns(vec![]);
        assert_eq!(opts.ignore_patterns, patterns(DEFAULT_IGNORE_PATTERNS));
    }

    #[test]
    fn test_markdown_empty_sections() {
        let info = CommitInfo {
            sha: "0123456789abcdef".into(),
            message: "Release 1.0".into(),
            date: "2024-05-01 12:00:00 +0000".into(),
        };
        let report = DiffReport {
            range: DiffRange {
                from_label: "main".into(),
                to_label: "main".into(),
                from_sha: info.sha.clone(),
                to_sha: info.sha.clone(),
            },
            from_info: info.clone(),
            to_info: info,
            commits: vec![],
            files: vec![],
            full_diff: String::new(),
        };
        let md = report.to_markdown();
        assert!(md.starts_with("# Git Diff Report\n\n## Commit Range\n"));
        assert!(md.contains("- **From**: `0123456` (main)"));
        assert!(md.contains("*No commits between the specified range.*"));
        assert!(md.contains("*No files changed.*"));
        assert!(md.ends_with("```diff\n\n```"));
        assert_eq!(report.file_name("20240501_120000"), "diff_20240501_120000_0123456_to_0123456.md");
    }
}
