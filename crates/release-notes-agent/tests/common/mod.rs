//! Temporary git repositories for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run git in `dir`, panicking with stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_AUTHOR_DATE", "2024-05-01T12:00:00+00:00")
        .env("GIT_COMMITTER_DATE", "2024-05-01T12:00:00+00:00")
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Empty repository with identity configured and HEAD on `branch`.
pub fn init_repo(branch: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(
        dir.path(),
        &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")],
    );
    git(dir.path(), &["config", "user.email", "test@test.com"]);
    git(dir.path(), &["config", "user.name", "Test"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    dir
}

/// Write `files`, stage everything and commit. Returns the new SHA.
pub fn commit(dir: &Path, files: &[(&str, &str)], message: &str) -> String {
    for (path, content) in files {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Two-commit repository: `main` has README.md, `develop` adds `foo.txt`
/// plus a lockfile that the default ignore list drops.
pub struct TwoCommitRepo {
    pub dir: TempDir,
    pub first: String,
    pub second: String,
}

impl TwoCommitRepo {
    pub fn new() -> Self {
        let dir = init_repo("main");
        let first = commit(dir.path(), &[("README.md", "# Demo\n")], "Initial commit");
        git(dir.path(), &["checkout", "-q", "-b", "develop"]);
        let second = commit(
            dir.path(),
            &[
                ("foo.txt", "hello foo\n"),
                ("package-lock.json", "{\"lockfileVersion\": 3}\n"),
            ],
            "Add foo.txt for greeting support",
        );
        Self { dir, first, second }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// A release-notes document with a heading and bulleted changes.
pub const STYLE_EXAMPLE: &str = "\
# Release Notes

## Version 1.4

This release focuses on onboarding improvements.

- Added a guided setup wizard.
- Fixed a bug that only applied when teams were enabled.

## Version 1.3

- Upgraded dependencies.
";
