//! Common test utilities for repo-mirror integration tests

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking on failure, and return trimmed stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Mirror Test", "-c", "user.email=mirror@test.invalid"])
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to execute git");

    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Scratch area with source repositories and a target group of bare repos
pub struct GitFixture {
    temp_dir: TempDir,
}

impl GitFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(temp_dir.path().join("sources")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("target")).unwrap();
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn target_group(&self) -> String {
        self.root().join("target").to_string_lossy().into_owned()
    }

    /// Working repository with one commit and one tag
    pub fn source_repo(&self, name: &str) -> PathBuf {
        let path = self.root().join("sources").join(name);
        std::fs::create_dir_all(&path).unwrap();
        git(&path, &["init", "-q"]);
        self.commit(&path, "README.md");
        git(&path, &["tag", "v0.1.0"]);
        path
    }

    /// Empty bare repository at `<target_group>/<name>.git`
    pub fn bare_target(&self, name: &str) -> PathBuf {
        let path = self.root().join("target").join(format!("{}.git", name));
        std::fs::create_dir_all(&path).unwrap();
        git(&path, &["init", "-q", "--bare"]);
        path
    }

    pub fn commit(&self, repo: &Path, file: &str) {
        std::fs::write(repo.join(file), format!("{}\n", file)).unwrap();
        git(repo, &["add", file]);
        git(repo, &["commit", "-q", "-m", &format!("Add {}", file)]);
    }

    pub fn head_of(&self, repo: &Path) -> String {
        git(repo, &["rev-parse", "HEAD"])
    }

    pub fn branch_of(&self, repo: &Path) -> String {
        git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn branch_tip(&self, bare: &Path, branch: &str) -> String {
        git(bare, &["rev-parse", &format!("refs/heads/{}", branch)])
    }
}
