use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::config::Config;

/// The three git operations a mirror run needs
///
/// Each call makes exactly one attempt. Retrying is the caller's decision.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MirrorGit: Send + Sync {
    /// Create a fresh mirror clone of `source` at `destination`
    async fn clone_mirror(&self, source: &str, destination: &Path) -> Result<()>;

    /// Fetch all refs into an existing mirror and prune stale ones
    async fn update_mirror(&self, destination: &Path) -> Result<()>;

    /// Force-push every ref of the mirror at `destination` to `target_url`
    async fn push_mirror(&self, destination: &Path, target_url: &str) -> Result<()>;
}

/// `MirrorGit` backed by the system `git` binary
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    timeout: Option<Duration>,
}

impl GitCli {
    /// Create a client; every invocation is limited to `timeout` when set
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.timeout())
    }

    fn git(dir: Option<&Path>) -> AsyncCommand {
        let mut command = AsyncCommand::new("git");
        // Fail on missing credentials instead of blocking on a prompt
        command.env("GIT_TERMINAL_PROMPT", "0").kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }
        command
    }

    async fn run(&self, mut command: AsyncCommand, description: &str) -> Result<()> {
        debug!("Running {}", description);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| anyhow!("{} timed out after {}s", description, limit.as_secs()))?,
            None => command.output().await,
        }
        .with_context(|| format!("Failed to execute {}", description))?;

        log_output(description, &output);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} failed ({}): {}",
                description,
                output.status,
                stderr.trim()
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl MirrorGit for GitCli {
    async fn clone_mirror(&self, source: &str, destination: &Path) -> Result<()> {
        let mut command = Self::git(None);
        command.args(["clone", "--mirror", source]).arg(destination);
        self.run(command, "git clone --mirror").await
    }

    async fn update_mirror(&self, destination: &Path) -> Result<()> {
        let mut command = Self::git(Some(destination));
        command.args(["remote", "update", "--prune"]);
        self.run(command, "git remote update --prune").await
    }

    async fn push_mirror(&self, destination: &Path, target_url: &str) -> Result<()> {
        let mut command = Self::git(Some(destination));
        command.args(["push", "--mirror", "--force", target_url]);
        self.run(command, "git push --mirror").await
    }
}

fn log_output(description: &str, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !stdout.trim().is_empty() {
        debug!("{} stdout:\n{}", description, stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr:\n{}", description, stderr.trim_end());
    }
}
