use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Run configuration for a mirror pass
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Text file listing one source repository per line
    #[serde(default)]
    pub repo_list: PathBuf,

    /// Base URL or path prefix the mirrors are pushed under
    #[serde(default)]
    pub target_group: String,

    /// Working directory holding the local mirror clones
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,

    /// Extra clone attempts after the first failure
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Keep mirrors between runs and fetch instead of re-cloning
    #[serde(default)]
    pub incremental: bool,

    /// Write DEBUG output (including git output) to the log file
    #[serde(default)]
    pub verbose_logs: bool,

    /// Log intended actions without touching the filesystem or network
    #[serde(default)]
    pub dry_run: bool,

    /// Persistent log, appended to on every run
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Exit non-zero when any repository failed
    #[serde(default)]
    pub fail_on_error: bool,

    /// Timeout for a single git invocation in seconds
    #[serde(default)]
    pub operation_timeout: Option<u64>,
}

fn default_temp_root() -> PathBuf {
    std::env::temp_dir().join("repo-mirror")
}
fn default_retry_count() -> u32 {
    2
}
fn default_log_file() -> PathBuf {
    PathBuf::from("./migration.log")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_list: PathBuf::new(),
            target_group: String::new(),
            temp_root: default_temp_root(),
            retry_count: default_retry_count(),
            incremental: false,
            verbose_logs: false,
            dry_run: false,
            log_file: default_log_file(),
            fail_on_error: false,
            operation_timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Expand `~` and environment variables in configured paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.repo_list = expand_path(&self.repo_list).context("Failed to expand repo_list path")?;
        self.temp_root = expand_path(&self.temp_root).context("Failed to expand temp_root path")?;
        self.log_file = expand_path(&self.log_file).context("Failed to expand log_file path")?;
        Ok(())
    }

    /// Reject configurations the run cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.repo_list.as_os_str().is_empty() {
            bail!("No repository list configured (use --repo-list)");
        }
        if self.target_group.trim().is_empty() {
            bail!("No target group configured (use --target-group)");
        }
        if self.operation_timeout == Some(0) {
            bail!("operation_timeout must be greater than zero");
        }
        Ok(())
    }

    /// Per-invocation git timeout, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        self.operation_timeout.map(Duration::from_secs)
    }

    /// Total clone attempts for one repository
    pub fn clone_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)?;
    Ok(PathBuf::from(expanded.as_ref()))
}
