use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use repo_mirror::logging::init_logging;
use repo_mirror::{repo_list, Config, RunReport, SyncEngine};

/// Exit status when `--fail-on-error` is set and a repository failed
const EXIT_REPO_FAILURES: i32 = 2;

#[derive(Parser)]
#[command(name = "repo-mirror")]
#[command(about = "Mirror a list of git repositories into a target group")]
#[command(version)]
struct Cli {
    /// Text file with one source repository URL or path per line
    #[arg(short, long, required_unless_present = "config")]
    repo_list: Option<PathBuf>,

    /// Base URL or path prefix the mirrors are pushed under
    #[arg(short, long, required_unless_present = "config")]
    target_group: Option<String>,

    /// Working directory for the local mirrors
    #[arg(long)]
    temp_root: Option<PathBuf>,

    /// Extra clone attempts after a failed clone
    #[arg(long)]
    retry_count: Option<u32>,

    /// Keep local mirrors and fetch into them on the next run
    #[arg(short, long)]
    incremental: bool,

    /// Write debug output, including git output, to the log file
    #[arg(short, long)]
    verbose_logs: bool,

    /// Log what would happen without cloning, fetching or pushing
    #[arg(long)]
    dry_run: bool,

    /// Log file, appended to on every run
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Exit with status 2 when any repository failed
    #[arg(long)]
    fail_on_error: bool,

    /// Timeout in seconds for a single git invocation
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// YAML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merge flags over the configuration file (or the defaults)
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(repo_list) = self.repo_list {
            config.repo_list = repo_list;
        }
        if let Some(target_group) = self.target_group {
            config.target_group = target_group;
        }
        if let Some(temp_root) = self.temp_root {
            config.temp_root = temp_root;
        }
        if let Some(retry_count) = self.retry_count {
            config.retry_count = retry_count;
        }
        if let Some(log_file) = self.log_file {
            config.log_file = log_file;
        }
        if self.timeout.is_some() {
            config.operation_timeout = self.timeout;
        }
        config.incremental |= self.incremental;
        config.verbose_logs |= self.verbose_logs;
        config.dry_run |= self.dry_run;
        config.fail_on_error |= self.fail_on_error;

        config.expand_paths()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    init_logging(&config.log_file, config.verbose_logs)?;
    info!("Starting repo-mirror v{}", env!("CARGO_PKG_VERSION"));

    match run(config.clone()).await {
        Ok(report) => {
            report.log_summary();
            if config.fail_on_error && report.has_failures() {
                std::process::exit(EXIT_REPO_FAILURES);
            }
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

/// Validate, load the list and mirror every entry
async fn run(config: Config) -> Result<RunReport> {
    config.validate()?;

    let sources = repo_list::load(&config.repo_list)?;
    info!(
        "Loaded {} repositories from {}",
        sources.len(),
        config.repo_list.display()
    );

    let engine = SyncEngine::new(config);
    Ok(engine.run(&sources).await)
}
