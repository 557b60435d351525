//! Sync Engine - Drives each repository through acquire, push and cleanup
//!
//! Repositories are processed one at a time in list order. Each one moves
//! through a small state machine:
//!
//! ```text
//! Acquire (clone with retries | update) -> Push -> Done
//!                                   \-------------> Done (failed)
//! ```
//!
//! Cleanup runs after `Done` whichever branch was taken. A failure in one
//! repository is recorded in the [`RunReport`] and the loop moves on.

use crate::config::Config;
use crate::git::{GitCli, MirrorGit};
use crate::report::{Acquired, FailedPhase, RepoOutcome, RunReport};
use crate::repo::RepoSpec;
use crate::store::MirrorStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Per-repository progress
#[derive(Debug)]
enum Phase {
    Acquire,
    Push(Acquired),
    Done(RepoOutcome),
}

/// Sequential mirror engine over a list of source repositories
pub struct SyncEngine {
    config: Arc<Config>,
    git: Box<dyn MirrorGit>,
    store: MirrorStore,
}

impl SyncEngine {
    /// Create an engine that shells out to the system `git`
    pub fn new(config: Config) -> Self {
        let git = GitCli::from_config(&config);
        Self::with_git(config, Box::new(git))
    }

    /// Create an engine on top of any git backend
    pub fn with_git(config: Config, git: Box<dyn MirrorGit>) -> Self {
        let store = MirrorStore::new(config.temp_root.clone(), config.dry_run);
        Self {
            config: Arc::new(config),
            git,
            store,
        }
    }

    /// Mirror every source in order and return the run's accounting
    ///
    /// Nothing here aborts the run: every failure, including an unusable
    /// working directory, is recorded against the repository it hit.
    pub async fn run(&self, sources: &[String]) -> RunReport {
        let start_time = Instant::now();

        if self.config.dry_run {
            info!("Dry run: no repository will be cloned, fetched or pushed");
        }
        info!(
            "Mirroring {} repositories to {} (incremental: {}, retries: {})",
            sources.len(),
            self.config.target_group,
            self.config.incremental,
            self.config.retry_count
        );

        let mut root_ready = false;
        let mut report = RunReport::new();
        for (index, source) in sources.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, sources.len(), source);

            if !root_ready {
                match self.store.ensure_root().await {
                    Ok(()) => root_ready = true,
                    Err(e) => {
                        error!("Skipping {}: {:#}", source, e);
                        report.record(
                            source,
                            RepoOutcome::Failed {
                                phase: FailedPhase::Workspace,
                            },
                        );
                        continue;
                    }
                }
            }

            let outcome = self.mirror_one(source).await;
            report.record(source, outcome);
        }

        debug!("Run took {:.2}s", start_time.elapsed().as_secs_f64());
        report
    }

    /// Process a single list entry to completion
    pub async fn mirror_one(&self, source: &str) -> RepoOutcome {
        let spec = match RepoSpec::new(source, self.store.root(), &self.config.target_group) {
            Ok(spec) => spec,
            Err(e) if self.config.dry_run => {
                warn!("[dry-run] Would mirror {}, but {:#}", source, e);
                return RepoOutcome::Mirrored {
                    acquired: Acquired::Cloned { attempts: 1 },
                };
            }
            Err(e) => {
                error!("{:#}", e);
                return RepoOutcome::Failed {
                    phase: FailedPhase::Resolve,
                };
            }
        };

        let mut phase = Phase::Acquire;
        let outcome = loop {
            debug!("{}: {:?}", spec.name, phase);
            phase = match phase {
                Phase::Acquire => match self.acquire(&spec).await {
                    Ok(acquired) => Phase::Push(acquired),
                    Err(failed) => Phase::Done(RepoOutcome::Failed { phase: failed }),
                },
                Phase::Push(acquired) => {
                    if self.push(&spec).await {
                        Phase::Done(RepoOutcome::Mirrored { acquired })
                    } else {
                        Phase::Done(RepoOutcome::Failed {
                            phase: FailedPhase::Push,
                        })
                    }
                }
                Phase::Done(outcome) => break outcome,
            };
        };

        self.cleanup(&spec).await;

        if outcome.is_success() {
            if self.config.dry_run {
                info!("[dry-run] Would mirror {} -> {}", spec.source, spec.target_url);
            } else {
                info!("Mirrored {} -> {}", spec.source, spec.target_url);
            }
        }
        outcome
    }

    /// Choose update or clone for the repository and run it
    async fn acquire(&self, spec: &RepoSpec) -> Result<Acquired, FailedPhase> {
        let exists = self.store.exists(&spec.destination);

        if self.config.incremental && exists {
            return if self.update(spec).await {
                Ok(Acquired::Updated)
            } else {
                Err(FailedPhase::Update)
            };
        }

        if exists {
            debug!("Removing stale mirror {}", spec.destination.display());
            self.store.purge(&spec.destination).await;
        }

        match self.clone_with_retry(spec).await {
            Some(attempts) => Ok(Acquired::Cloned { attempts }),
            None => {
                // Never leave a half-written mirror for a later incremental run
                if self.config.incremental {
                    self.store.purge(&spec.destination).await;
                }
                Err(FailedPhase::Clone)
            }
        }
    }

    /// Clone with up to `retry_count + 1` attempts; returns the attempt that succeeded
    async fn clone_with_retry(&self, spec: &RepoSpec) -> Option<u32> {
        if self.config.dry_run {
            info!(
                "[dry-run] Would clone {} into {}",
                spec.source,
                spec.destination.display()
            );
            return Some(1);
        }

        let attempts = self.config.clone_attempts();
        for attempt in 1..=attempts {
            if attempt > 1 {
                self.store.purge(&spec.destination).await;
            }

            info!(
                "Cloning {} into {} (attempt {}/{})",
                spec.source,
                spec.destination.display(),
                attempt,
                attempts
            );
            match self.git.clone_mirror(&spec.source, &spec.destination).await {
                Ok(()) => return Some(attempt),
                Err(e) => warn!(
                    "Clone attempt {}/{} for {} failed: {:#}",
                    attempt, attempts, spec.source, e
                ),
            }
        }

        error!("Failed to clone {} after {} attempts", spec.source, attempts);
        None
    }

    /// Single fetch-and-prune into the existing mirror
    async fn update(&self, spec: &RepoSpec) -> bool {
        if self.config.dry_run {
            info!("[dry-run] Would update {}", spec.destination.display());
            return true;
        }

        info!("Updating existing mirror {}", spec.destination.display());
        match self.git.update_mirror(&spec.destination).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to update {}: {:#}", spec.destination.display(), e);
                false
            }
        }
    }

    /// Single force-push of all refs to the target
    async fn push(&self, spec: &RepoSpec) -> bool {
        if self.config.dry_run {
            info!("[dry-run] Would push {} to {}", spec.name, spec.target_url);
            return true;
        }

        info!("Pushing {} to {}", spec.name, spec.target_url);
        match self.git.push_mirror(&spec.destination, &spec.target_url).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to push {} to {}: {:#}", spec.name, spec.target_url, e);
                false
            }
        }
    }

    async fn cleanup(&self, spec: &RepoSpec) {
        if self.config.incremental {
            debug!("Keeping {} for the next incremental run", spec.destination.display());
            return;
        }
        self.store.purge(&spec.destination).await;
    }

    /// Get configuration for external inspection
    pub fn config(&self) -> &Config {
        &self.config
    }
}
