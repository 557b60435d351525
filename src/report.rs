use std::fmt;
use tracing::{error, info};

/// Phase a repository failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedPhase {
    /// No usable name could be derived from the list entry
    Resolve,
    /// The mirror working directory could not be created
    Workspace,
    /// Every clone attempt failed
    Clone,
    /// Fetching into the existing mirror failed
    Update,
    /// Force-pushing to the target failed
    Push,
}

impl fmt::Display for FailedPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            FailedPhase::Resolve => "resolve",
            FailedPhase::Workspace => "workspace",
            FailedPhase::Clone => "clone",
            FailedPhase::Update => "update",
            FailedPhase::Push => "push",
        };
        f.write_str(phase)
    }
}

/// How the local mirror was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    Cloned { attempts: u32 },
    Updated,
}

/// Final result for one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    Mirrored { acquired: Acquired },
    Failed { phase: FailedPhase },
}

impl RepoOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RepoOutcome::Mirrored { .. })
    }
}

/// Success/failure accounting for a whole run
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    succeeded: usize,
    failed: usize,
    outcomes: Vec<(String, RepoOutcome)>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Count `outcome` and remember it under the repository's name
    pub fn record(&mut self, source: &str, outcome: RepoOutcome) {
        if outcome.is_success() {
            self.record_success();
        } else {
            self.record_failure();
        }
        self.outcomes.push((source.to_string(), outcome));
    }

    /// `(succeeded, failed)`
    pub fn summary(&self) -> (usize, usize) {
        (self.succeeded, self.failed)
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Outcomes in processing order
    pub fn outcomes(&self) -> &[(String, RepoOutcome)] {
        &self.outcomes
    }

    /// Sources that failed, with the phase they failed in
    pub fn failures(&self) -> impl Iterator<Item = (&str, FailedPhase)> {
        self.outcomes.iter().filter_map(|(source, outcome)| match outcome {
            RepoOutcome::Failed { phase } => Some((source.as_str(), *phase)),
            RepoOutcome::Mirrored { .. } => None,
        })
    }

    /// Final summary line, followed by one line per failed repository
    pub fn log_summary(&self) {
        let (succeeded, failed) = self.summary();
        info!(
            "Mirror run complete: {} repositories, {} succeeded, {} failed",
            self.total(),
            succeeded,
            failed
        );
        for (source, phase) in self.failures() {
            error!("Failed to mirror {} (during {})", source, phase);
        }
    }
}
