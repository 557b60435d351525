//! repo-mirror - Bulk git repository mirroring
//!
//! Reads a list of source repositories and mirrors each one into a target
//! group: a full mirror clone (or an incremental fetch of a kept mirror),
//! followed by a force-push of every ref to `<target_group>/<name>.git`.
//!
//! ## Modules
//!
//! - [`config`]: Run configuration (CLI flags and optional YAML file)
//! - [`logging`]: Console and log-file output
//! - [`repo_list`]: Repository list loading and filtering
//! - [`repo`]: Per-repository names and locations
//! - [`git`]: Git operations
//! - [`store`]: Mirror working directory management
//! - [`sync`]: The per-repository mirror state machine
//! - [`report`]: Run accounting

pub mod config;
pub mod git;
pub mod logging;
pub mod repo;
pub mod repo_list;
pub mod report;
pub mod store;
pub mod sync;

pub use config::Config;
pub use git::{GitCli, MirrorGit};
pub use repo::RepoSpec;
pub use report::{Acquired, FailedPhase, RepoOutcome, RunReport};
pub use store::MirrorStore;
pub use sync::SyncEngine;
