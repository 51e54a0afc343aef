// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::job::JobId;

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Scheduler bookkeeping went out of sync. Never clamped; always fatal
    /// for the current cycle.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("cannot build a job without tasks")]
    EmptyJob,

    #[error("job {0} is already queued")]
    DuplicateJob(JobId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Faults raised by a resource pool while it is being queried or mutated.
///
/// Callers in the scheduling path treat every variant as "zero capacity
/// for this cycle", never as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("resource pool '{0}' is temporarily unavailable")]
    Unavailable(String),

    #[error("resource pool '{pool}' has no host {host}")]
    UnknownHost { pool: String, host: usize },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SchedError>;
