// src/sched/notification.rs

//! Job outcome notifications delivered by the execution backend.

use std::fmt;

use crate::job::Job;

/// Why a job failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The job ran and reported an error.
    Execution(String),
    /// The pool it was submitted to could not take it.
    PoolUnavailable(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Execution(msg) => write!(f, "execution error: {msg}"),
            FailureCause::PoolUnavailable(pool) => write!(f, "pool '{pool}' unavailable"),
        }
    }
}

/// Exactly one of these is delivered per submitted job.
#[derive(Debug, Clone)]
pub enum JobNotification {
    Completed(Job),
    Failed { job: Job, cause: FailureCause },
}

impl JobNotification {
    pub fn job(&self) -> &Job {
        match self {
            JobNotification::Completed(job) => job,
            JobNotification::Failed { job, .. } => job,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobNotification::Failed { .. })
    }
}
