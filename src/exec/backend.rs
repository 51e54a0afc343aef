// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! Schedulers hand placed jobs to an `ExecutionBackend` instead of running
//! anything themselves. This keeps the scheduling core free of IO and lets
//! tests swap in a fake backend that records submissions and reports
//! outcomes on its own terms.
//!
//! - [`super::simulated::SimulatedBackend`] is the implementation used by
//!   the `dagsched` binary.
//! - Tests provide their own `ExecutionBackend` (see the test-utils crate).

use crate::errors::Result;
use crate::job::Job;

/// Where jobs go once a pool has been chosen.
///
/// Contract:
/// - `submit_job` is fire-and-forget; it returns once the job is accepted.
/// - exactly one `RuntimeEvent::JobFinished` is emitted per accepted job,
///   after the call that submitted it, in any order relative to other jobs.
pub trait ExecutionBackend: Send + Sync {
    fn submit_job(&self, job: Job, pool: &str) -> Result<()>;
}
