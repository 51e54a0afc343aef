// src/engine/mod.rs

//! Orchestration engine for dagsched.
//!
//! This module ties together:
//! - the workflow (DAG + task state)
//! - the admission scheduler
//! - the main runtime event loop that reacts to:
//!   - periodic scheduling ticks
//!   - job completion / failure notifications
//!   - placement reports from the central dispatcher
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::dag::TaskId;
use crate::job::JobId;
use crate::resource::PoolId;
use crate::sched::JobNotification;
use crate::trace::ExecutionTrace;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Stop after the first failed job instead of re-admitting its tasks.
    pub abort_on_failure: bool,
    /// How often the shell injects [`RuntimeEvent::Tick`].
    pub cycle_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            abort_on_failure: false,
            cycle_interval: Duration::from_millis(500),
        }
    }
}

/// Events flowing into the runtime from the backend, the central manager
/// and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run a scheduling cycle.
    Tick,
    /// A submitted job finished, successfully or not.
    JobFinished(JobNotification),
    /// A negotiation cycle handed these jobs to `pool`.
    JobsDispatched { jobs: Vec<JobId>, pool: PoolId },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Summary returned once the runtime stops.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub completed: Vec<TaskId>,
    pub failed_jobs: usize,
    /// `true` when every task of the workflow completed.
    pub finished: bool,
    pub trace: ExecutionTrace,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
