// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending jobs to the backend or the central dispatcher
//! - handling Ctrl+C / shutdown
//!
//! Pools are only read through `ResourcePool::idle_cores`, so the core can
//! be driven in tests without Tokio, channels or a backend.

use tracing::info;

use crate::dag::{TaskState, Workflow};
use crate::engine::event_handlers::{
    handle_job_finished, handle_jobs_dispatched, run_scheduling_cycle, workflow_is_over, CoreStep,
};
use crate::engine::{RunReport, RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::resource::PoolRef;
use crate::sched::AdmissionScheduler;
use crate::trace::ExecutionTrace;

/// Pure core runtime state.
///
/// This owns:
/// - the workflow
/// - the admission scheduler
/// - the pools the scheduler packs onto in direct mode
/// - the execution trace
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    workflow: Workflow,
    scheduler: AdmissionScheduler,
    pools: Vec<PoolRef>,
    trace: ExecutionTrace,
    options: RuntimeOptions,
    failed_jobs: usize,
}

impl CoreRuntime {
    pub fn new(
        workflow: Workflow,
        scheduler: AdmissionScheduler,
        pools: Vec<PoolRef>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            workflow,
            scheduler,
            pools,
            trace: ExecutionTrace::new(),
            options,
            failed_jobs: 0,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn scheduler(&self) -> &AdmissionScheduler {
        &self.scheduler
    }

    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn failed_jobs(&self) -> usize {
        self.failed_jobs
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> Result<CoreStep> {
        match event {
            RuntimeEvent::Tick => self.schedule(),
            RuntimeEvent::JobFinished(notification) => {
                if notification.is_failure() {
                    self.failed_jobs += 1;
                }
                let abort = handle_job_finished(
                    &mut self.workflow,
                    &mut self.scheduler,
                    &mut self.trace,
                    &self.options,
                    &notification,
                )?;
                if abort {
                    return Ok(CoreStep::exit(Vec::new()));
                }
                self.schedule()
            }
            RuntimeEvent::JobsDispatched { jobs, pool } => {
                handle_jobs_dispatched(&mut self.trace, &jobs, &pool);
                Ok(CoreStep::running(Vec::new()))
            }
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested");
                Ok(CoreStep::exit(Vec::new()))
            }
        }
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            completed: self
                .workflow
                .tasks()
                .filter(|t| t.state == TaskState::Completed)
                .map(|t| t.id.clone())
                .collect(),
            failed_jobs: self.failed_jobs,
            finished: self.workflow.is_done(),
            trace: self.trace.clone(),
        }
    }

    fn schedule(&mut self) -> Result<CoreStep> {
        if workflow_is_over(&self.workflow, &self.scheduler) {
            info!(
                completed = self.workflow.count_in(TaskState::Completed),
                total = self.workflow.len(),
                "workflow is over"
            );
            return Ok(CoreStep::exit(Vec::new()));
        }

        let commands = run_scheduling_cycle(
            &mut self.workflow,
            &mut self.scheduler,
            &self.pools,
            &mut self.trace,
        )?;
        Ok(CoreStep::running(commands))
    }
}
