// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info, warn};

use crate::dag::{DagProvider, TaskState, Workflow};
use crate::engine::RuntimeOptions;
use crate::errors::Result;
use crate::job::{Job, JobId};
use crate::resource::PoolRef;
use crate::sched::{AdmissionScheduler, JobNotification};
use crate::trace::ExecutionTrace;
use crate::types::SchedulingMode;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these placed jobs to the execution backend.
    SubmitJobs(Vec<Job>),
    /// Queue these jobs with the central dispatcher.
    EnqueueJobs(Vec<Job>),
    /// The workflow is over (finished, aborted or shut down).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn exit(mut commands: Vec<CoreCommand>) -> Self {
        commands.push(CoreCommand::RequestExit);
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Run one admission cycle and turn its jobs into commands.
pub fn run_scheduling_cycle(
    workflow: &mut Workflow,
    scheduler: &mut AdmissionScheduler,
    pools: &[PoolRef],
    trace: &mut ExecutionTrace,
) -> Result<Vec<CoreCommand>> {
    let step = scheduler.schedule(workflow, pools)?;
    if step.jobs.is_empty() {
        return Ok(Vec::new());
    }

    for job in &step.jobs {
        workflow.mark_submitted(job.task_ids());
        trace.record_submitted(job.id(), job.task_ids().map(str::to_string).collect());
        if let Some(assignment) = job.assignment() {
            trace.record_scheduled(job.id(), &assignment.pool);
        }
    }

    info!(jobs = step.jobs.len(), unplaced = step.unplaced.len(), "scheduling cycle produced jobs");

    let command = match scheduler.config().mode {
        SchedulingMode::Direct => CoreCommand::SubmitJobs(step.jobs),
        SchedulingMode::Central => CoreCommand::EnqueueJobs(step.jobs),
    };
    Ok(vec![command])
}

/// Apply a job notification to the scheduler and the workflow.
///
/// Returns `true` when the run should stop because of the failure policy.
pub fn handle_job_finished(
    workflow: &mut Workflow,
    scheduler: &mut AdmissionScheduler,
    trace: &mut ExecutionTrace,
    options: &RuntimeOptions,
    notification: &JobNotification,
) -> Result<bool> {
    scheduler.on_job_notification(notification)?;

    match notification {
        JobNotification::Completed(job) => {
            trace.record_completed(job.id());
            let newly_ready = workflow.mark_completed(job.task_ids());
            info!(job = %job.id(), newly_ready = newly_ready.len(), "job completed");
            Ok(false)
        }
        JobNotification::Failed { job, cause } => {
            trace.record_failed(job.id(), cause.to_string());
            workflow.mark_failed(job.task_ids(), !options.abort_on_failure);
            if options.abort_on_failure {
                warn!(job = %job.id(), cause = %cause, "job failed; aborting run");
                return Ok(true);
            }
            warn!(job = %job.id(), cause = %cause, "job failed; tasks will be re-admitted");
            Ok(false)
        }
    }
}

/// Record pool placements reported by the central dispatcher.
pub fn handle_jobs_dispatched(trace: &mut ExecutionTrace, jobs: &[JobId], pool: &str) {
    debug!(pool = %pool, jobs = jobs.len(), "central dispatcher placed jobs");
    for job in jobs {
        trace.record_scheduled(*job, pool);
    }
}

/// `true` once nothing is left to run: every task completed, or the
/// remaining tasks are failed and nothing is in flight.
pub fn workflow_is_over(workflow: &Workflow, scheduler: &AdmissionScheduler) -> bool {
    if workflow.is_done() {
        return true;
    }
    scheduler.scheduled_count() == 0
        && workflow.ready_tasks().is_empty()
        && workflow.count_in(TaskState::Submitted) == 0
        && workflow.count_in(TaskState::Failed) > 0
}
