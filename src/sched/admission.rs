// src/sched/admission.rs

use std::cmp::Reverse;

use tracing::{debug, error, info, warn};

use crate::dag::{DagProvider, Task, TaskId};
use crate::errors::{Result, SchedError};
use crate::job::{Assignment, Job, JobBuilder};
use crate::resource::{CoreSnapshot, PoolRef};
use crate::sched::notification::JobNotification;
use crate::sched::packing::{CoreAllocator, FirstFitAllocator};
use crate::sched::state::{RunningLevel, SchedulerState};
use crate::types::SchedulingMode;

/// Default number of tasks admitted per cycle.
pub const DEFAULT_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct AdmissionConfig {
    pub batch_size: usize,
    pub mode: SchedulingMode,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            mode: SchedulingMode::Direct,
        }
    }
}

/// Result of one scheduling cycle.
#[derive(Debug, Clone, Default)]
pub struct AdmissionStep {
    /// Jobs ready to hand off: placed jobs in direct mode, queueable jobs in
    /// central mode.
    pub jobs: Vec<Job>,
    /// Tasks newly admitted this cycle (bounded by the batch size).
    pub admitted: Vec<TaskId>,
    /// Tasks that are admitted but found no host this cycle.
    pub unplaced: Vec<TaskId>,
}

/// DAG-aware admission control.
///
/// Each call to [`AdmissionScheduler::schedule`] is one cycle:
/// 1. ready tasks inherit the maximum priority of their parents;
/// 2. previously admitted but unplaced tasks get another packing attempt;
/// 3. remaining ready tasks are visited by descending priority (ties by
///    id) and admitted while the level gate, the singleton slot and the
///    batch cap allow;
/// 4. admitted tasks are packed onto hosts (direct mode) or turned into
///    jobs for the central dispatcher (central mode).
///
/// Completion and failure notifications release the counters again via
/// [`AdmissionScheduler::on_job_notification`].
#[derive(Debug)]
pub struct AdmissionScheduler {
    config: AdmissionConfig,
    state: SchedulerState,
    allocator: Box<dyn CoreAllocator>,
}

impl AdmissionScheduler {
    pub fn new(config: AdmissionConfig) -> Self {
        Self::with_allocator(config, Box::new(FirstFitAllocator))
    }

    pub fn with_allocator(config: AdmissionConfig, allocator: Box<dyn CoreAllocator>) -> Self {
        Self {
            config,
            state: SchedulerState::default(),
            allocator,
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn running_level(&self) -> RunningLevel {
        self.state.running_level()
    }

    pub fn running_singletons(&self) -> u32 {
        self.state.running_singletons()
    }

    /// Admitted tasks still waiting for a host (starvation shows up here).
    pub fn pending_tasks(&self) -> Vec<TaskId> {
        self.state.pending().iter().cloned().collect()
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.state.is_scheduled(id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.state.scheduled_count()
    }

    /// Run one cycle against live pools.
    pub fn schedule<D: DagProvider>(&mut self, dag: &mut D, pools: &[PoolRef]) -> Result<AdmissionStep> {
        let mut snapshot = match self.config.mode {
            SchedulingMode::Direct => CoreSnapshot::capture(pools),
            SchedulingMode::Central => CoreSnapshot::default(),
        };
        self.schedule_with_snapshot(dag, &mut snapshot)
    }

    /// Run one cycle against an explicit snapshot. The snapshot is charged
    /// for every task packed.
    pub fn schedule_with_snapshot<D: DagProvider>(
        &mut self,
        dag: &mut D,
        snapshot: &mut CoreSnapshot,
    ) -> Result<AdmissionStep> {
        let ready = dag.ready_tasks();
        debug!(ready = ready.len(), "scheduling cycle: ready tasks");

        propagate_priorities(dag, &ready);

        let mut step = AdmissionStep::default();

        if self.config.mode == SchedulingMode::Direct {
            self.place_pending(dag, snapshot, &mut step)?;
        }

        let mut candidates: Vec<Task> = ready
            .iter()
            .filter(|id| !self.state.is_pending(id) && !self.state.is_scheduled(id))
            .filter_map(|id| dag.task(id).cloned())
            .collect();
        sort_by_priority(&mut candidates);

        for task in candidates {
            if step.admitted.len() >= self.config.batch_size {
                debug!(
                    batch_size = self.config.batch_size,
                    "batch cap reached; remaining ready tasks wait for the next cycle"
                );
                break;
            }

            if !self.state.level_gate_allows(task.level) {
                debug!(
                    task = %task.id,
                    level = task.level,
                    running = ?self.state.running_level(),
                    "level gate closed for task"
                );
                continue;
            }

            if task.class.is_singleton() && !self.state.singleton_slot_free() {
                debug!(task = %task.id, "singleton slot busy; deferring task");
                continue;
            }

            self.state.record_admission(task.level, task.class);
            step.admitted.push(task.id.clone());
            info!(
                task = %task.id,
                level = task.level,
                priority = task.priority,
                class = ?task.class,
                "admitted task"
            );

            match self.config.mode {
                SchedulingMode::Central => {
                    self.state.mark_scheduled(&task.id);
                    step.jobs.push(JobBuilder::single(&task));
                }
                SchedulingMode::Direct => match self.place(&task, snapshot) {
                    Some(job) => {
                        self.state.mark_scheduled(&task.id);
                        step.jobs.push(job);
                    }
                    None => {
                        debug!(task = %task.id, cores = task.min_cores, "no host fits; task stays pending");
                        self.state.mark_pending(task.id.clone());
                        step.unplaced.push(task.id.clone());
                    }
                },
            }
        }

        debug!(
            admitted = step.admitted.len(),
            jobs = step.jobs.len(),
            pending = self.state.pending().len(),
            running_level = self.state.running_level().level,
            running_count = self.state.running_level().count,
            "scheduling cycle done"
        );

        Ok(step)
    }

    /// Release the tasks of a finished job.
    ///
    /// Completion and failure release the same counters; on failure the
    /// workflow decides whether the tasks become ready again. An
    /// inconsistent release is reported without touching the state.
    pub fn on_job_notification(&mut self, notification: &JobNotification) -> Result<()> {
        let job = notification.job();
        let releases = job
            .tasks()
            .iter()
            .map(|t| (t.id.as_str(), t.level, t.class));

        if let Err(err) = self.state.check_release(releases.clone()) {
            error!(job = %job.id(), error = %err, "scheduler bookkeeping out of sync");
            return Err(err);
        }

        for (id, level, class) in releases {
            self.state.release_scheduled(id, level, class)?;
        }

        match notification {
            JobNotification::Completed(_) => {
                debug!(job = %job.id(), running = ?self.state.running_level(), "released completed job");
            }
            JobNotification::Failed { cause, .. } => {
                warn!(
                    job = %job.id(),
                    cause = %cause,
                    running = ?self.state.running_level(),
                    "released failed job; tasks left to the workflow for re-admission"
                );
            }
        }
        Ok(())
    }

    /// Retry packing for tasks admitted in earlier cycles.
    fn place_pending<D: DagProvider>(
        &mut self,
        dag: &D,
        snapshot: &mut CoreSnapshot,
        step: &mut AdmissionStep,
    ) -> Result<()> {
        if self.state.pending().is_empty() {
            return Ok(());
        }

        let mut waiting = Vec::new();
        for id in self.pending_tasks() {
            match dag.task(&id) {
                Some(task) => waiting.push(task.clone()),
                None => {
                    // Unknown to the workflow: we cannot recover its level or
                    // class, so the counters would drift. Surface it.
                    return Err(SchedError::InvariantViolation(format!(
                        "pending task '{id}' is unknown to the workflow"
                    )));
                }
            }
        }
        sort_by_priority(&mut waiting);

        for task in waiting {
            if let Some(job) = self.place(&task, snapshot) {
                debug!(task = %task.id, "placed previously pending task");
                self.state.mark_scheduled(&task.id);
                step.jobs.push(job);
            } else {
                step.unplaced.push(task.id.clone());
            }
        }
        Ok(())
    }

    fn place(&mut self, task: &Task, snapshot: &mut CoreSnapshot) -> Option<Job> {
        if task.class.is_transfer() {
            let pool = snapshot.first_pool()?.to_string();
            return Some(JobBuilder::single(task).with_assignment(Assignment { pool, host: None }));
        }

        let placement = self.allocator.allocate(snapshot, task.min_cores)?;
        debug!(
            task = %task.id,
            pool = %placement.pool,
            host = placement.host,
            cores = task.min_cores,
            "packed task"
        );
        Some(JobBuilder::single(task).with_assignment(Assignment {
            pool: placement.pool,
            host: Some(placement.host),
        }))
    }
}

/// Raise every ready task's priority to the maximum of its parents'.
fn propagate_priorities<D: DagProvider>(dag: &mut D, ready: &[TaskId]) {
    for id in ready {
        let Some(own) = dag.task(id).map(|t| t.priority) else {
            continue;
        };
        let inherited = dag
            .parents_of(id)
            .iter()
            .filter_map(|p| dag.task(p).map(|t| t.priority))
            .max();

        if let Some(parent_max) = inherited {
            if parent_max > own {
                debug!(task = %id, from = own, to = parent_max, "inheriting parent priority");
                dag.set_priority(id, parent_max);
            }
        }
    }
}

fn sort_by_priority(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        Reverse(a.priority)
            .cmp(&Reverse(b.priority))
            .then_with(|| a.id.cmp(&b.id))
    });
}
