// src/job.rs

//! Jobs: the unit of submission to a resource pool.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dag::{Task, TaskClass, TaskId};
use crate::errors::{Result, SchedError};
use crate::resource::PoolId;

/// Monotonic job identifier, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

impl JobId {
    fn next() -> Self {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Snapshot of the task fields a job needs after it leaves the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTask {
    pub id: TaskId,
    pub level: u32,
    pub min_cores: u32,
    pub class: TaskClass,
}

impl From<&Task> for JobTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            level: task.level,
            min_cores: task.min_cores,
            class: task.class,
        }
    }
}

/// Where a job was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub pool: PoolId,
    /// Host chosen by core packing. `None` for transfers and for jobs
    /// matched by a negotiation cycle, where the pool picks its own hosts.
    pub host: Option<usize>,
}

/// One or more tasks submitted as a unit.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    tasks: Vec<JobTask>,
    min_cores: u32,
    assignment: Option<Assignment>,
}

impl Job {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn tasks(&self) -> &[JobTask] {
        &self.tasks
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.id.as_str())
    }

    /// Largest core requirement among the job's tasks.
    pub fn min_cores(&self) -> u32 {
        self.min_cores
    }

    /// A job made only of transfer tasks needs no cores.
    pub fn is_transfer(&self) -> bool {
        self.tasks.iter().all(|t| t.class.is_transfer())
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    pub fn assign(&mut self, assignment: Assignment) {
        self.assignment = Some(assignment);
    }

    pub(crate) fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assign(assignment);
        self
    }
}

/// Builds jobs out of tasks.
pub struct JobBuilder;

impl JobBuilder {
    /// Group `tasks` into one job; `min_cores` is the max over the tasks.
    pub fn from_tasks<I, T>(tasks: I) -> Result<Job>
    where
        I: IntoIterator<Item = T>,
        T: Into<JobTask>,
    {
        let tasks: Vec<JobTask> = tasks.into_iter().map(Into::into).collect();
        if tasks.is_empty() {
            return Err(SchedError::EmptyJob);
        }

        let min_cores = tasks.iter().map(|t| t.min_cores).max().unwrap_or(0);

        Ok(Job {
            id: JobId::next(),
            tasks,
            min_cores,
            assignment: None,
        })
    }

    /// Single-task job, the shape the admission scheduler emits.
    pub fn single(task: &Task) -> Job {
        Job {
            id: JobId::next(),
            tasks: vec![JobTask::from(task)],
            min_cores: task.min_cores,
            assignment: None,
        }
    }
}
