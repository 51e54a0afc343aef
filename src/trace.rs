// src/trace.rs

//! Execution trace: what happened to each job, relative to run start.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::dag::TaskId;
use crate::job::JobId;
use crate::resource::PoolId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEventKind {
    /// Job created by the admission scheduler.
    JobSubmitted,
    /// Job handed to a pool.
    JobScheduled { pool: PoolId },
    JobCompleted,
    JobFailed { cause: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub at: Duration,
    pub job: JobId,
    pub tasks: Vec<TaskId>,
    pub kind: TraceEventKind,
}

#[derive(Debug, Clone)]
pub struct ExecutionTrace {
    started: Instant,
    events: Vec<TraceEvent>,
    /// Task ids per job, so later events can be recorded by job id alone.
    jobs: BTreeMap<JobId, Vec<TaskId>>,
}

impl Default for ExecutionTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            events: Vec::new(),
            jobs: BTreeMap::new(),
        }
    }

    pub fn record_submitted(&mut self, job: JobId, tasks: Vec<TaskId>) {
        self.jobs.insert(job, tasks);
        self.push(job, TraceEventKind::JobSubmitted);
    }

    pub fn record_scheduled(&mut self, job: JobId, pool: &str) {
        self.push(
            job,
            TraceEventKind::JobScheduled {
                pool: pool.to_string(),
            },
        );
    }

    pub fn record_completed(&mut self, job: JobId) {
        self.push(job, TraceEventKind::JobCompleted);
    }

    pub fn record_failed(&mut self, job: JobId, cause: impl Into<String>) {
        self.push(job, TraceEventKind::JobFailed { cause: cause.into() });
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Events for one task, in recording order.
    pub fn events_for_task<'a>(&'a self, task: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events
            .iter()
            .filter(move |e| e.tasks.iter().any(|t| t == task))
    }

    /// Time of the last completion, if any job completed.
    pub fn makespan(&self) -> Option<Duration> {
        self.events
            .iter()
            .filter(|e| e.kind == TraceEventKind::JobCompleted)
            .map(|e| e.at)
            .max()
    }

    pub fn completed_jobs(&self) -> usize {
        self.count(|k| matches!(k, TraceEventKind::JobCompleted))
    }

    pub fn failed_jobs(&self) -> usize {
        self.count(|k| matches!(k, TraceEventKind::JobFailed { .. }))
    }

    fn count(&self, pred: impl Fn(&TraceEventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }

    fn push(&mut self, job: JobId, kind: TraceEventKind) {
        let tasks = self.jobs.get(&job).cloned().unwrap_or_default();
        self.events.push(TraceEvent {
            at: self.started.elapsed(),
            job,
            tasks,
            kind,
        });
    }
}

impl fmt::Display for ExecutionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            let what = match &event.kind {
                TraceEventKind::JobSubmitted => "submitted".to_string(),
                TraceEventKind::JobScheduled { pool } => format!("scheduled on {pool}"),
                TraceEventKind::JobCompleted => "completed".to_string(),
                TraceEventKind::JobFailed { cause } => format!("failed ({cause})"),
            };
            writeln!(
                f,
                "{:>8.3}s  {:<8} [{}] {}",
                event.at.as_secs_f64(),
                event.job.to_string(),
                event.tasks.join(", "),
                what
            )?;
        }
        Ok(())
    }
}
