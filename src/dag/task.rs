// src/dag/task.rs

//! Task metadata and workflow-side task state.

use crate::config::model::TaskConfig;
use crate::types::TaskKind;

/// Canonical task identifier used throughout the crate.
pub type TaskId = String;

/// Scheduling class of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
    /// Regular task: needs `min_cores` on a single host.
    Compute,
    /// Data movement: bypasses core packing.
    Transfer,
    /// Serialized class: at most one admitted at a time.
    Singleton,
}

impl TaskClass {
    /// Derive the class from the declared kind and the id-prefix convention.
    ///
    /// Transfers stay transfers even if their id matches the prefix; an
    /// empty prefix disables the singleton class.
    pub fn classify(id: &str, kind: TaskKind, singleton_prefix: &str) -> Self {
        match kind {
            TaskKind::Transfer => TaskClass::Transfer,
            TaskKind::Compute if !singleton_prefix.is_empty() && id.starts_with(singleton_prefix) => {
                TaskClass::Singleton
            }
            TaskKind::Compute => TaskClass::Compute,
        }
    }

    pub fn is_transfer(self) -> bool {
        matches!(self, TaskClass::Transfer)
    }

    pub fn is_singleton(self) -> bool {
        matches!(self, TaskClass::Singleton)
    }
}

/// Workflow-side state of a task.
///
/// This is owned by the workflow, not the scheduler: the scheduler only
/// sees which tasks are `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// At least one parent has not completed yet.
    NotReady,
    /// All parents completed; waiting to be turned into a job.
    Ready,
    /// Part of a job that has been handed to the scheduler's consumers.
    Submitted,
    Completed,
    /// Last attempt failed and the workflow decided not to re-ready it.
    Failed,
}

/// A DAG node as seen by the scheduler.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub priority: i64,
    /// Top level in the DAG (roots are 0).
    pub level: u32,
    pub min_cores: u32,
    pub class: TaskClass,
    pub state: TaskState,
    /// Number of failed attempts so far.
    pub failures: u32,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, level: u32, min_cores: u32, class: TaskClass) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            level,
            min_cores,
            class,
            state: TaskState::NotReady,
            failures: 0,
        }
    }

    pub fn from_config(id: TaskId, cfg: &TaskConfig, level: u32, singleton_prefix: &str) -> Self {
        let class = TaskClass::classify(&id, cfg.kind, singleton_prefix);
        let mut task = Self::new(id, level, cfg.cores, class);
        task.priority = cfg.priority;
        task
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }
}
