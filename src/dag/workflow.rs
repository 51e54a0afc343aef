// src/dag/workflow.rs

//! Concrete workflow: the DAG plus per-task state.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::graph::DagGraph;
use crate::dag::task::{Task, TaskId, TaskState};
use crate::dag::DagProvider;

/// A DAG of tasks loaded from config, tracking which tasks are ready.
///
/// Readiness follows the usual rule: a task is `Ready` once every parent is
/// `Completed`. Failed tasks are put back to `Ready` by
/// [`Workflow::mark_failed`] unless the caller asks to keep them failed.
#[derive(Debug, Clone)]
pub struct Workflow {
    graph: DagGraph,
    tasks: BTreeMap<TaskId, Task>,
}

impl Workflow {
    /// Build a workflow from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let graph = DagGraph::from_config(cfg);
        let prefix = cfg.scheduler.singleton_prefix.as_str();

        let tasks = cfg
            .task
            .iter()
            .map(|(id, tc)| {
                let level = graph.level_of(id).unwrap_or(0);
                (id.clone(), Task::from_config(id.clone(), tc, level, prefix))
            })
            .collect();

        Self::with_graph(graph, tasks)
    }

    /// Build a workflow from tasks and `(child, parents)` edges.
    ///
    /// Task levels are recomputed from the edges.
    pub fn from_parts(tasks: Vec<Task>, edges: Vec<(TaskId, Vec<TaskId>)>) -> Self {
        let mut parents: BTreeMap<TaskId, Vec<TaskId>> =
            tasks.iter().map(|t| (t.id.clone(), Vec::new())).collect();
        for (child, ps) in edges {
            match parents.get_mut(&child) {
                Some(entry) => entry.extend(ps),
                None => warn!(task = %child, "edge for unknown task; ignoring"),
            }
        }
        let graph = DagGraph::from_edges(parents);

        let tasks = tasks
            .into_iter()
            .map(|mut t| {
                t.level = graph.level_of(&t.id).unwrap_or(0);
                (t.id.clone(), t)
            })
            .collect();

        Self::with_graph(graph, tasks)
    }

    fn with_graph(graph: DagGraph, tasks: BTreeMap<TaskId, Task>) -> Self {
        let mut wf = Self { graph, tasks };
        for task in wf.tasks.values_mut() {
            task.state = TaskState::NotReady;
        }
        wf.refresh_readiness();
        wf
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn state_of(&self, id: &str) -> Option<TaskState> {
        self.tasks.get(id).map(|t| t.state)
    }

    /// `true` once every task has completed.
    pub fn is_done(&self) -> bool {
        self.tasks.values().all(|t| t.state == TaskState::Completed)
    }

    pub fn count_in(&self, state: TaskState) -> usize {
        self.tasks.values().filter(|t| t.state == state).count()
    }

    /// Mark tasks as handed off in a job. Only `Ready` tasks move.
    pub fn mark_submitted<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            match self.tasks.get_mut(id) {
                Some(task) if task.state == TaskState::Ready => {
                    task.state = TaskState::Submitted;
                }
                Some(task) => {
                    warn!(task = %id, state = ?task.state, "submit for task that is not ready; ignoring");
                }
                None => warn!(task = %id, "submit for unknown task; ignoring"),
            }
        }
    }

    /// Mark tasks as completed and return the children that became ready.
    pub fn mark_completed<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> Vec<TaskId> {
        for id in ids {
            match self.tasks.get_mut(id) {
                Some(task) => {
                    task.state = TaskState::Completed;
                    debug!(task = %id, "task completed");
                }
                None => warn!(task = %id, "completion for unknown task; ignoring"),
            }
        }
        self.refresh_readiness()
    }

    /// Record a failed attempt.
    ///
    /// With `re_ready` the tasks go back to `Ready` so a later scheduling
    /// cycle can admit them again; otherwise they stay `Failed`.
    pub fn mark_failed<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>, re_ready: bool) {
        for id in ids {
            match self.tasks.get_mut(id) {
                Some(task) => {
                    task.failures += 1;
                    task.state = if re_ready {
                        TaskState::Ready
                    } else {
                        TaskState::Failed
                    };
                    info!(
                        task = %id,
                        failures = task.failures,
                        re_ready,
                        "task attempt failed"
                    );
                }
                None => warn!(task = %id, "failure for unknown task; ignoring"),
            }
        }
    }

    /// Promote `NotReady` tasks whose parents all completed.
    fn refresh_readiness(&mut self) -> Vec<TaskId> {
        let promote: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|t| t.state == TaskState::NotReady)
            .filter(|t| {
                self.graph.parents_of(&t.id).iter().all(|p| {
                    self.tasks
                        .get(p)
                        .is_some_and(|pt| pt.state == TaskState::Completed)
                })
            })
            .map(|t| t.id.clone())
            .collect();

        for id in &promote {
            if let Some(task) = self.tasks.get_mut(id) {
                task.state = TaskState::Ready;
                debug!(task = %id, level = task.level, "task became ready");
            }
        }

        promote
    }
}

impl DagProvider for Workflow {
    fn ready_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|t| t.state == TaskState::Ready)
            .map(|t| t.id.clone())
            .collect()
    }

    fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    fn parents_of(&self, id: &str) -> &[TaskId] {
        self.graph.parents_of(id)
    }

    fn children_of(&self, id: &str) -> &[TaskId] {
        self.graph.children_of(id)
    }

    fn set_priority(&mut self, id: &str, priority: i64) -> bool {
        match self.tasks.get_mut(id) {
            Some(task) => {
                task.priority = priority;
                true
            }
            None => false,
        }
    }
}
