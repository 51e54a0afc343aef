// src/dag/mod.rs

//! DAG representation.
//!
//! - [`graph`] holds parent/child adjacency and top levels.
//! - [`task`] defines tasks, their scheduling class and workflow state.
//! - [`workflow`] is the concrete [`DagProvider`]: the graph plus per-task
//!   state and readiness tracking.

pub mod graph;
pub mod task;
pub mod workflow;

pub use graph::DagGraph;
pub use task::{Task, TaskClass, TaskId, TaskState};
pub use workflow::Workflow;

/// Read-mostly view of a workflow used by the admission scheduler.
///
/// The scheduler never changes the dependency structure; the only write
/// it performs is [`DagProvider::set_priority`].
pub trait DagProvider {
    /// Tasks whose dependencies are all satisfied and that have not been
    /// handed off yet.
    fn ready_tasks(&self) -> Vec<TaskId>;

    fn task(&self, id: &str) -> Option<&Task>;

    fn parents_of(&self, id: &str) -> &[TaskId];

    fn children_of(&self, id: &str) -> &[TaskId];

    /// Returns `false` if the task is unknown.
    fn set_priority(&mut self, id: &str, priority: i64) -> bool;
}
