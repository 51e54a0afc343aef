use std::collections::{BTreeMap, BTreeSet};

use dagsched::dag::{DagProvider, Task, TaskClass, TaskId};

/// Hand-built `DagProvider` for scheduler tests.
///
/// Levels are whatever the tasks say; readiness is set explicitly, so a
/// test can put a level-2 task in front of the scheduler directly.
#[derive(Debug, Default, Clone)]
pub struct StaticDag {
    tasks: BTreeMap<TaskId, Task>,
    parents: BTreeMap<TaskId, Vec<TaskId>>,
    children: BTreeMap<TaskId, Vec<TaskId>>,
    ready: BTreeSet<TaskId>,
}

impl StaticDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task that is ready right away.
    pub fn with_task(mut self, task: Task) -> Self {
        self.ready.insert(task.id.clone());
        self.tasks.insert(task.id.clone(), task);
        self
    }

    /// Add a task that is not ready yet.
    pub fn with_waiting_task(mut self, task: Task) -> Self {
        self.tasks.insert(task.id.clone(), task);
        self
    }

    pub fn with_edge(mut self, parent: &str, child: &str) -> Self {
        self.parents.entry(child.to_string()).or_default().push(parent.to_string());
        self.children.entry(parent.to_string()).or_default().push(child.to_string());
        self
    }

    pub fn set_ready(&mut self, id: &str, ready: bool) {
        if ready {
            self.ready.insert(id.to_string());
        } else {
            self.ready.remove(id);
        }
    }

    pub fn priority_of(&self, id: &str) -> Option<i64> {
        self.tasks.get(id).map(|t| t.priority)
    }

    pub fn set_priority_of(&mut self, id: &str, priority: i64) {
        if let Some(task) = self.tasks.get_mut(id) {
            task.priority = priority;
        }
    }
}

/// Compute task with `cores` at `level`.
pub fn compute(id: &str, level: u32, cores: u32) -> Task {
    Task::new(id, level, cores, TaskClass::Compute)
}

pub fn transfer(id: &str, level: u32) -> Task {
    Task::new(id, level, 0, TaskClass::Transfer)
}

pub fn singleton(id: &str, level: u32) -> Task {
    Task::new(id, level, 1, TaskClass::Singleton)
}

impl DagProvider for StaticDag {
    fn ready_tasks(&self) -> Vec<TaskId> {
        self.ready.iter().cloned().collect()
    }

    fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    fn parents_of(&self, id: &str) -> &[TaskId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn children_of(&self, id: &str) -> &[TaskId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
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
