// src/dag/graph.rs

use std::collections::{BTreeMap, VecDeque};

use crate::config::model::ConfigFile;
use crate::dag::task::TaskId;

/// Internal node structure: stores immediate parents, children and the
/// node's top level.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct parents: tasks that must complete before this one is ready.
    parents: Vec<TaskId>,
    /// Direct children: tasks that list this one in their `after`.
    children: Vec<TaskId>,
    /// Roots are level 0; every other node is one past its deepest parent.
    level: u32,
}

/// In-memory DAG keyed by task id.
///
/// Acyclicity is validated in `config::validate`; here we only keep
/// adjacency and level information. A `BTreeMap` keeps iteration order
/// stable so scheduling decisions are reproducible.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: BTreeMap<TaskId, DagNode>,
}

impl DagGraph {
    /// Build a DAG from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let edges = cfg
            .task
            .iter()
            .map(|(name, task)| (name.clone(), task.after.clone()));
        Self::from_edges(edges)
    }

    /// Build a DAG from `(task, parents)` pairs.
    ///
    /// Parents that are not themselves listed are ignored.
    pub fn from_edges(edges: impl IntoIterator<Item = (TaskId, Vec<TaskId>)>) -> Self {
        let mut nodes: BTreeMap<TaskId, DagNode> = edges
            .into_iter()
            .map(|(name, parents)| {
                (
                    name,
                    DagNode {
                        parents,
                        children: Vec::new(),
                        level: 0,
                    },
                )
            })
            .collect();

        let names: Vec<TaskId> = nodes.keys().cloned().collect();
        for name in &names {
            let parents = nodes
                .get(name)
                .map(|n| n.parents.clone())
                .unwrap_or_default();
            for parent in parents {
                if let Some(parent_node) = nodes.get_mut(&parent) {
                    parent_node.children.push(name.clone());
                }
            }
        }
        for node in nodes.values_mut() {
            node.parents.retain(|p| names.binary_search(p).is_ok());
        }

        let mut graph = Self { nodes };
        graph.assign_levels();
        graph
    }

    /// Kahn's algorithm over the parent counts; each child ends up one level
    /// past its deepest parent.
    fn assign_levels(&mut self) {
        let mut remaining: BTreeMap<TaskId, usize> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.parents.len()))
            .collect();

        let mut queue: VecDeque<TaskId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| name.clone())
            .collect();

        while let Some(name) = queue.pop_front() {
            let (level, children) = match self.nodes.get(&name) {
                Some(node) => (node.level, node.children.clone()),
                None => continue,
            };

            for child in children {
                if let Some(child_node) = self.nodes.get_mut(&child) {
                    child_node.level = child_node.level.max(level + 1);
                }
                if let Some(count) = remaining.get_mut(&child) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }
    }

    /// All task ids, in ascending id order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Immediate parents of a task (the tasks listed in its `after`).
    pub fn parents_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.parents.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate children of a task.
    pub fn children_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn level_of(&self, id: &str) -> Option<u32> {
        self.nodes.get(id).map(|n| n.level)
    }
}
