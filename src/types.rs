use std::fmt;

use serde::Deserialize;

/// How admitted tasks reach the resource pools.
///
/// - `Direct`: the admission scheduler packs each task onto a host of a
///   pool snapshot and the runtime submits the job immediately (default).
/// - `Central`: admitted tasks become jobs that are queued in the central
///   dispatcher, which matches them against pools in negotiation cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingMode {
    #[default]
    Direct,
    Central,
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingMode::Direct => f.write_str("direct"),
            SchedulingMode::Central => f.write_str("central"),
        }
    }
}

/// Declared kind of a task in the workflow file.
///
/// The singleton class is not declared; it is derived from the task id
/// (see [`crate::dag::TaskClass::classify`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Compute,
    Transfer,
}
