// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{SchedulingMode, TaskKind};

/// Top-level configuration exactly as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// mode = "direct"
/// batch_size = 5
///
/// [[pool]]
/// name = "cluster"
/// hosts = [4, 2]
///
/// [task.stage_in]
/// kind = "transfer"
///
/// [task.register_1]
/// cores = 1
/// after = ["stage_in"]
/// ```
///
/// This type is unvalidated. Convert it into a [`ConfigFile`] with
/// `ConfigFile::try_from(raw)` before handing it to the rest of the crate.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Scheduler behaviour from `[scheduler]`.
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Resource pools from `[[pool]]`, in enumeration order.
    #[serde(default)]
    pub pool: Vec<PoolConfig>,

    /// All tasks from `[task.<id>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can assume the DAG is acyclic, every dependency exists and
/// every compute task fits on at least one host.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub pool: Vec<PoolConfig>,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        pool: Vec<PoolConfig>,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            scheduler,
            pool,
            task,
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// `"direct"` (greedy per-task packing) or `"central"` (negotiation
    /// cycles over a job queue).
    #[serde(default)]
    pub mode: SchedulingMode,

    /// Maximum number of tasks admitted per scheduling cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Task ids starting with this prefix form the singleton class: at most
    /// one of them is admitted at a time.
    #[serde(default = "default_singleton_prefix")]
    pub singleton_prefix: String,

    /// Interval of the engine's periodic re-scheduling tick.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,

    /// Interval of the central dispatcher's negotiation tick.
    #[serde(default = "default_negotiation_interval_ms")]
    pub negotiation_interval_ms: u64,

    /// Stop the run on the first failed job instead of letting the
    /// workflow re-ready the failed tasks.
    #[serde(default)]
    pub abort_on_failure: bool,
}

fn default_batch_size() -> usize {
    5
}

fn default_singleton_prefix() -> String {
    "register_".to_string()
}

fn default_cycle_interval_ms() -> u64 {
    500
}

fn default_negotiation_interval_ms() -> u64 {
    100
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            mode: SchedulingMode::default(),
            batch_size: default_batch_size(),
            singleton_prefix: default_singleton_prefix(),
            cycle_interval_ms: default_cycle_interval_ms(),
            negotiation_interval_ms: default_negotiation_interval_ms(),
            abort_on_failure: false,
        }
    }
}

impl SchedulerSection {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn negotiation_interval(&self) -> Duration {
        Duration::from_millis(self.negotiation_interval_ms)
    }
}

/// `[[pool]]` entry: a named resource pool with per-host core counts.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    pub name: String,

    /// Total cores per host, in host order. All cores start idle.
    pub hosts: Vec<u32>,
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub kind: TaskKind,

    /// Minimum number of cores the task needs on a single host.
    #[serde(default = "default_cores")]
    pub cores: u32,

    /// Initial priority; raised at admission time to the maximum of the
    /// parents' priorities.
    #[serde(default)]
    pub priority: i64,

    /// Simulated runtime used by the built-in execution backend.
    #[serde(default = "default_runtime_ms")]
    pub runtime_ms: u64,

    /// Number of times the simulated backend fails this task before it
    /// succeeds.
    #[serde(default)]
    pub fail_times: u32,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,
}

fn default_cores() -> u32 {
    1
}

fn default_runtime_ms() -> u64 {
    100
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            kind: TaskKind::default(),
            cores: default_cores(),
            priority: 0,
            runtime_ms: default_runtime_ms(),
            fail_times: 0,
            after: Vec::new(),
        }
    }
}

impl TaskConfig {
    pub fn runtime(&self) -> Duration {
        Duration::from_millis(self.runtime_ms)
    }
}
