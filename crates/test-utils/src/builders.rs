#![allow(dead_code)]

use std::collections::BTreeMap;

use dagsched::config::{ConfigFile, PoolConfig, RawConfigFile, SchedulerSection, TaskConfig};
use dagsched::errors::Result;
use dagsched::types::{SchedulingMode, TaskKind};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                scheduler: SchedulerSection::default(),
                pool: Vec::new(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_pool(mut self, name: &str, hosts: &[u32]) -> Self {
        self.config.pool.push(PoolConfig {
            name: name.to_string(),
            hosts: hosts.to_vec(),
        });
        self
    }

    pub fn with_task(mut self, id: &str, task: TaskConfig) -> Self {
        self.config.task.insert(id.to_string(), task);
        self
    }

    pub fn mode(mut self, mode: SchedulingMode) -> Self {
        self.config.scheduler.mode = mode;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.scheduler.batch_size = n;
        self
    }

    pub fn abort_on_failure(mut self, val: bool) -> Self {
        self.config.scheduler.abort_on_failure = val;
        self
    }

    /// Short engine and negotiation intervals so runtime tests finish fast.
    pub fn fast_intervals(mut self) -> Self {
        self.config.scheduler.cycle_interval_ms = 10;
        self.config.scheduler.negotiation_interval_ms = 5;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig {
                runtime_ms: 5,
                ..TaskConfig::default()
            },
        }
    }

    pub fn transfer() -> Self {
        let mut b = Self::new();
        b.task.kind = TaskKind::Transfer;
        b
    }

    pub fn cores(mut self, cores: u32) -> Self {
        self.task.cores = cores;
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn runtime_ms(mut self, ms: u64) -> Self {
        self.task.runtime_ms = ms;
        self
    }

    pub fn fail_times(mut self, n: u32) -> Self {
        self.task.fail_times = n;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
