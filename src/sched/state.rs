// src/sched/state.rs

//! Bookkeeping owned by the admission scheduler.

use std::collections::{BTreeSet, HashSet};

use crate::dag::{TaskClass, TaskId};
use crate::errors::{Result, SchedError};

/// The current wave: the highest admitted level and how many admitted tasks
/// at exactly that level have not finished yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunningLevel {
    pub level: u32,
    pub count: u32,
}

/// Level, singleton and membership bookkeeping.
///
/// Every mutation goes through the methods below so the counters can only
/// move in the ways the admission rules allow.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    running_level: RunningLevel,
    running_singletons: u32,
    /// Admitted (and counted) but not yet placed on a host.
    pending: BTreeSet<TaskId>,
    /// Packed into a job that has not completed or failed yet.
    scheduled: HashSet<TaskId>,
}

impl SchedulerState {
    pub fn running_level(&self) -> RunningLevel {
        self.running_level
    }

    pub fn running_singletons(&self) -> u32 {
        self.running_singletons
    }

    pub fn pending(&self) -> &BTreeSet<TaskId> {
        &self.pending
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.scheduled.contains(id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    /// Level gate: anything at or below the current wave, or the next wave
    /// once the current one has drained.
    pub fn level_gate_allows(&self, level: u32) -> bool {
        let current = self.running_level;
        level <= current.level || (level == current.level + 1 && current.count == 0)
    }

    pub fn singleton_slot_free(&self) -> bool {
        self.running_singletons == 0
    }

    /// Count a newly admitted task against the wave and singleton counters.
    pub fn record_admission(&mut self, level: u32, class: TaskClass) {
        if level > self.running_level.level {
            self.running_level = RunningLevel { level, count: 1 };
        } else if level == self.running_level.level {
            self.running_level.count += 1;
        }

        if class.is_singleton() {
            self.running_singletons += 1;
        }
    }

    pub fn mark_pending(&mut self, id: TaskId) {
        self.pending.insert(id);
    }

    pub fn mark_scheduled(&mut self, id: &str) {
        self.pending.remove(id);
        self.scheduled.insert(id.to_string());
    }

    /// Check that releasing these tasks is consistent, without mutating.
    pub fn check_release<'a>(
        &self,
        tasks: impl IntoIterator<Item = (&'a str, u32, TaskClass)>,
    ) -> Result<()> {
        let mut level_releases = 0u32;
        let mut singleton_releases = 0u32;

        for (id, level, class) in tasks {
            if !self.scheduled.contains(id) {
                return Err(SchedError::InvariantViolation(format!(
                    "notification for task '{id}' which is not scheduled"
                )));
            }
            if level > self.running_level.level {
                return Err(SchedError::InvariantViolation(format!(
                    "task '{id}' finished at level {level} above the running level {}",
                    self.running_level.level
                )));
            }
            if level == self.running_level.level {
                level_releases += 1;
            }
            if class.is_singleton() {
                singleton_releases += 1;
            }
        }

        if level_releases > self.running_level.count {
            return Err(SchedError::InvariantViolation(format!(
                "releasing {level_releases} tasks at level {} but only {} are counted",
                self.running_level.level, self.running_level.count
            )));
        }
        if singleton_releases > self.running_singletons {
            return Err(SchedError::InvariantViolation(format!(
                "releasing {singleton_releases} singleton tasks but only {} are running",
                self.running_singletons
            )));
        }
        Ok(())
    }

    /// Release a finished (completed or failed) scheduled task.
    ///
    /// Call [`SchedulerState::check_release`] first; this assumes the
    /// release is consistent.
    pub fn release_scheduled(&mut self, id: &str, level: u32, class: TaskClass) -> Result<()> {
        self.scheduled.remove(id);
        self.release_counters(id, level, class)
    }

    fn release_counters(&mut self, id: &str, level: u32, class: TaskClass) -> Result<()> {
        if level > self.running_level.level {
            return Err(SchedError::InvariantViolation(format!(
                "task '{id}' released at level {level} above the running level {}",
                self.running_level.level
            )));
        }
        if level == self.running_level.level {
            self.running_level.count = self.running_level.count.checked_sub(1).ok_or_else(|| {
                SchedError::InvariantViolation(format!(
                    "running count at level {level} would drop below zero releasing '{id}'"
                ))
            })?;
        }
        if class.is_singleton() {
            self.running_singletons = self.running_singletons.checked_sub(1).ok_or_else(|| {
                SchedError::InvariantViolation(format!(
                    "singleton count would drop below zero releasing '{id}'"
                ))
            })?;
        }
        Ok(())
    }
}
