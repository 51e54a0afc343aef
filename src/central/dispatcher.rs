// src/central/dispatcher.rs

//! Pure state of the central dispatcher: the FCFS pending queue and the
//! negotiation busy flag.

use std::collections::VecDeque;

use tracing::{debug, error, info};

use crate::central::negotiation::{NegotiationCycle, NegotiationOutcome};
use crate::errors::{Result, SchedError};
use crate::job::{Job, JobId};

/// Queue of jobs waiting for a pool, plus at most one negotiation in flight.
///
/// The dispatcher never talks to pools itself. `tick` hands out a
/// [`NegotiationCycle`] over a copy of the queue; the queue only changes
/// again through `submit`, `withdraw` and `on_negotiation_done`.
#[derive(Debug, Default)]
pub struct CentralDispatcher {
    queue: VecDeque<Job>,
    active_cycle: Option<u64>,
    next_cycle: u64,
}

impl CentralDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job to the queue. This accepts the job; placement happens
    /// in a later negotiation cycle.
    pub fn submit(&mut self, job: Job) -> Result<()> {
        if self.queue.iter().any(|queued| queued.id() == job.id()) {
            return Err(SchedError::DuplicateJob(job.id()));
        }

        debug!(job = %job.id(), cores = job.min_cores(), "job queued for negotiation");
        self.queue.push_back(job);
        Ok(())
    }

    /// Start a negotiation cycle if none is active and there is work.
    pub fn tick(&mut self) -> Option<NegotiationCycle> {
        if self.active_cycle.is_some() || self.queue.is_empty() {
            return None;
        }

        self.next_cycle += 1;
        let cycle_id = self.next_cycle;
        self.active_cycle = Some(cycle_id);

        let jobs: Vec<Job> = self.queue.iter().cloned().collect();
        debug!(cycle = cycle_id, queued = jobs.len(), "starting negotiation cycle");
        Some(NegotiationCycle::new(cycle_id, jobs))
    }

    /// Apply the result of the active cycle.
    ///
    /// Matched jobs leave the queue; everything else keeps its position.
    /// Returns the number of jobs removed.
    pub fn on_negotiation_done(&mut self, outcome: &NegotiationOutcome) -> Result<usize> {
        match self.active_cycle {
            Some(active) if active == outcome.cycle_id => {}
            Some(active) => {
                let err = SchedError::InvariantViolation(format!(
                    "negotiation cycle {} finished while cycle {active} is active",
                    outcome.cycle_id
                ));
                error!(error = %err, "central dispatcher out of sync");
                return Err(err);
            }
            None => {
                let err = SchedError::InvariantViolation(format!(
                    "negotiation cycle {} finished but no cycle is active",
                    outcome.cycle_id
                ));
                error!(error = %err, "central dispatcher out of sync");
                return Err(err);
            }
        }

        let before = self.queue.len();
        self.queue
            .retain(|job| !outcome.scheduled.iter().any(|m| m.job == job.id()));
        let removed = before - self.queue.len();

        self.active_cycle = None;
        info!(
            cycle = outcome.cycle_id,
            scheduled = removed,
            failed = outcome.failed.len(),
            still_queued = self.queue.len(),
            "negotiation cycle done"
        );
        Ok(removed)
    }

    /// Remove a queued job. A job already matched by an in-flight cycle is
    /// not recalled.
    pub fn withdraw(&mut self, job_id: JobId) -> Option<Job> {
        let pos = self.queue.iter().position(|job| job.id() == job_id)?;
        debug!(job = %job_id, "job withdrawn from queue");
        self.queue.remove(pos)
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Queued job ids, head first.
    pub fn pending_ids(&self) -> Vec<JobId> {
        self.queue.iter().map(Job::id).collect()
    }

    pub fn is_negotiating(&self) -> bool {
        self.active_cycle.is_some()
    }
}
