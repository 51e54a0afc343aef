// src/central/negotiation.rs

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::exec::ExecutionBackend;
use crate::job::{Assignment, Job, JobId};
use crate::resource::{PoolId, PoolRef};

/// A job matched to a pool during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub job: JobId,
    pub pool: PoolId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationOutcome {
    pub cycle_id: u64,
    /// Jobs submitted to a pool, in queue order.
    pub scheduled: Vec<Matched>,
    /// Jobs whose submission was refused by the backend. They stay queued.
    pub failed: Vec<JobId>,
}

/// One pass over a snapshot of the pending queue.
///
/// The cycle owns copies of the queued jobs and never touches the
/// dispatcher; the outcome is applied by
/// [`super::CentralDispatcher::on_negotiation_done`].
#[derive(Debug, Clone)]
pub struct NegotiationCycle {
    id: u64,
    jobs: Vec<Job>,
}

impl NegotiationCycle {
    pub(crate) fn new(id: u64, jobs: Vec<Job>) -> Self {
        Self { id, jobs }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Match every job against the pools in order.
    ///
    /// A pool matches when its total idle cores cover the job's
    /// `min_cores`. Pools are read fresh for every attempt so capacity taken
    /// by earlier submissions in the same cycle is seen. A pool whose query
    /// faults counts as zero capacity for the rest of the cycle.
    pub fn run(self, pools: &[PoolRef], backend: &dyn ExecutionBackend) -> NegotiationOutcome {
        let mut outcome = NegotiationOutcome {
            cycle_id: self.id,
            ..Default::default()
        };

        let mut faulted: HashSet<PoolId> = HashSet::new();

        for mut job in self.jobs {
            let needed = u64::from(job.min_cores());

            let Some(pool) = pools.iter().find(|pool| {
                if faulted.contains(pool.id()) {
                    return false;
                }
                match pool.total_idle_cores() {
                    Ok(idle) => idle >= needed,
                    Err(err) => {
                        warn!(
                            cycle = self.id,
                            pool = %pool.id(),
                            error = %err,
                            "pool query failed; skipping pool for this cycle"
                        );
                        faulted.insert(pool.id().to_string());
                        false
                    }
                }
            }) else {
                debug!(cycle = self.id, job = %job.id(), cores = needed, "no pool fits; job stays queued");
                continue;
            };

            let job_id = job.id();
            let pool_id = pool.id().to_string();
            job.assign(Assignment {
                pool: pool_id.clone(),
                host: None,
            });

            match backend.submit_job(job, &pool_id) {
                Ok(()) => {
                    info!(cycle = self.id, job = %job_id, pool = %pool_id, "job matched");
                    outcome.scheduled.push(Matched {
                        job: job_id,
                        pool: pool_id,
                    });
                }
                Err(err) => {
                    warn!(cycle = self.id, job = %job_id, pool = %pool_id, error = %err, "submission refused; job stays queued");
                    outcome.failed.push(job_id);
                }
            }
        }

        outcome
    }
}
