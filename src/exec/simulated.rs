// src/exec/simulated.rs

//! Simulated execution substrate.
//!
//! Jobs "run" by sleeping on the tokio clock. While a job runs, its cores
//! are reserved on the pool it was submitted to, so schedulers querying
//! the pool see capacity shrink and grow the way a real cluster would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::TaskId;
use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::backend::ExecutionBackend;
use crate::job::Job;
use crate::resource::{PoolId, ResourcePool, SharedPool};
use crate::sched::{FailureCause, JobNotification};

/// Simulated behaviour of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskProfile {
    pub runtime: Duration,
    /// Attempts that fail before the task succeeds.
    pub fail_times: u32,
}

impl Default for TaskProfile {
    fn default() -> Self {
        Self {
            runtime: Duration::from_millis(100),
            fail_times: 0,
        }
    }
}

/// Cores taken for a running job, so exactly those are given back.
#[derive(Debug)]
enum Reservation {
    None,
    Host { host: usize, cores: u32 },
    Spread(Vec<u32>),
}

pub struct SimulatedBackend {
    pools: HashMap<PoolId, SharedPool>,
    profiles: HashMap<TaskId, TaskProfile>,
    attempts: Arc<Mutex<HashMap<TaskId, u32>>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl SimulatedBackend {
    pub fn new(
        pools: impl IntoIterator<Item = SharedPool>,
        profiles: HashMap<TaskId, TaskProfile>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        let pools = pools
            .into_iter()
            .map(|p| (p.id().to_string(), p))
            .collect();
        Self {
            pools,
            profiles,
            attempts: Arc::new(Mutex::new(HashMap::new())),
            runtime_tx,
        }
    }

    /// Profiles come from `runtime_ms` / `fail_times` in the task sections.
    pub fn from_config(
        cfg: &ConfigFile,
        pools: impl IntoIterator<Item = SharedPool>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        let profiles = cfg
            .task
            .iter()
            .map(|(id, tc)| {
                (
                    id.clone(),
                    TaskProfile {
                        runtime: tc.runtime(),
                        fail_times: tc.fail_times,
                    },
                )
            })
            .collect();
        Self::new(pools, profiles, runtime_tx)
    }

    fn profile(&self, id: &str) -> TaskProfile {
        self.profiles.get(id).copied().unwrap_or_default()
    }

    /// Count an attempt for every task of the job; returns the first task
    /// that still owes a failure.
    fn record_attempt(&self, job: &Job) -> Option<TaskId> {
        let mut attempts = match self.attempts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut failing = None;
        for id in job.task_ids() {
            let made = attempts.entry(id.to_string()).or_insert(0);
            if *made < self.profile(id).fail_times && failing.is_none() {
                failing = Some(id.to_string());
            }
            *made += 1;
        }
        failing
    }

    fn reserve(&self, pool: &SharedPool, job: &Job) -> std::result::Result<Reservation, FailureCause> {
        if job.is_transfer() {
            return Ok(Reservation::None);
        }

        match job.assignment().and_then(|a| a.host) {
            Some(host) => pool
                .reserve_on_host(host, job.min_cores())
                .map(|cores| Reservation::Host { host, cores })
                .map_err(|e| FailureCause::PoolUnavailable(e.to_string())),
            None => Ok(Reservation::Spread(pool.reserve_spread(job.min_cores()))),
        }
    }

    fn notify_later(&self, delay: Duration, notification: JobNotification, release: Option<(SharedPool, Reservation)>) {
        let tx = self.runtime_tx.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            if let Some((pool, reservation)) = release {
                match reservation {
                    Reservation::None => {}
                    Reservation::Host { host, cores } => pool.release(host, cores),
                    Reservation::Spread(taken) => pool.release_spread(&taken),
                }
            }

            let job_id = notification.job().id();
            if tx.send(RuntimeEvent::JobFinished(notification)).await.is_err() {
                debug!(job = %job_id, "runtime gone; dropping job notification");
            }
        });
    }
}

impl ExecutionBackend for SimulatedBackend {
    fn submit_job(&self, job: Job, pool_id: &str) -> Result<()> {
        let Some(pool) = self.pools.get(pool_id).cloned() else {
            warn!(job = %job.id(), pool = %pool_id, "job submitted to unknown pool");
            let cause = FailureCause::PoolUnavailable(pool_id.to_string());
            self.notify_later(Duration::ZERO, JobNotification::Failed { job, cause }, None);
            return Ok(());
        };

        let reservation = match self.reserve(&pool, &job) {
            Ok(r) => r,
            Err(cause) => {
                warn!(job = %job.id(), pool = %pool_id, cause = %cause, "could not reserve cores");
                self.notify_later(Duration::ZERO, JobNotification::Failed { job, cause }, None);
                return Ok(());
            }
        };

        let runtime = job
            .task_ids()
            .map(|id| self.profile(id).runtime)
            .max()
            .unwrap_or_default();

        let notification = match self.record_attempt(&job) {
            Some(task) => JobNotification::Failed {
                cause: FailureCause::Execution(format!("task '{task}' exited with an error")),
                job,
            },
            None => JobNotification::Completed(job),
        };

        info!(
            job = %notification.job().id(),
            pool = %pool_id,
            cores = notification.job().min_cores(),
            runtime_ms = runtime.as_millis() as u64,
            "job started"
        );

        self.notify_later(runtime, notification, Some((pool, reservation)));
        Ok(())
    }
}
