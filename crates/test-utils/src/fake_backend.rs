use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use dagsched::engine::RuntimeEvent;
use dagsched::errors::{Result, SchedError};
use dagsched::exec::ExecutionBackend;
use dagsched::job::Job;
use dagsched::resource::{ResourcePool, SharedPool};
use dagsched::sched::{FailureCause, JobNotification};

/// One `submit_job` call as seen by the fake.
#[derive(Debug, Clone)]
pub struct Submission {
    pub job: Job,
    pub pool: String,
}

impl Submission {
    pub fn task_ids(&self) -> Vec<String> {
        self.job.task_ids().map(str::to_string).collect()
    }
}

/// A fake backend that:
/// - records every submitted job and the pool it went to
/// - optionally reserves the job's cores on a shared pool (never released)
/// - optionally reports JobFinished right away, failing chosen tasks a
///   given number of times first
/// - can refuse submissions outright
#[derive(Default)]
pub struct FakeBackend {
    runtime_tx: Option<mpsc::Sender<RuntimeEvent>>,
    pools: HashMap<String, SharedPool>,
    failures: Mutex<HashMap<String, u32>>,
    refuse: bool,
    submitted: Arc<Mutex<Vec<Submission>>>,
}

impl FakeBackend {
    /// Records submissions only.
    pub fn recording() -> Self {
        Self::default()
    }

    /// Records submissions and immediately reports them finished.
    pub fn completing(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx: Some(runtime_tx),
            ..Self::default()
        }
    }

    /// Every submission fails with an error.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Take cores from these pools for every job submitted to them.
    pub fn reserving(mut self, pools: impl IntoIterator<Item = SharedPool>) -> Self {
        for pool in pools {
            self.pools.insert(pool.id().to_string(), pool);
        }
        self
    }

    /// Report jobs containing `task` as failed `times` times before they
    /// complete.
    pub fn failing(self, task: &str, times: u32) -> Self {
        self.failures.lock().unwrap().insert(task.to_string(), times);
        self
    }

    /// Shared handle to the recorded submissions.
    pub fn submissions(&self) -> Arc<Mutex<Vec<Submission>>> {
        Arc::clone(&self.submitted)
    }

    pub fn submitted(&self) -> Vec<Submission> {
        self.submitted.lock().unwrap().clone()
    }

    fn take_failure(&self, job: &Job) -> Option<String> {
        let mut failures = self.failures.lock().unwrap();
        for id in job.task_ids() {
            if let Some(left) = failures.get_mut(id) {
                if *left > 0 {
                    *left -= 1;
                    return Some(id.to_string());
                }
            }
        }
        None
    }
}

impl ExecutionBackend for FakeBackend {
    fn submit_job(&self, job: Job, pool: &str) -> Result<()> {
        if self.refuse {
            return Err(SchedError::Other(anyhow::anyhow!(
                "fake backend refuses {}",
                job.id()
            )));
        }

        if let Some(shared) = self.pools.get(pool) {
            if !job.is_transfer() {
                shared.reserve_spread(job.min_cores());
            }
        }

        self.submitted.lock().unwrap().push(Submission {
            job: job.clone(),
            pool: pool.to_string(),
        });

        if let Some(tx) = self.runtime_tx.clone() {
            let notification = match self.take_failure(&job) {
                Some(task) => JobNotification::Failed {
                    job,
                    cause: FailureCause::Execution(format!("fake failure of {task}")),
                },
                None => JobNotification::Completed(job),
            };
            tokio::spawn(async move {
                let _ = tx.send(RuntimeEvent::JobFinished(notification)).await;
            });
        }
        Ok(())
    }
}
