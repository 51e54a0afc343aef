// src/central/manager.rs

//! Async loop that owns a [`CentralDispatcher`].
//!
//! The dispatcher state lives on a single tokio task. It reacts to:
//! - job submissions from the runtime
//! - negotiation outcomes reported back by cycle tasks
//! - a fixed negotiation interval
//!
//! After every message and every interval tick it tries to start a cycle.
//! Each cycle runs on its own short-lived tokio task.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::central::dispatcher::CentralDispatcher;
use crate::central::negotiation::NegotiationOutcome;
use crate::engine::RuntimeEvent;
use crate::errors::{Result, SchedError};
use crate::exec::ExecutionBackend;
use crate::job::{Job, JobId};
use crate::resource::{PoolId, PoolRef};

/// Messages accepted by the manager loop.
#[derive(Debug)]
pub enum CentralMessage {
    Submit(Vec<Job>),
    NegotiationDone(NegotiationOutcome),
    Shutdown,
}

/// Handle used by the runtime to talk to the manager.
#[derive(Debug)]
pub struct CentralHandle {
    tx: mpsc::Sender<CentralMessage>,
    join: JoinHandle<Result<()>>,
}

impl CentralHandle {
    pub async fn submit(&self, jobs: Vec<Job>) -> Result<()> {
        self.send(CentralMessage::Submit(jobs)).await
    }

    /// Stop the manager and wait for it. An invariant violation inside the
    /// dispatcher surfaces here.
    pub async fn shutdown(self) -> Result<()> {
        // The loop may already be gone after an error; the join tells us why.
        let _ = self.tx.send(CentralMessage::Shutdown).await;
        self.join
            .await
            .map_err(|e| SchedError::Other(anyhow::anyhow!("central manager task panicked: {e}")))?
    }

    async fn send(&self, msg: CentralMessage) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| SchedError::Other(anyhow::anyhow!("central manager is no longer running")))
    }
}

/// Spawn the manager loop.
///
/// Placements are reported to the runtime as
/// [`RuntimeEvent::JobsDispatched`], one event per pool per cycle.
pub fn spawn_central_manager(
    pools: Vec<PoolRef>,
    backend: Arc<dyn ExecutionBackend>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    interval: Duration,
) -> CentralHandle {
    let (tx, rx) = mpsc::channel::<CentralMessage>(64);
    let self_tx = tx.clone();

    let join = tokio::spawn(async move {
        info!(pools = pools.len(), interval_ms = interval.as_millis() as u64, "central manager started");
        let result = manager_loop(rx, self_tx, pools, backend, runtime_tx, interval).await;
        match &result {
            Ok(()) => info!("central manager finished"),
            Err(err) => warn!(error = %err, "central manager stopped with an error"),
        }
        result
    });

    CentralHandle { tx, join }
}

async fn manager_loop(
    mut rx: mpsc::Receiver<CentralMessage>,
    self_tx: mpsc::Sender<CentralMessage>,
    pools: Vec<PoolRef>,
    backend: Arc<dyn ExecutionBackend>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    interval: Duration,
) -> Result<()> {
    let mut dispatcher = CentralDispatcher::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(msg) = msg else {
                    debug!("central manager channel closed");
                    return Ok(());
                };

                match msg {
                    CentralMessage::Submit(jobs) => {
                        for job in jobs {
                            let id = job.id();
                            if let Err(err) = dispatcher.submit(job) {
                                warn!(job = %id, error = %err, "rejected job submission");
                            }
                        }
                    }
                    CentralMessage::NegotiationDone(outcome) => {
                        dispatcher.on_negotiation_done(&outcome)?;
                        if !report_dispatched(&runtime_tx, &outcome).await {
                            debug!("runtime gone; stopping central manager");
                            return Ok(());
                        }
                    }
                    CentralMessage::Shutdown => {
                        info!(still_queued = dispatcher.pending_len(), "central manager shutting down");
                        return Ok(());
                    }
                }
            }
            _ = ticker.tick() => {}
        }

        if let Some(cycle) = dispatcher.tick() {
            let pools = pools.clone();
            let backend = Arc::clone(&backend);
            let tx = self_tx.clone();
            tokio::spawn(async move {
                let outcome = cycle.run(&pools, backend.as_ref());
                if tx.send(CentralMessage::NegotiationDone(outcome)).await.is_err() {
                    debug!("central manager gone before negotiation outcome was delivered");
                }
            });
        }
    }
}

/// Returns `false` once the runtime has gone away.
async fn report_dispatched(runtime_tx: &mpsc::Sender<RuntimeEvent>, outcome: &NegotiationOutcome) -> bool {
    let mut by_pool: BTreeMap<PoolId, Vec<JobId>> = BTreeMap::new();
    for matched in &outcome.scheduled {
        by_pool.entry(matched.pool.clone()).or_default().push(matched.job);
    }

    for (pool, jobs) in by_pool {
        if runtime_tx
            .send(RuntimeEvent::JobsDispatched { jobs, pool })
            .await
            .is_err()
        {
            return false;
        }
    }
    true
}
