// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::central::CentralHandle;
use crate::errors::{Result, SchedError};
use crate::exec::ExecutionBackend;
use crate::job::Job;

use super::core::CoreRuntime;
use super::{CoreCommand, RunReport, RuntimeEvent};

/// Drives the admission scheduler in response to `RuntimeEvent`s,
/// and delegates job execution to an `ExecutionBackend` (direct mode) or
/// to the central dispatcher (central mode).
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels, injecting periodic ticks and forwarding jobs.
pub struct Runtime<E: ExecutionBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: Arc<E>,
    central: Option<CentralHandle>,
}

impl<E: ExecutionBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("central", &self.central.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutionBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, backend: Arc<E>) -> Self {
        Self {
            core,
            event_rx,
            backend,
            central: None,
        }
    }

    /// Route `EnqueueJobs` commands to a running central manager.
    pub fn with_central(mut self, central: CentralHandle) -> Self {
        self.central = Some(central);
        self
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`, plus a `Tick` every
    ///   `cycle_interval`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("dagsched runtime started");

        let result = self.event_loop().await;

        if let Some(central) = self.central.take() {
            match (&result, central.shutdown().await) {
                (Ok(()), Err(err)) => return Err(err),
                (Err(_), Err(err)) => warn!(error = %err, "central manager failed during shutdown"),
                _ => {}
            }
        }

        result?;
        let report = self.core.report();
        info!(
            completed = report.completed.len(),
            failed_jobs = report.failed_jobs,
            finished = report.finished,
            "runtime exiting"
        );
        Ok(report)
    }

    async fn event_loop(&mut self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.core.options().cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(e) => e,
                    None => {
                        info!("runtime event channel closed; exiting");
                        return Ok(());
                    }
                },
                _ = ticker.tick() => RuntimeEvent::Tick,
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event)?;

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                return Ok(());
            }
        }
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::SubmitJobs(jobs) => self.submit_direct(jobs),
            CoreCommand::EnqueueJobs(jobs) => {
                let Some(central) = self.central.as_ref() else {
                    return Err(SchedError::ConfigError(
                        "central scheduling mode needs a running central manager".to_string(),
                    ));
                };
                debug!(jobs = jobs.len(), "enqueueing jobs with central dispatcher");
                central.submit(jobs).await
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
                Ok(())
            }
        }
    }

    fn submit_direct(&self, jobs: Vec<Job>) -> Result<()> {
        for job in jobs {
            let Some(pool) = job.assignment().map(|a| a.pool.clone()) else {
                return Err(SchedError::InvariantViolation(format!(
                    "direct-mode job {} has no pool assignment",
                    job.id()
                )));
            };
            debug!(job = %job.id(), pool = %pool, "submitting job");
            self.backend.submit_job(job, &pool)?;
        }
        Ok(())
    }
}
