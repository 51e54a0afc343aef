// src/lib.rs

pub mod central;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod resource;
pub mod sched;
pub mod trace;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::central::spawn_central_manager;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{DagProvider, Workflow};
use crate::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::SchedError;
use crate::exec::{ExecutionBackend, SimulatedBackend};
use crate::resource::{PoolRef, SharedPool};
use crate::sched::{AdmissionConfig, AdmissionScheduler};
use crate::types::SchedulingMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading + CLI overrides
/// - workflow / admission scheduler / runtime
/// - simulated execution backend
/// - (central mode) the central dispatcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    apply_overrides(&mut cfg, &args)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let report = run_with_channel(&cfg, rt_tx, rt_rx).await?;
    print_report(&report);

    if !report.finished {
        anyhow::bail!(
            "workflow did not finish: {} task(s) completed, {} job(s) failed",
            report.completed.len(),
            report.failed_jobs
        );
    }
    Ok(())
}

/// Run a validated config against the simulated backend until the
/// workflow is over.
pub async fn run_config(cfg: &ConfigFile) -> Result<RunReport> {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);
    run_with_channel(cfg, rt_tx, rt_rx).await
}

async fn run_with_channel(
    cfg: &ConfigFile,
    rt_tx: mpsc::Sender<RuntimeEvent>,
    rt_rx: mpsc::Receiver<RuntimeEvent>,
) -> Result<RunReport> {
    let shared: Vec<SharedPool> = cfg.pool.iter().map(SharedPool::from_config).collect();
    let pools: Vec<PoolRef> = shared
        .iter()
        .map(|p| Arc::new(p.clone()) as PoolRef)
        .collect();

    let workflow = Workflow::from_config(cfg);
    let scheduler = AdmissionScheduler::new(AdmissionConfig {
        batch_size: cfg.scheduler.batch_size,
        mode: cfg.scheduler.mode,
    });
    let options = RuntimeOptions {
        abort_on_failure: cfg.scheduler.abort_on_failure,
        cycle_interval: cfg.scheduler.cycle_interval(),
    };

    info!(
        mode = %cfg.scheduler.mode,
        tasks = workflow.len(),
        pools = pools.len(),
        batch_size = cfg.scheduler.batch_size,
        "starting workflow"
    );

    let backend = Arc::new(SimulatedBackend::from_config(cfg, shared, rt_tx.clone()));
    let core = CoreRuntime::new(workflow, scheduler, pools.clone(), options);
    let mut runtime = Runtime::new(core, rt_rx, Arc::clone(&backend));

    if cfg.scheduler.mode == SchedulingMode::Central {
        let handle = spawn_central_manager(
            pools,
            backend as Arc<dyn ExecutionBackend>,
            rt_tx,
            cfg.scheduler.negotiation_interval(),
        );
        runtime = runtime.with_central(handle);
    }

    Ok(runtime.run().await?)
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> std::result::Result<(), SchedError> {
    if let Some(mode) = args.mode {
        cfg.scheduler.mode = mode.into();
    }
    if let Some(batch_size) = args.batch_size {
        if batch_size == 0 {
            return Err(SchedError::ConfigError("--batch-size must be at least 1".to_string()));
        }
        cfg.scheduler.batch_size = batch_size;
    }
    Ok(())
}

/// Dry-run output: pools, then tasks with their levels and classes.
fn print_dry_run(cfg: &ConfigFile) {
    let workflow = Workflow::from_config(cfg);

    println!("dagsched dry-run");
    println!("  scheduler.mode = {}", cfg.scheduler.mode);
    println!("  scheduler.batch_size = {}", cfg.scheduler.batch_size);
    println!("  scheduler.singleton_prefix = {:?}", cfg.scheduler.singleton_prefix);
    println!();

    println!("pools ({}):", cfg.pool.len());
    for pool in &cfg.pool {
        println!("  - {}: hosts {:?}", pool.name, pool.hosts);
    }
    println!();

    println!("tasks ({}):", workflow.len());
    for task in workflow.tasks() {
        println!(
            "  - {} (level {}, {:?}, cores {}, priority {})",
            task.id, task.level, task.class, task.min_cores, task.priority
        );
        let parents = workflow.parents_of(&task.id);
        if !parents.is_empty() {
            println!("      after: {parents:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_report(report: &RunReport) {
    print!("{}", report.trace);
    println!();
    println!(
        "completed {} task(s), {} failed job(s){}",
        report.completed.len(),
        report.failed_jobs,
        match report.trace.makespan() {
            Some(m) => format!(", makespan {:.3}s", m.as_secs_f64()),
            None => String::new(),
        }
    );
}
