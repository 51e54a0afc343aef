// tests/central_dispatcher.rs

mod common;
use crate::common::dag::compute;
use crate::common::fake_backend::FakeBackend;
use crate::common::{init_tracing, pool_refs, with_timeout};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use dagsched::central::{spawn_central_manager, CentralDispatcher, Matched, NegotiationOutcome};
use dagsched::engine::RuntimeEvent;
use dagsched::errors::{PoolError, SchedError};
use dagsched::exec::ExecutionBackend;
use dagsched::job::{Job, JobBuilder};
use dagsched::resource::{PoolRef, ResourcePool, SharedPool};

fn job(id: &str, cores: u32) -> Job {
    JobBuilder::single(&compute(id, 0, cores))
}

#[test]
fn submit_accepts_and_rejects_duplicates() {
    let mut dispatcher = CentralDispatcher::new();
    let a = job("a", 1);

    dispatcher.submit(a.clone()).unwrap();
    let err = dispatcher.submit(a.clone()).unwrap_err();

    assert!(matches!(err, SchedError::DuplicateJob(id) if id == a.id()));
    assert_eq!(dispatcher.pending_len(), 1);
}

#[test]
fn at_most_one_cycle_in_flight() {
    let mut dispatcher = CentralDispatcher::new();
    assert!(dispatcher.tick().is_none(), "empty queue starts no cycle");

    dispatcher.submit(job("a", 1)).unwrap();
    let cycle = dispatcher.tick().expect("cycle should start");
    assert!(dispatcher.is_negotiating());
    assert!(dispatcher.tick().is_none());

    // Submission is never blocked by an active cycle.
    dispatcher.submit(job("b", 1)).unwrap();
    assert_eq!(dispatcher.pending_len(), 2);
    assert_eq!(cycle.jobs().len(), 1);

    let outcome = NegotiationOutcome {
        cycle_id: cycle.id(),
        ..Default::default()
    };
    assert_eq!(dispatcher.on_negotiation_done(&outcome).unwrap(), 0);
    assert!(!dispatcher.is_negotiating());

    let next = dispatcher.tick().expect("next cycle should start");
    assert_eq!(next.jobs().len(), 2);
    assert_ne!(next.id(), cycle.id());
}

#[test]
fn outcome_without_active_cycle_is_an_invariant_violation() {
    let mut dispatcher = CentralDispatcher::new();

    let err = dispatcher
        .on_negotiation_done(&NegotiationOutcome::default())
        .unwrap_err();

    assert!(matches!(err, SchedError::InvariantViolation(_)));
}

#[test]
fn outcome_for_another_cycle_is_an_invariant_violation() {
    let mut dispatcher = CentralDispatcher::new();
    dispatcher.submit(job("a", 1)).unwrap();
    let cycle = dispatcher.tick().unwrap();

    let err = dispatcher
        .on_negotiation_done(&NegotiationOutcome {
            cycle_id: cycle.id() + 1,
            ..Default::default()
        })
        .unwrap_err();

    assert!(matches!(err, SchedError::InvariantViolation(_)));
    assert!(dispatcher.is_negotiating());
}

#[test]
fn negotiation_matches_against_fresh_pool_reads() {
    init_tracing();

    let small = SharedPool::new("small", &[2]);
    let large = SharedPool::new("large", &[4]);
    let pools = pool_refs(&[small.clone(), large.clone()]);
    let backend = FakeBackend::recording().reserving([small.clone(), large.clone()]);

    let mut dispatcher = CentralDispatcher::new();
    let (a, b, c) = (job("a", 3), job("b", 2), job("c", 4));
    for j in [&a, &b, &c] {
        dispatcher.submit(j.clone()).unwrap();
    }

    let outcome = dispatcher.tick().unwrap().run(&pools, &backend);

    assert_eq!(
        outcome.scheduled,
        vec![
            Matched {
                job: a.id(),
                pool: "large".to_string()
            },
            Matched {
                job: b.id(),
                pool: "small".to_string()
            },
        ]
    );
    assert!(outcome.failed.is_empty());

    dispatcher.on_negotiation_done(&outcome).unwrap();
    assert_eq!(dispatcher.pending_ids(), vec![c.id()]);

    let submitted = backend.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].pool, "large");
    assert_eq!(
        submitted[0].job.assignment().map(|a| a.pool.as_str()),
        Some("large")
    );
}

#[test]
fn unmatched_head_keeps_its_place() {
    let (pool, pools) = {
        let p = SharedPool::new("p", &[2]);
        let refs = pool_refs(&[p.clone()]);
        (p, refs)
    };
    let backend = FakeBackend::recording().reserving([pool]);

    let mut dispatcher = CentralDispatcher::new();
    let big = job("big", 8);
    dispatcher.submit(big.clone()).unwrap();
    dispatcher.submit(job("s1", 1)).unwrap();
    dispatcher.submit(job("s2", 1)).unwrap();

    let outcome = dispatcher.tick().unwrap().run(&pools, &backend);
    assert_eq!(outcome.scheduled.len(), 2);
    dispatcher.on_negotiation_done(&outcome).unwrap();

    let late = job("late", 1);
    dispatcher.submit(late.clone()).unwrap();
    assert_eq!(dispatcher.pending_ids(), vec![big.id(), late.id()]);
}

#[test]
fn faulting_pool_is_skipped() {
    init_tracing();

    let down = SharedPool::new("down", &[8]);
    let up = SharedPool::new("up", &[2]);
    down.set_available(false);
    let pools = pool_refs(&[down, up]);
    let backend = FakeBackend::recording();

    let mut dispatcher = CentralDispatcher::new();
    dispatcher.submit(job("a", 2)).unwrap();

    let outcome = dispatcher.tick().unwrap().run(&pools, &backend);

    assert_eq!(outcome.scheduled.len(), 1);
    assert_eq!(outcome.scheduled[0].pool, "up");
}

/// Fails its first capacity query, then reports `idle` forever after.
#[derive(Debug)]
struct FlakyPool {
    idle: Vec<u32>,
    failed_once: AtomicBool,
}

impl ResourcePool for FlakyPool {
    fn id(&self) -> &str {
        "flaky"
    }

    fn host_count(&self) -> usize {
        self.idle.len()
    }

    fn idle_cores(&self) -> Result<Vec<u32>, PoolError> {
        if self.failed_once.swap(true, Ordering::SeqCst) {
            Ok(self.idle.clone())
        } else {
            Err(PoolError::Unavailable("flaky".to_string()))
        }
    }
}

#[test]
fn pool_that_faults_stays_skipped_for_the_rest_of_the_cycle() {
    init_tracing();

    let flaky: PoolRef = Arc::new(FlakyPool {
        idle: vec![8],
        failed_once: AtomicBool::new(false),
    });
    let up = SharedPool::new("up", &[1]);
    let pools = vec![flaky, Arc::new(up) as PoolRef];
    let backend = FakeBackend::recording();

    let mut dispatcher = CentralDispatcher::new();
    let (a, b) = (job("a", 1), job("b", 1));
    dispatcher.submit(a.clone()).unwrap();
    dispatcher.submit(b.clone()).unwrap();

    let outcome = dispatcher.tick().unwrap().run(&pools, &backend);

    // `up` is not reserved by the recording backend, so `b` still fits there.
    assert_eq!(
        outcome.scheduled,
        vec![
            Matched {
                job: a.id(),
                pool: "up".to_string()
            },
            Matched {
                job: b.id(),
                pool: "up".to_string()
            },
        ]
    );

    // The next cycle reads the recovered pool again.
    dispatcher.on_negotiation_done(&outcome).unwrap();
    dispatcher.submit(job("c", 4)).unwrap();
    let outcome = dispatcher.tick().unwrap().run(&pools, &backend);
    assert_eq!(outcome.scheduled[0].pool, "flaky");
}

#[test]
fn refused_submission_stays_queued() {
    let pools = pool_refs(&[SharedPool::new("p", &[4])]);
    let backend = FakeBackend::refusing();

    let mut dispatcher = CentralDispatcher::new();
    let a = job("a", 1);
    dispatcher.submit(a.clone()).unwrap();

    let outcome = dispatcher.tick().unwrap().run(&pools, &backend);
    assert_eq!(outcome.failed, vec![a.id()]);

    dispatcher.on_negotiation_done(&outcome).unwrap();
    assert_eq!(dispatcher.pending_ids(), vec![a.id()]);
}

#[test]
fn withdraw_removes_only_the_named_job() {
    let mut dispatcher = CentralDispatcher::new();
    let (a, b) = (job("a", 1), job("b", 1));
    dispatcher.submit(a.clone()).unwrap();
    dispatcher.submit(b.clone()).unwrap();

    let removed = dispatcher.withdraw(a.id()).expect("a was queued");
    assert_eq!(removed.id(), a.id());
    assert!(dispatcher.withdraw(a.id()).is_none());
    assert_eq!(dispatcher.pending_ids(), vec![b.id()]);
}

#[tokio::test]
async fn manager_dispatches_queued_jobs_and_reports_placements() {
    init_tracing();

    let pool = SharedPool::new("p", &[4]);
    let backend = Arc::new(FakeBackend::recording().reserving([pool.clone()]));
    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(16);

    let handle = spawn_central_manager(
        pool_refs(&[pool.clone()]),
        Arc::clone(&backend) as Arc<dyn ExecutionBackend>,
        rt_tx,
        Duration::from_millis(5),
    );

    let (a, b) = (job("a", 2), job("b", 2));
    handle.submit(vec![a.clone(), b.clone()]).await.unwrap();

    let event = with_timeout(rt_rx.recv()).await.expect("runtime channel open");
    match event {
        RuntimeEvent::JobsDispatched { jobs, pool } => {
            assert_eq!(pool, "p");
            assert_eq!(jobs, vec![a.id(), b.id()]);
        }
        other => panic!("expected JobsDispatched, got {other:?}"),
    }

    assert_eq!(backend.submitted().len(), 2);
    assert_eq!(pool.hosts()[0].idle, 0);

    handle.shutdown().await.unwrap();
}
