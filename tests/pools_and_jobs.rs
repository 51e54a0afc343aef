// tests/pools_and_jobs.rs

mod common;
use crate::common::dag::{compute, transfer};
use crate::common::{init_tracing, pool_refs, with_timeout};

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;

use dagsched::dag::Task;
use dagsched::engine::RuntimeEvent;
use dagsched::errors::{PoolError, SchedError};
use dagsched::exec::{ExecutionBackend, SimulatedBackend, TaskProfile};
use dagsched::job::{Assignment, JobBuilder};
use dagsched::resource::{CoreSnapshot, ResourcePool, SharedPool};
use dagsched::sched::{FailureCause, JobNotification};

#[test]
fn job_needs_the_largest_task_requirement() {
    let tasks: Vec<Task> = vec![compute("a", 0, 2), compute("b", 0, 5), compute("c", 0, 1)];

    let job = JobBuilder::from_tasks(&tasks).unwrap();

    assert_eq!(job.min_cores(), 5);
    assert_eq!(job.task_ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert!(!job.is_transfer());
}

#[test]
fn empty_job_is_rejected() {
    let none: Vec<&Task> = Vec::new();
    assert!(matches!(JobBuilder::from_tasks(none), Err(SchedError::EmptyJob)));
}

#[test]
fn job_ids_are_unique() {
    let t = compute("a", 0, 1);
    let a = JobBuilder::single(&t);
    let b = JobBuilder::single(&t);
    assert_ne!(a.id(), b.id());
}

#[test]
fn shared_pool_reserves_and_releases() {
    let pool = SharedPool::new("p", &[4, 2]);

    assert_eq!(pool.reserve_on_host(0, 3).unwrap(), 3);
    assert_eq!(pool.idle_cores().unwrap(), vec![1, 2]);

    let spread = pool.reserve_spread(2);
    assert_eq!(spread, vec![1, 1]);
    assert_eq!(pool.total_idle_cores().unwrap(), 1);

    pool.release(0, 3);
    pool.release_spread(&spread);
    assert_eq!(pool.idle_cores().unwrap(), vec![4, 2]);

    // Never above the host total.
    pool.release(1, 10);
    assert_eq!(pool.idle_cores().unwrap(), vec![4, 2]);

    assert_eq!(
        pool.reserve_on_host(7, 1),
        Err(PoolError::UnknownHost {
            pool: "p".to_string(),
            host: 7
        })
    );
}

#[test]
fn unavailable_pool_reads_as_zero_capacity_in_snapshots() {
    init_tracing();

    let down = SharedPool::new("down", &[8]);
    let up = SharedPool::new("up", &[2, 2]);
    down.set_available(false);

    assert_eq!(
        down.idle_cores(),
        Err(PoolError::Unavailable("down".to_string()))
    );

    let snap = CoreSnapshot::capture(&pool_refs(&[down.clone(), up]));
    assert_eq!(snap.idle_of("down"), Some(&[][..]));
    assert_eq!(snap.idle_of("up"), Some(&[2, 2][..]));
    assert_eq!(snap.first_pool(), Some("down"));

    down.set_available(true);
    let snap = CoreSnapshot::capture(&pool_refs(&[down]));
    assert_eq!(snap.idle_of("down"), Some(&[8][..]));
}

#[tokio::test]
async fn simulated_backend_holds_cores_while_a_job_runs() {
    init_tracing();

    let pool = SharedPool::new("p", &[4]);
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);
    let profiles = HashMap::from([(
        "a".to_string(),
        TaskProfile {
            runtime: Duration::from_millis(50),
            fail_times: 0,
        },
    )]);
    let backend = SimulatedBackend::new([pool.clone()], profiles, tx);

    let task = compute("a", 0, 3);
    let mut job = JobBuilder::single(&task);
    job.assign(Assignment {
        pool: "p".to_string(),
        host: Some(0),
    });
    let id = job.id();

    backend.submit_job(job, "p").unwrap();
    assert_eq!(pool.idle_cores().unwrap(), vec![1]);

    match with_timeout(rx.recv()).await {
        Some(RuntimeEvent::JobFinished(JobNotification::Completed(done))) => {
            assert_eq!(done.id(), id)
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(pool.idle_cores().unwrap(), vec![4]);
}

#[tokio::test]
async fn simulated_backend_fails_configured_attempts_first() {
    let pool = SharedPool::new("p", &[1]);
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);
    let profiles = HashMap::from([(
        "flaky".to_string(),
        TaskProfile {
            runtime: Duration::from_millis(1),
            fail_times: 1,
        },
    )]);
    let backend = SimulatedBackend::new([pool], profiles, tx);
    let task = transfer("flaky", 0);

    backend.submit_job(JobBuilder::single(&task), "p").unwrap();
    let first = with_timeout(rx.recv()).await;
    assert!(matches!(
        first,
        Some(RuntimeEvent::JobFinished(JobNotification::Failed {
            cause: FailureCause::Execution(_),
            ..
        }))
    ));

    backend.submit_job(JobBuilder::single(&task), "p").unwrap();
    let second = with_timeout(rx.recv()).await;
    assert!(matches!(
        second,
        Some(RuntimeEvent::JobFinished(JobNotification::Completed(_)))
    ));
}

#[tokio::test]
async fn simulated_backend_reports_unknown_pool_as_failure() {
    let (tx, mut rx) = mpsc::channel::<RuntimeEvent>(8);
    let backend = SimulatedBackend::new(Vec::<SharedPool>::new(), HashMap::new(), tx);

    backend
        .submit_job(JobBuilder::single(&compute("a", 0, 1)), "nowhere")
        .unwrap();

    assert!(matches!(
        with_timeout(rx.recv()).await,
        Some(RuntimeEvent::JobFinished(JobNotification::Failed {
            cause: FailureCause::PoolUnavailable(_),
            ..
        }))
    ));
}
