// tests/admission_scenarios.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::dag::{compute, singleton, transfer, StaticDag};
use crate::common::{init_tracing, pool_refs, single_pool};

use dagsched::dag::{DagProvider, Workflow};
use dagsched::errors::SchedError;
use dagsched::job::{Job, JobBuilder};
use dagsched::resource::{CoreSnapshot, PoolSnapshot, SharedPool};
use dagsched::sched::{
    AdmissionConfig, AdmissionScheduler, AdmissionStep, FailureCause, JobNotification, RunningLevel,
};
use dagsched::types::SchedulingMode;

fn direct(batch_size: usize) -> AdmissionScheduler {
    AdmissionScheduler::new(AdmissionConfig {
        batch_size,
        mode: SchedulingMode::Direct,
    })
}

fn snapshot(idle: &[u32]) -> CoreSnapshot {
    CoreSnapshot::from_pools(vec![PoolSnapshot {
        pool: "p".to_string(),
        idle: idle.to_vec(),
    }])
}

/// Jobs leave the ready set once handed off, like the workflow does.
fn hand_off(dag: &mut StaticDag, step: &AdmissionStep) {
    for job in &step.jobs {
        for id in job.task_ids() {
            dag.set_ready(id, false);
        }
    }
}

fn job_for<'a>(step: &'a AdmissionStep, task: &str) -> &'a Job {
    step.jobs
        .iter()
        .find(|j| j.task_ids().any(|t| t == task))
        .unwrap_or_else(|| panic!("no job for {task}"))
}

#[test]
fn child_inherits_raised_parent_priority() {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .with_pool("p", &[4])
        .with_task("T1", TaskConfigBuilder::new().build())
        .with_task("T2", TaskConfigBuilder::new().after("T1").build())
        .build();
    let mut wf = Workflow::from_config(&cfg);
    let (_pool, pools) = single_pool(&[4]);
    let mut sched = direct(5);

    let step = sched.schedule(&mut wf, &pools).unwrap();
    assert_eq!(step.admitted, vec!["T1".to_string()]);
    let t1_job = step.jobs[0].clone();
    wf.mark_submitted(t1_job.task_ids());

    assert!(wf.set_priority("T1", 5));

    sched
        .on_job_notification(&JobNotification::Completed(t1_job.clone()))
        .unwrap();
    wf.mark_completed(t1_job.task_ids());

    let step = sched.schedule(&mut wf, &pools).unwrap();
    assert_eq!(step.admitted, vec!["T2".to_string()]);
    assert_eq!(wf.task("T2").unwrap().priority, 5);
}

#[test]
fn inheritance_never_lowers_priority() {
    let mut dag = StaticDag::new()
        .with_waiting_task(compute("parent", 0, 1).with_priority(1))
        .with_task(compute("child", 1, 1).with_priority(7))
        .with_edge("parent", "child");
    let mut sched = direct(5);

    sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[4]))
        .unwrap();

    assert_eq!(dag.priority_of("child"), Some(7));
}

#[test]
fn first_fit_packs_three_two_one_onto_four_two() {
    init_tracing();

    let mut dag = StaticDag::new()
        .with_task(compute("a", 0, 3))
        .with_task(compute("b", 0, 2))
        .with_task(compute("c", 0, 1));
    let mut sched = direct(5);
    let mut snap = snapshot(&[4, 2]);

    let step = sched.schedule_with_snapshot(&mut dag, &mut snap).unwrap();

    let hosts: Vec<Option<usize>> = ["a", "b", "c"]
        .iter()
        .map(|t| job_for(&step, t).assignment().and_then(|a| a.host))
        .collect();
    assert_eq!(hosts, vec![Some(0), Some(1), Some(0)]);
    assert_eq!(snap.idle_of("p"), Some(&[0, 0][..]));
    assert!(step.unplaced.is_empty());
}

#[test]
fn task_that_fits_nowhere_stays_pending_and_keeps_its_slot() {
    init_tracing();

    let mut dag = StaticDag::new()
        .with_task(compute("a", 0, 3))
        .with_task(compute("b", 0, 3))
        .with_task(compute("c", 0, 1));
    let mut sched = direct(5);
    let mut snap = snapshot(&[4, 2]);

    let step = sched.schedule_with_snapshot(&mut dag, &mut snap).unwrap();
    hand_off(&mut dag, &step);

    assert_eq!(step.admitted.len(), 3);
    assert_eq!(step.unplaced, vec!["b".to_string()]);
    assert_eq!(sched.pending_tasks(), vec!["b".to_string()]);
    assert_eq!(snap.idle_of("p"), Some(&[0, 2][..]));
    // b is admitted, so it is counted even without a host.
    assert_eq!(sched.running_level(), RunningLevel { level: 0, count: 3 });

    let a_job = job_for(&step, "a").clone();
    sched
        .on_job_notification(&JobNotification::Completed(a_job))
        .unwrap();

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[4, 2]))
        .unwrap();
    assert!(step.admitted.is_empty());
    assert_eq!(
        job_for(&step, "b").assignment().and_then(|a| a.host),
        Some(0)
    );
    assert!(sched.pending_tasks().is_empty());
    assert!(sched.is_scheduled("b"));
}

#[test]
fn failure_at_level_two_rolls_counter_back() {
    init_tracing();

    let mut dag = StaticDag::new()
        .with_task(compute("a", 0, 1))
        .with_waiting_task(compute("b", 1, 1))
        .with_waiting_task(compute("x", 2, 1));
    let mut sched = direct(5);

    // Walk the wave up to level 2.
    for (done, next) in [("a", "b"), ("b", "x")] {
        let step = sched
            .schedule_with_snapshot(&mut dag, &mut snapshot(&[4]))
            .unwrap();
        hand_off(&mut dag, &step);
        sched
            .on_job_notification(&JobNotification::Completed(job_for(&step, done).clone()))
            .unwrap();
        dag.set_ready(next, true);
    }

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[4]))
        .unwrap();
    hand_off(&mut dag, &step);
    assert_eq!(sched.running_level(), RunningLevel { level: 2, count: 1 });

    let failed = JobNotification::Failed {
        job: job_for(&step, "x").clone(),
        cause: FailureCause::Execution("exit 1".to_string()),
    };
    sched.on_job_notification(&failed).unwrap();

    assert_eq!(sched.running_level(), RunningLevel { level: 2, count: 0 });
    assert!(!sched.is_scheduled("x"));

    // The workflow re-readies x; it is admitted again at the same level.
    dag.set_ready("x", true);
    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[4]))
        .unwrap();
    assert_eq!(step.admitted, vec!["x".to_string()]);
    assert_eq!(sched.running_level(), RunningLevel { level: 2, count: 1 });
}

#[test]
fn batch_cap_limits_admissions_by_priority() {
    let mut dag = StaticDag::new();
    for i in 0..7 {
        dag = dag.with_task(compute(&format!("t{i}"), 0, 1).with_priority(i));
    }
    let mut sched = direct(5);

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[16]))
        .unwrap();
    hand_off(&mut dag, &step);

    assert_eq!(
        step.admitted,
        vec!["t6", "t5", "t4", "t3", "t2"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[16]))
        .unwrap();
    assert_eq!(step.admitted, vec!["t1".to_string(), "t0".to_string()]);
}

#[test]
fn ties_break_on_task_id() {
    let mut dag = StaticDag::new()
        .with_task(compute("b", 0, 1))
        .with_task(compute("a", 0, 1))
        .with_task(compute("c", 0, 1));
    let mut sched = direct(2);

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();

    assert_eq!(step.admitted, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn level_gate_holds_deeper_levels_back() {
    init_tracing();

    let mut dag = StaticDag::new()
        .with_task(compute("a", 0, 1))
        .with_task(compute("c", 2, 1))
        .with_task(compute("d", 1, 1));
    let mut sched = direct(5);

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();
    hand_off(&mut dag, &step);
    // c is two levels ahead, d waits for level 0 to drain.
    assert_eq!(step.admitted, vec!["a".to_string()]);

    sched
        .on_job_notification(&JobNotification::Completed(job_for(&step, "a").clone()))
        .unwrap();

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();
    hand_off(&mut dag, &step);
    assert_eq!(step.admitted, vec!["d".to_string()]);
    assert_eq!(sched.running_level(), RunningLevel { level: 1, count: 1 });

    let blocked = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();
    assert!(blocked.admitted.is_empty());

    sched
        .on_job_notification(&JobNotification::Completed(job_for(&step, "d").clone()))
        .unwrap();

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();
    assert_eq!(step.admitted, vec!["c".to_string()]);
}

#[test]
fn lower_levels_stay_admissible_after_the_wave_moves_on() {
    let mut dag = StaticDag::new()
        .with_task(compute("late_root", 0, 1))
        .with_task(compute("next", 1, 1).with_priority(10));
    let mut sched = direct(5);

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();

    assert_eq!(step.admitted, vec!["next".to_string(), "late_root".to_string()]);
    assert_eq!(sched.running_level(), RunningLevel { level: 1, count: 1 });
}

#[test]
fn singleton_tasks_never_overlap() {
    init_tracing();

    let mut dag = StaticDag::new()
        .with_task(singleton("register_1", 0))
        .with_task(singleton("register_2", 0))
        .with_task(compute("other", 0, 1));
    let mut sched = direct(5);

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();
    hand_off(&mut dag, &step);
    assert_eq!(
        step.admitted,
        vec!["other".to_string(), "register_1".to_string()]
    );
    assert_eq!(sched.running_singletons(), 1);

    let step2 = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();
    assert!(step2.admitted.is_empty());

    sched
        .on_job_notification(&JobNotification::Completed(
            job_for(&step, "register_1").clone(),
        ))
        .unwrap();
    assert_eq!(sched.running_singletons(), 0);

    let step3 = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[8]))
        .unwrap();
    assert_eq!(step3.admitted, vec!["register_2".to_string()]);
}

#[test]
fn transfer_tasks_bypass_core_packing() {
    let mut dag = StaticDag::new().with_task(transfer("stage_in", 0));
    let mut sched = direct(5);
    let mut snap = snapshot(&[0, 0]);

    let step = sched.schedule_with_snapshot(&mut dag, &mut snap).unwrap();

    let assignment = step.jobs[0].assignment().unwrap();
    assert_eq!(assignment.pool, "p");
    assert_eq!(assignment.host, None);
    assert_eq!(snap.idle_of("p"), Some(&[0, 0][..]));
}

#[test]
fn faulting_pool_is_skipped_for_the_cycle() {
    init_tracing();

    let broken = SharedPool::new("broken", &[8]);
    let healthy = SharedPool::new("healthy", &[2]);
    broken.set_available(false);
    let pools = pool_refs(&[broken.clone(), healthy]);

    let mut dag = StaticDag::new().with_task(compute("a", 0, 2));
    let mut sched = direct(5);

    let step = sched.schedule(&mut dag, &pools).unwrap();

    let assignment = step.jobs[0].assignment().unwrap();
    assert_eq!(assignment.pool, "healthy");
    assert_eq!(assignment.host, Some(0));
}

#[test]
fn pending_retry_does_not_use_batch_slots() {
    init_tracing();

    let (pool, pools) = single_pool(&[4]);
    pool.set_available(false);

    let mut dag = StaticDag::new()
        .with_task(compute("a", 0, 1).with_priority(2))
        .with_task(compute("b", 0, 1));
    let mut sched = direct(1);

    let step = sched.schedule(&mut dag, &pools).unwrap();
    assert_eq!(step.admitted, vec!["a".to_string()]);
    assert_eq!(step.unplaced, vec!["a".to_string()]);
    assert!(step.jobs.is_empty());

    pool.set_available(true);
    let step = sched.schedule(&mut dag, &pools).unwrap();

    assert_eq!(step.admitted, vec!["b".to_string()]);
    let mut placed: Vec<String> = step
        .jobs
        .iter()
        .flat_map(|j| j.task_ids().map(String::from).collect::<Vec<_>>())
        .collect();
    placed.sort();
    assert_eq!(placed, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn completion_above_the_running_level_is_an_invariant_violation() {
    init_tracing();

    let mut dag = StaticDag::new().with_task(compute("x", 0, 1));
    let mut sched = direct(5);

    let step = sched
        .schedule_with_snapshot(&mut dag, &mut snapshot(&[4]))
        .unwrap();
    hand_off(&mut dag, &step);
    assert_eq!(sched.running_level(), RunningLevel { level: 0, count: 1 });

    // Same task id, but reported at level 3.
    let stale = JobBuilder::single(&compute("x", 3, 1));
    let err = sched
        .on_job_notification(&JobNotification::Completed(stale))
        .unwrap_err();

    assert!(matches!(err, SchedError::InvariantViolation(_)));
    assert!(sched.is_scheduled("x"));
    assert_eq!(sched.running_level(), RunningLevel { level: 0, count: 1 });
}

#[test]
fn notification_for_unscheduled_job_is_an_invariant_violation() {
    let task = compute("ghost", 0, 1);
    let mut sched = direct(5);

    let err = sched
        .on_job_notification(&JobNotification::Completed(JobBuilder::single(&task)))
        .unwrap_err();

    assert!(matches!(err, SchedError::InvariantViolation(_)));
    assert_eq!(sched.running_level(), RunningLevel::default());
}

#[test]
fn central_mode_queues_every_admitted_task_unplaced() {
    let mut dag = StaticDag::new()
        .with_task(compute("big", 0, 64))
        .with_task(compute("small", 0, 1));
    let mut sched = AdmissionScheduler::new(AdmissionConfig {
        batch_size: 5,
        mode: SchedulingMode::Central,
    });
    let (_pool, pools) = single_pool(&[2]);

    let step = sched.schedule(&mut dag, &pools).unwrap();

    assert_eq!(step.jobs.len(), 2);
    assert!(step.jobs.iter().all(|j| j.assignment().is_none()));
    assert!(step.unplaced.is_empty());
    assert_eq!(sched.scheduled_count(), 2);
}
