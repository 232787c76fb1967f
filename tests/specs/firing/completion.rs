//! Firing completion specs
//!
//! Verify the listener protocol around one fire and that a trigger that
//! will never fire again is finalized exactly once.

use crate::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_shot_runs_then_is_deleted_and_finalized() {
    let harness = Harness::start();
    harness.watch_jobs();
    harness.watch_triggers(harness.events.clone());

    harness
        .scheduler
        .schedule_job(job("j"), once("t", "j"))
        .unwrap();
    harness
        .until(|h| {
            h.events.count("scheduler:finalized") == 1 && h.events.count("scheduler:job_deleted") == 1
        })
        .await;

    let events: Vec<String> = harness
        .events
        .events()
        .into_iter()
        .filter(|e| !e.starts_with("scheduler:job_deleted"))
        .collect();
    similar_asserts::assert_eq!(
        events,
        vec![
            "trigger:fired:DEFAULT.t:1",
            "job:to_be_executed:DEFAULT.j",
            "job:executed:DEFAULT.j",
            "trigger:complete:DEFAULT.t:delete-trigger",
            "scheduler:finalized:DEFAULT.t",
        ]
    );
    assert_eq!(harness.executions.load(Ordering::SeqCst), 1);
    assert!(harness
        .scheduler
        .get_trigger(&TriggerKey::new("t"))
        .unwrap()
        .is_none());
    assert!(harness
        .scheduler
        .get_job_detail(&JobKey::new("j"))
        .unwrap()
        .is_none());
    assert_eq!(harness.scheduler.metadata().number_of_jobs_executed, 1);
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn veto_skips_the_job_but_consumes_the_fire() {
    let harness = Harness::start();
    harness.watch_jobs();
    harness.watch_triggers(harness.events.clone().vetoing());

    harness
        .scheduler
        .schedule_job(job("j"), once("t", "j"))
        .unwrap();
    harness
        .until(|h| {
            h.events.count("scheduler:finalized") == 1 && h.events.count("scheduler:job_deleted") == 1
        })
        .await;

    let events = harness.events.events();
    assert!(events.contains(&"trigger:fired:DEFAULT.t:1".to_string()));
    assert!(events.contains(&"job:vetoed:DEFAULT.j".to_string()));
    assert_eq!(harness.events.count("job:to_be_executed"), 0);
    assert_eq!(harness.events.count("trigger:complete"), 0);
    assert_eq!(harness.events.count("scheduler:finalized"), 1);
    assert_eq!(harness.executions.load(Ordering::SeqCst), 0);
    assert_eq!(harness.store.queued_triggers(), 0);
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeating_trigger_waits_for_its_next_fire() {
    let harness = Harness::start();
    harness.watch_triggers(harness.events.clone());
    let start = Utc::now();
    let trigger = Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::new("j"))
        .start_at(start)
        .with_schedule(SimpleSchedule::repeat(Duration::from_secs(3600), 2).unwrap())
        .build()
        .unwrap();

    harness.scheduler.schedule_job(job("j"), trigger).unwrap();
    harness
        .until(|h| h.events.count("trigger:complete") == 1)
        .await;

    let stored = harness
        .scheduler
        .get_trigger(&TriggerKey::new("t"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.times_triggered, 1);
    assert_eq!(stored.previous_fire_time, Some(start));
    assert_eq!(
        stored.next_fire_time,
        Some(start + chrono::Duration::hours(1))
    );
    assert_eq!(
        harness.events.events().last().unwrap(),
        "trigger:complete:DEFAULT.t:noop"
    );
    assert_eq!(harness.events.count("scheduler:finalized"), 0);
    harness.stop().await;
}
