//! Fault isolation specs
//!
//! A job that fails or panics never takes down its worker, and the trigger's
//! schedule carries on as if the job had succeeded.

use crate::prelude::*;

struct Panicking;

impl Job for Panicking {
    fn execute(&self, _context: &mut JobExecutionContext) -> Result<(), JobExecutionError> {
        panic!("boom");
    }
}

struct Failing;

impl Job for Failing {
    fn execute(&self, _context: &mut JobExecutionContext) -> Result<(), JobExecutionError> {
        Err(JobExecutionError::new("disk full"))
    }
}

fn hourly(name: &str, job: &str, start: DateTime<Utc>) -> Trigger {
    Trigger::builder(TriggerKey::new(name))
        .for_job(JobKey::new(job))
        .start_at(start)
        .with_schedule(SimpleSchedule::repeat_forever(Duration::from_secs(3600)).unwrap())
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_job_completes_with_noop_and_keeps_its_schedule() {
    let harness = Harness::start();
    harness.watch_jobs();
    harness.watch_triggers(harness.events.clone());
    harness
        .scheduler
        .register_job_type(JobType::new("panic", || Panicking));
    let start = Utc::now();

    harness
        .scheduler
        .schedule_job(
            JobDetail::new(JobKey::new("p"), "panic"),
            hourly("t", "p", start),
        )
        .unwrap();
    harness
        .until(|h| h.events.count("trigger:complete") == 1)
        .await;

    let events = harness.events.events();
    assert!(events.contains(&"scheduler:error:job DEFAULT.p panicked".to_string()));
    assert!(events.contains(&"trigger:complete:DEFAULT.t:noop".to_string()));
    assert_eq!(harness.events.count("job:failed:DEFAULT.p"), 1);
    let stored = harness
        .scheduler
        .get_trigger(&TriggerKey::new("t"))
        .unwrap()
        .unwrap();
    assert_eq!(stored.next_fire_time, Some(start + chrono::Duration::hours(1)));
    assert_eq!(
        harness.scheduler.trigger_state(&TriggerKey::new("t")).unwrap(),
        TriggerState::Normal
    );
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_job_is_reported_and_other_jobs_still_run() {
    let harness = Harness::start();
    harness.watch_jobs();
    harness
        .scheduler
        .register_job_type(JobType::new("fail", || Failing));

    harness
        .scheduler
        .schedule_job(
            JobDetail::new(JobKey::new("f"), "fail"),
            hourly("bad", "f", Utc::now()),
        )
        .unwrap();
    harness
        .scheduler
        .schedule_job(job("ok"), once("good", "ok"))
        .unwrap();
    harness
        .until(|h| {
            h.events.count("job:failed:DEFAULT.f") == 1 && h.events.count("job:executed:DEFAULT.ok") == 1
        })
        .await;

    assert!(harness
        .events
        .events()
        .contains(&"job:failed:DEFAULT.f:disk full".to_string()));
    assert_eq!(harness.executions.load(Ordering::SeqCst), 1);
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_job_type_puts_the_trigger_in_error() {
    let harness = Harness::start();

    harness
        .scheduler
        .schedule_job(
            JobDetail::new(JobKey::new("j"), "unregistered").durable(true),
            hourly("t", "j", Utc::now()),
        )
        .unwrap();
    harness
        .until(|h| {
            h.scheduler.trigger_state(&TriggerKey::new("t")).unwrap() == TriggerState::Error
        })
        .await;

    assert!(harness
        .events
        .events()
        .iter()
        .any(|e| e.starts_with("scheduler:error:unable to instantiate job DEFAULT.j")));

    harness
        .scheduler
        .reset_trigger_from_error_state(&TriggerKey::new("t"))
        .unwrap();
    assert_eq!(
        harness.scheduler.trigger_state(&TriggerKey::new("t")).unwrap(),
        TriggerState::Normal
    );
    harness.stop().await;
}
