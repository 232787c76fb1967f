//! In-memory store specs
//!
//! Misfires, exclusive jobs, and paused groups as seen through a running
//! scheduler.

use crate::prelude::*;
use kairos_core::GroupMatcher;

struct Serial {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    done: Arc<AtomicUsize>,
}

impl Job for Serial {
    fn execute(&self, _context: &mut JobExecutionContext) -> Result<(), JobExecutionError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn late_one_shot_is_reported_as_misfired_and_fires_now() {
    let harness = Harness::start();
    harness.watch_triggers(harness.events.clone());
    let trigger = Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::new("j"))
        .start_at(Utc::now() - chrono::Duration::minutes(10))
        .build()
        .unwrap();

    harness.scheduler.schedule_job(job("j"), trigger).unwrap();
    harness
        .until(|h| h.executions.load(Ordering::SeqCst) == 1)
        .await;

    let events = harness.events.events();
    assert_eq!(events[0], "trigger:misfired:DEFAULT.t");
    assert_eq!(events[1], "trigger:fired:DEFAULT.t:1");
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exclusive_job_never_runs_twice_at_once() {
    let harness = Harness::start();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));
    let (r, p, d) = (running.clone(), peak.clone(), done.clone());
    harness.scheduler.register_job_type(
        JobType::new("serial", move || Serial {
            running: Arc::clone(&r),
            peak: Arc::clone(&p),
            done: Arc::clone(&d),
        })
        .disallow_concurrent_execution(),
    );
    let start = Utc::now();
    let job = JobDetail::new(JobKey::new("s"), "serial").durable(true);
    let at_start = |name: &str| {
        Trigger::builder(TriggerKey::new(name))
            .for_job(JobKey::new("s"))
            .start_at(start)
            .build()
            .unwrap()
    };

    harness.scheduler.schedule_job(job, at_start("a")).unwrap();
    harness.scheduler.schedule_trigger(at_start("b")).unwrap();
    harness
        .until(|_| done.load(Ordering::SeqCst) == 2)
        .await;

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    let stored = harness
        .scheduler
        .get_job_detail(&JobKey::new("s"))
        .unwrap()
        .unwrap();
    assert!(stored.is_concurrent_execution_disallowed());
    harness.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn paused_job_group_holds_new_triggers_until_resumed() {
    let harness = Harness::start();
    let paused = harness
        .scheduler
        .pause_jobs(&GroupMatcher::equals("reports"))
        .unwrap();
    assert_eq!(paused, vec!["reports"]);

    let job = JobDetail::new(JobKey::with_group("daily", "reports"), "count");
    let trigger = Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::with_group("daily", "reports"))
        .start_at(Utc::now())
        .build()
        .unwrap();
    harness.scheduler.schedule_job(job, trigger).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.executions.load(Ordering::SeqCst), 0);
    assert_eq!(
        harness.scheduler.trigger_state(&TriggerKey::new("t")).unwrap(),
        TriggerState::Paused
    );

    harness
        .scheduler
        .resume_jobs(&GroupMatcher::equals("reports"))
        .unwrap();
    harness
        .until(|h| h.executions.load(Ordering::SeqCst) == 1)
        .await;
    harness.stop().await;
}
