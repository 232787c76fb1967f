//! Listener matcher specs
//!
//! A listener with several matchers hears about a key when any of them
//! matches.

use crate::prelude::*;

fn in_group(name: &str, group: &str) -> (JobDetail, Trigger) {
    let key = JobKey::with_group(name, group);
    let trigger = Trigger::builder(TriggerKey::with_group(name, group))
        .for_job(key.clone())
        .start_at(Utc::now())
        .build()
        .unwrap();
    (JobDetail::new(key, "count"), trigger)
}

fn executed_groups(listener: &Recorder) -> Vec<String> {
    let mut groups: Vec<String> = listener
        .events()
        .iter()
        .filter_map(|e| e.strip_prefix("job:executed:"))
        .filter_map(|key| key.split('.').next())
        .map(str::to_string)
        .collect();
    groups.sort();
    groups
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn either_matcher_selects_the_listener() {
    let harness = Harness::start();
    let listener = Recorder::new("groups");
    harness
        .scheduler
        .listeners()
        .add_job_listener(
            Arc::new(listener.clone()),
            vec![Matcher::group_equals("A"), Matcher::group_equals("B")],
        )
        .unwrap();

    for (name, group) in [("a1", "A"), ("b1", "B"), ("c1", "C")] {
        let (job, trigger) = in_group(name, group);
        harness.scheduler.schedule_job(job, trigger).unwrap();
    }
    harness
        .until(|h| h.executions.load(Ordering::SeqCst) == 3)
        .await;
    // listener callbacks finish before the store hears about completion
    harness
        .until(|h| h.events.count("scheduler:job_deleted") == 3)
        .await;

    assert_eq!(executed_groups(&listener), vec!["A", "B"]);

    assert!(harness
        .scheduler
        .listeners()
        .jobs()
        .remove_matcher("groups", &Matcher::group_equals("B")));
    for (name, group) in [("a2", "A"), ("b2", "B")] {
        let (job, trigger) = in_group(name, group);
        harness.scheduler.schedule_job(job, trigger).unwrap();
    }
    harness
        .until(|h| h.events.count("scheduler:job_deleted") == 5)
        .await;

    assert_eq!(executed_groups(&listener), vec!["A", "A", "B"]);
    harness.stop().await;
}
