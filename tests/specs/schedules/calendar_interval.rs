//! Calendar interval specs
//!
//! Month arithmetic clamps to the end of shorter months and stays clamped;
//! day steps can keep the local hour across daylight-saving changes.

use crate::prelude::*;
use chrono_tz::Europe::London;
use chrono_tz::UTC;
use kairos_core::{CalendarIntervalSchedule, IntervalUnit};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn trigger(start: DateTime<Utc>, schedule: CalendarIntervalSchedule) -> Trigger {
    Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::new("j"))
        .start_at(start)
        .with_schedule(schedule)
        .build()
        .unwrap()
}

#[test]
fn monthly_from_the_31st_clamps_and_stays_clamped() {
    let monthly = CalendarIntervalSchedule::new(1, IntervalUnit::Month, UTC).unwrap();
    let times = trigger(at(2024, 1, 31, 6, 0), monthly).compute_fire_times(None, 6);

    let days: Vec<u32> = times.iter().map(|t| t.day()).collect();
    similar_asserts::assert_eq!(days, vec![31, 29, 29, 29, 29, 29]);
    assert!(times.iter().all(|t| t.hour() == 6));
}

#[test]
fn every_other_month_only_clamps_when_needed() {
    let bimonthly = CalendarIntervalSchedule::new(2, IntervalUnit::Month, UTC).unwrap();
    let times = trigger(at(2024, 8, 31, 0, 0), bimonthly).compute_fire_times(None, 4);

    similar_asserts::assert_eq!(
        times,
        vec![
            at(2024, 8, 31, 0, 0),
            at(2024, 10, 31, 0, 0),
            at(2024, 12, 31, 0, 0),
            at(2025, 2, 28, 0, 0),
        ]
    );
}

#[test]
fn daily_keeps_the_local_hour_across_spring_forward() {
    // 01:30 does not exist in London on 2024-03-31
    let daily = CalendarIntervalSchedule::new(1, IntervalUnit::Day, London)
        .unwrap()
        .preserve_hour_of_day_across_daylight_savings(true);
    let times = trigger(at(2024, 3, 29, 1, 30), daily).compute_fire_times(None, 5);

    similar_asserts::assert_eq!(
        times,
        vec![
            at(2024, 3, 29, 1, 30),
            at(2024, 3, 30, 1, 30),
            at(2024, 3, 31, 1, 30),
            at(2024, 4, 1, 0, 30),
            at(2024, 4, 2, 0, 30),
        ]
    );
    let local_hours: Vec<u32> = times.iter().map(|t| t.with_timezone(&London).hour()).collect();
    assert_eq!(local_hours, vec![1, 1, 2, 1, 1]);
}

#[test]
fn daily_skips_the_day_the_hour_does_not_exist() {
    let daily = CalendarIntervalSchedule::new(1, IntervalUnit::Day, London)
        .unwrap()
        .preserve_hour_of_day_across_daylight_savings(true)
        .skip_day_if_hour_does_not_exist(true);
    let times = trigger(at(2024, 3, 30, 1, 30), daily).compute_fire_times(None, 3);

    similar_asserts::assert_eq!(
        times,
        vec![at(2024, 3, 30, 1, 30), at(2024, 4, 1, 0, 30), at(2024, 4, 2, 0, 30)]
    );
}
