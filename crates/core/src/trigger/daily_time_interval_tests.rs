// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::key::{JobKey, TriggerKey};
use crate::trigger::Trigger;
use chrono::{TimeZone, Timelike, Weekday};
use chrono_tz::America::New_York;
use yare::parameterized;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn tod(h: u32, m: u32) -> TimeOfDay {
    TimeOfDay::hour_and_minute(h, m).unwrap()
}

fn business_hours() -> DailyTimeIntervalSchedule {
    DailyTimeIntervalSchedule::builder()
        .with_interval_in_minutes(15)
        .monday_through_friday()
        .starting_daily_at(tod(8, 0))
        .ending_daily_at(tod(10, 45))
        .build()
        .unwrap()
}

fn trigger(start: DateTime<Utc>, schedule: DailyTimeIntervalSchedule) -> Trigger {
    Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::new("j"))
        .start_at(start)
        .with_schedule(schedule)
        .build()
        .unwrap()
}

#[test]
fn forty_eighth_fire_lands_on_thursday() {
    // 2011-01-01 is a Saturday
    let t = trigger(at(2011, 1, 1, 0, 0), business_hours());
    let times = t.compute_fire_times(None, 48);
    assert_eq!(times.len(), 48);
    assert_eq!(times[0], at(2011, 1, 3, 8, 0));
    assert_eq!(times[47], at(2011, 1, 6, 10, 45));
    assert_eq!(times[47].weekday(), Weekday::Thu);
}

#[test]
fn twelve_fires_per_day_inside_window() {
    let t = trigger(at(2011, 1, 1, 0, 0), business_hours());
    let times = t.compute_fire_times(None, 60);
    for day in 3..=7 {
        let count = times.iter().filter(|t| t.day() == day).count();
        assert_eq!(count, 12, "day {}", day);
    }
    assert!(times
        .iter()
        .all(|t| (8..=10).contains(&t.hour()) && !(t.hour() == 10 && t.minute() > 45)));
}

#[test]
fn mid_window_start_jumps_to_next_slot() {
    let t = trigger(at(2011, 1, 3, 9, 7), business_hours());
    assert_eq!(t.compute_fire_times(None, 1), vec![at(2011, 1, 3, 9, 15)]);
}

#[test]
fn ending_daily_after_count_derives_end_time() {
    let schedule = DailyTimeIntervalSchedule::builder()
        .with_interval_in_minutes(15)
        .starting_daily_at(tod(8, 0))
        .ending_daily_after_count(12)
        .build()
        .unwrap();
    assert_eq!(schedule.end_time_of_day(), tod(10, 45));
}

#[test]
fn repeat_count_limits_total_fires() {
    let schedule = DailyTimeIntervalSchedule::builder()
        .with_interval_in_hours(1)
        .with_repeat_count(2)
        .build()
        .unwrap();
    let t = trigger(at(2011, 1, 1, 0, 0), schedule);
    assert_eq!(
        t.compute_fire_times(None, 10),
        vec![at(2011, 1, 1, 0, 0), at(2011, 1, 1, 1, 0), at(2011, 1, 1, 2, 0)]
    );
}

#[test]
fn window_is_read_in_time_zone() {
    let schedule = DailyTimeIntervalSchedule::builder()
        .with_interval_in_hours(1)
        .starting_daily_at(tod(9, 0))
        .ending_daily_at(tod(10, 0))
        .in_time_zone(New_York)
        .build()
        .unwrap();
    let t = trigger(at(2011, 1, 3, 0, 0), schedule);
    assert_eq!(
        t.compute_fire_times(None, 3),
        vec![at(2011, 1, 3, 14, 0), at(2011, 1, 3, 15, 0), at(2011, 1, 4, 14, 0)]
    );
}

fn every_minute_in_new_york() -> DailyTimeIntervalSchedule {
    DailyTimeIntervalSchedule::builder()
        .with_interval_in_minutes(1)
        .in_time_zone(New_York)
        .build()
        .unwrap()
}

#[test]
fn start_in_repeated_hour_keeps_firing() {
    // 2024-11-03 06:10Z is 01:10 EST, the second pass through 01:xx
    let mut t = trigger(at(2024, 11, 3, 6, 10), every_minute_in_new_york());

    assert_eq!(t.compute_first_fire_time(None), Some(at(2024, 11, 3, 6, 10)));
    assert_eq!(
        t.compute_fire_time_after(at(2024, 11, 3, 6, 10), None),
        Some(at(2024, 11, 3, 6, 11))
    );
    assert_eq!(
        t.compute_fire_times(None, 3),
        vec![at(2024, 11, 3, 6, 10), at(2024, 11, 3, 6, 11), at(2024, 11, 3, 6, 12)]
    );
}

#[test]
fn end_of_repeated_hour_moves_on_to_two_o_clock() {
    let t = trigger(at(2024, 11, 3, 0, 0), every_minute_in_new_york());

    // 06:59Z is 01:59 EST; 02:00 EST follows
    assert_eq!(
        t.compute_fire_time_after(at(2024, 11, 3, 6, 59), None),
        Some(at(2024, 11, 3, 7, 0))
    );
}

#[parameterized(
        day_unit = { DailyTimeIntervalSchedule::builder().with_interval(1, IntervalUnit::Day), ScheduleError::UnsupportedUnit("day".to_string(), "daily time interval") },
        zero_interval = { DailyTimeIntervalSchedule::builder().with_interval_in_minutes(0), ScheduleError::InvalidInterval(0) },
        longer_than_a_day = { DailyTimeIntervalSchedule::builder().with_interval_in_hours(25), ScheduleError::IntervalTooLong(90_000) },
        no_days = { DailyTimeIntervalSchedule::builder().on_days_of_week(Vec::new()), ScheduleError::InvalidDaysOfWeek },
        day_eight = { DailyTimeIntervalSchedule::builder().on_days_of_week([2, 8]), ScheduleError::InvalidDaysOfWeek },
        count_without_start = { DailyTimeIntervalSchedule::builder().ending_daily_after_count(3), ScheduleError::StartTimeOfDayNotSet },
        negative_repeat = { DailyTimeIntervalSchedule::builder().with_repeat_count(-1), ScheduleError::InvalidRepeatCount(-1) },
    )]
fn rejects_invalid_schedule(builder: DailyTimeIntervalScheduleBuilder, expected: ScheduleError) {
    assert_eq!(builder.build(), Err(expected));
}

#[test]
fn rejects_end_before_start() {
    let err = DailyTimeIntervalSchedule::builder()
        .starting_daily_at(tod(10, 0))
        .ending_daily_at(tod(9, 0))
        .build()
        .unwrap_err();
    assert!(matches!(err, ScheduleError::EndTimeOfDayBeforeStart { .. }));
}

#[parameterized(
        zero = { 0, ScheduleError::InvalidDailyCount(0) },
        past_midnight = { 3, ScheduleError::DailyCountTooLarge(3) },
    )]
fn rejects_bad_daily_count(count: i64, expected: ScheduleError) {
    let result = DailyTimeIntervalSchedule::builder()
        .with_interval_in_hours(1)
        .starting_daily_at(tod(23, 0))
        .ending_daily_after_count(count)
        .build();
    assert_eq!(result, Err(expected));
}
