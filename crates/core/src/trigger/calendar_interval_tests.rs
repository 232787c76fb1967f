// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::key::{JobKey, TriggerKey};
use crate::trigger::{CalendarIntervalSchedule, IntervalUnit, Trigger};
use crate::ScheduleError;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::America::New_York;
use chrono_tz::UTC;
use proptest::prelude::*;

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
fn rejects_non_positive_interval() {
    assert_eq!(
        CalendarIntervalSchedule::new(0, IntervalUnit::Day, UTC),
        Err(ScheduleError::InvalidInterval(0))
    );
    assert_eq!(
        CalendarIntervalSchedule::new(-3, IntervalUnit::Hour, UTC),
        Err(ScheduleError::InvalidInterval(-3))
    );
}

#[test]
fn fixed_units_jump_to_next_boundary() {
    let every_90_min = CalendarIntervalSchedule::new(90, IntervalUnit::Minute, UTC).unwrap();
    let t = trigger(at(2011, 1, 1, 0, 0), every_90_min);
    assert_eq!(t.fire_time_after(at(2011, 1, 1, 2, 0)), Some(at(2011, 1, 1, 3, 0)));
    assert_eq!(t.fire_time_after(at(2011, 1, 1, 3, 0)), Some(at(2011, 1, 1, 4, 30)));
}

#[test]
fn month_end_clamp_is_sticky() {
    let monthly = CalendarIntervalSchedule::new(1, IntervalUnit::Month, UTC).unwrap();
    let t = trigger(at(2011, 1, 31, 10, 0), monthly);
    assert_eq!(
        t.compute_fire_times(None, 4),
        vec![
            at(2011, 1, 31, 10, 0),
            at(2011, 2, 28, 10, 0),
            at(2011, 3, 28, 10, 0),
            at(2011, 4, 28, 10, 0),
        ]
    );
}

#[test]
fn leap_day_yearly_clamps_to_feb_28() {
    let yearly = CalendarIntervalSchedule::new(1, IntervalUnit::Year, UTC).unwrap();
    let t = trigger(at(2012, 2, 29, 12, 0), yearly);
    assert_eq!(
        t.compute_fire_times(None, 5),
        vec![
            at(2012, 2, 29, 12, 0),
            at(2013, 2, 28, 12, 0),
            at(2014, 2, 28, 12, 0),
            at(2015, 2, 28, 12, 0),
            at(2016, 2, 28, 12, 0),
        ]
    );
}

#[test]
fn weekly_keeps_wall_clock_time_across_dst() {
    let weekly = CalendarIntervalSchedule::new(1, IntervalUnit::Week, New_York).unwrap();
    // 09:00 EST on Monday 2011-03-07
    let t = trigger(at(2011, 3, 7, 14, 0), weekly);
    // 09:00 EDT on Monday 2011-03-14
    assert_eq!(t.fire_time_after(at(2011, 3, 7, 14, 0)), Some(at(2011, 3, 14, 13, 0)));
}

#[test]
fn daily_without_preserve_uses_fixed_days() {
    let daily = CalendarIntervalSchedule::new(1, IntervalUnit::Day, New_York).unwrap();
    // 09:00 EST on 2011-03-10; clocks move forward on 2011-03-13
    let t = trigger(at(2011, 3, 10, 14, 0), daily);
    let times = t.compute_fire_times(None, 5);
    assert_eq!(times[3], at(2011, 3, 13, 14, 0));
    assert_eq!(times[4], at(2011, 3, 14, 14, 0));
}

#[test]
fn daily_with_preserve_keeps_local_hour() {
    let daily = CalendarIntervalSchedule::new(1, IntervalUnit::Day, New_York)
        .unwrap()
        .preserve_hour_of_day_across_daylight_savings(true);
    let t = trigger(at(2011, 3, 10, 14, 0), daily);
    assert_eq!(
        t.compute_fire_times(None, 5),
        vec![
            at(2011, 3, 10, 14, 0),
            at(2011, 3, 11, 14, 0),
            at(2011, 3, 12, 14, 0),
            at(2011, 3, 13, 13, 0),
            at(2011, 3, 14, 13, 0),
        ]
    );
}

#[test]
fn daily_with_preserve_and_skip_drops_missing_hour() {
    let daily = CalendarIntervalSchedule::new(1, IntervalUnit::Day, New_York)
        .unwrap()
        .preserve_hour_of_day_across_daylight_savings(true)
        .skip_day_if_hour_does_not_exist(true);
    // 02:30 EST on 2011-03-12; 02:30 does not exist on 2011-03-13
    let t = trigger(at(2011, 3, 12, 7, 30), daily);
    assert_eq!(
        t.compute_fire_times(None, 3),
        vec![at(2011, 3, 12, 7, 30), at(2011, 3, 14, 6, 30), at(2011, 3, 15, 6, 30)]
    );
}

#[test]
fn daily_with_preserve_without_skip_fires_an_hour_late_once() {
    let daily = CalendarIntervalSchedule::new(1, IntervalUnit::Day, New_York)
        .unwrap()
        .preserve_hour_of_day_across_daylight_savings(true);
    let t = trigger(at(2011, 3, 12, 7, 30), daily);
    assert_eq!(
        t.compute_fire_times(None, 3),
        vec![at(2011, 3, 12, 7, 30), at(2011, 3, 13, 7, 30), at(2011, 3, 14, 6, 30)]
    );
}

#[test]
fn end_time_cuts_off_series() {
    let daily = CalendarIntervalSchedule::new(1, IntervalUnit::Day, UTC).unwrap();
    let t = Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::new("j"))
        .start_at(at(2011, 1, 1, 9, 0))
        .end_at(at(2011, 1, 3, 9, 0))
        .with_schedule(daily)
        .build()
        .unwrap();
    assert_eq!(t.compute_fire_times(None, 10).len(), 3);
}

#[test]
fn interval_beyond_the_scheduling_horizon_ends_the_schedule() {
    for unit in [IntervalUnit::Hour, IntervalUnit::Day] {
        let huge = CalendarIntervalSchedule::new(2_000_000_000, unit, UTC).unwrap();
        let mut t = trigger(at(2011, 1, 1, 8, 0), huge);

        assert_eq!(t.compute_first_fire_time(None), Some(at(2011, 1, 1, 8, 0)));
        t.triggered(None);
        assert_eq!(t.next_fire_time, None, "{unit:?}");
        assert_eq!(t.times_triggered, 1);
    }
}

proptest! {
    #[test]
    fn monthly_day_of_month_never_grows(day in 1u32..=31, interval in 1i64..=3) {
        let monthly = CalendarIntervalSchedule::new(interval, IntervalUnit::Month, UTC).unwrap();
        let t = trigger(at(2011, 1, day, 10, 0), monthly);
        let times = t.compute_fire_times(None, 13);
        prop_assert_eq!(times.len(), 13);
        for pair in times.windows(2) {
            let months_apart = (pair[1].year() - pair[0].year()) * 12
                + pair[1].month() as i32
                - pair[0].month() as i32;
            prop_assert_eq!(i64::from(months_apart), interval);
            prop_assert!(pair[1].day() <= pair[0].day());
        }
        if day <= 28 {
            prop_assert!(times.iter().all(|t| t.day() == day));
        }
    }
}
