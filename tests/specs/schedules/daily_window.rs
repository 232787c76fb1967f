//! Daily time window specs

use crate::prelude::*;
use chrono::Weekday;
use kairos_core::{DailyTimeIntervalSchedule, TimeOfDay};

fn business_hours() -> Trigger {
    let schedule = DailyTimeIntervalSchedule::builder()
        .with_interval_in_minutes(15)
        .monday_through_friday()
        .starting_daily_at(TimeOfDay::hour_and_minute(8, 0).unwrap())
        .ending_daily_at(TimeOfDay::hour_and_minute(10, 45).unwrap())
        .build()
        .unwrap();
    Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::new("j"))
        // a Saturday
        .start_at(Utc.with_ymd_and_hms(2011, 1, 1, 0, 0, 0).unwrap())
        .with_schedule(schedule)
        .build()
        .unwrap()
}

#[test]
fn twelve_fires_per_weekday_and_none_on_the_weekend() {
    let times = business_hours().compute_fire_times(None, 72);

    for day in 3..=7 {
        let count = times.iter().filter(|t| t.day() == day).count();
        assert_eq!(count, 12, "2011-01-{day:02}");
    }
    assert!(times
        .iter()
        .all(|t| !matches!(t.weekday(), Weekday::Sat | Weekday::Sun)));
    assert_eq!(times[60], Utc.with_ymd_and_hms(2011, 1, 10, 8, 0, 0).unwrap());
}

#[test]
fn forty_eighth_fire_is_thursday_at_the_window_end() {
    let times = business_hours().compute_fire_times(None, 48);

    assert_eq!(times[47], Utc.with_ymd_and_hms(2011, 1, 6, 10, 45, 0).unwrap());
    assert_eq!(times[47].weekday(), Weekday::Thu);
}
