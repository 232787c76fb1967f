// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repeating intra-day window on selected days of the week
//!
//! Fires at `start_time_of_day`, then every interval until
//! `end_time_of_day`, on each allowed day. Days of the week are numbered
//! 1 (Sunday) through 7 (Saturday).

use super::local::{resolve_local_not_before, to_local};
use super::{FireWindow, IntervalUnit};
use crate::error::ScheduleError;
use crate::time_of_day::TimeOfDay;
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const SUNDAY: u8 = 1;
const SATURDAY: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTimeIntervalSchedule {
    interval: u32,
    unit: IntervalUnit,
    days_of_week: BTreeSet<u8>,
    start_time_of_day: TimeOfDay,
    end_time_of_day: TimeOfDay,
    repeat_count: Option<u32>,
    time_zone: Tz,
}

/// Builder for [`DailyTimeIntervalSchedule`]; validation happens in `build`
#[derive(Debug, Clone)]
pub struct DailyTimeIntervalScheduleBuilder {
    interval: i64,
    unit: IntervalUnit,
    days_of_week: BTreeSet<u8>,
    start_time_of_day: Option<TimeOfDay>,
    end_time_of_day: Option<TimeOfDay>,
    ending_daily_after_count: Option<i64>,
    repeat_count: Option<i64>,
    time_zone: Tz,
}

impl Default for DailyTimeIntervalScheduleBuilder {
    fn default() -> Self {
        Self {
            interval: 1,
            unit: IntervalUnit::Minute,
            days_of_week: (SUNDAY..=SATURDAY).collect(),
            start_time_of_day: None,
            end_time_of_day: None,
            ending_daily_after_count: None,
            repeat_count: None,
            time_zone: Tz::UTC,
        }
    }
}

impl DailyTimeIntervalScheduleBuilder {
    pub fn with_interval(mut self, interval: i64, unit: IntervalUnit) -> Self {
        self.interval = interval;
        self.unit = unit;
        self
    }

    pub fn with_interval_in_seconds(self, interval: i64) -> Self {
        self.with_interval(interval, IntervalUnit::Second)
    }

    pub fn with_interval_in_minutes(self, interval: i64) -> Self {
        self.with_interval(interval, IntervalUnit::Minute)
    }

    pub fn with_interval_in_hours(self, interval: i64) -> Self {
        self.with_interval(interval, IntervalUnit::Hour)
    }

    /// Days numbered 1 (Sunday) through 7 (Saturday)
    pub fn on_days_of_week(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = days.into_iter().collect();
        self
    }

    pub fn monday_through_friday(self) -> Self {
        self.on_days_of_week(2..=6)
    }

    pub fn on_saturday_and_sunday(self) -> Self {
        self.on_days_of_week([SUNDAY, SATURDAY])
    }

    pub fn on_every_day(self) -> Self {
        self.on_days_of_week(SUNDAY..=SATURDAY)
    }

    pub fn starting_daily_at(mut self, time: TimeOfDay) -> Self {
        self.start_time_of_day = Some(time);
        self
    }

    pub fn ending_daily_at(mut self, time: TimeOfDay) -> Self {
        self.end_time_of_day = Some(time);
        self.ending_daily_after_count = None;
        self
    }

    /// End the daily window after `count` fires
    pub fn ending_daily_after_count(mut self, count: i64) -> Self {
        self.ending_daily_after_count = Some(count);
        self
    }

    /// Stop after `count` further fires; total fires are `count + 1`
    pub fn with_repeat_count(mut self, count: i64) -> Self {
        self.repeat_count = Some(count);
        self
    }

    pub fn in_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn build(self) -> Result<DailyTimeIntervalSchedule, ScheduleError> {
        let interval = u32::try_from(self.interval)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ScheduleError::InvalidInterval(self.interval))?;
        let unit_seconds = match self.unit {
            IntervalUnit::Second | IntervalUnit::Minute | IntervalUnit::Hour => {
                self.unit.fixed_seconds().unwrap_or(1)
            }
            other => {
                return Err(ScheduleError::UnsupportedUnit(
                    other.to_string(),
                    "daily time interval",
                ))
            }
        };
        let interval_seconds = i64::from(interval) * unit_seconds;
        if interval_seconds > 86_400 {
            return Err(ScheduleError::IntervalTooLong(interval_seconds));
        }
        if self.days_of_week.is_empty()
            || self
                .days_of_week
                .iter()
                .any(|d| !(SUNDAY..=SATURDAY).contains(d))
        {
            return Err(ScheduleError::InvalidDaysOfWeek);
        }

        let end_time_of_day = match self.ending_daily_after_count {
            Some(count) => {
                let start = self
                    .start_time_of_day
                    .ok_or(ScheduleError::StartTimeOfDayNotSet)?;
                Some(end_after_count(start, interval_seconds, count)?)
            }
            None => self.end_time_of_day,
        };
        let start_time_of_day = self.start_time_of_day.unwrap_or(TimeOfDay::midnight());
        let end_time_of_day = end_time_of_day.unwrap_or(TimeOfDay::last_second());
        if end_time_of_day < start_time_of_day {
            return Err(ScheduleError::EndTimeOfDayBeforeStart {
                start: start_time_of_day.to_string(),
                end: end_time_of_day.to_string(),
            });
        }

        let repeat_count = match self.repeat_count {
            None => None,
            Some(n) => Some(u32::try_from(n).map_err(|_| ScheduleError::InvalidRepeatCount(n))?),
        };

        Ok(DailyTimeIntervalSchedule {
            interval,
            unit: self.unit,
            days_of_week: self.days_of_week,
            start_time_of_day,
            end_time_of_day,
            repeat_count,
            time_zone: self.time_zone,
        })
    }
}

fn end_after_count(
    start: TimeOfDay,
    interval_seconds: i64,
    count: i64,
) -> Result<TimeOfDay, ScheduleError> {
    if count <= 0 {
        return Err(ScheduleError::InvalidDailyCount(count));
    }
    let too_large = || ScheduleError::DailyCountTooLarge(u32::try_from(count).unwrap_or(u32::MAX));
    let end = (count - 1)
        .checked_mul(interval_seconds)
        .and_then(|span| span.checked_add(start.second_of_day()))
        .ok_or_else(too_large)?;
    TimeOfDay::from_second_of_day(end).ok_or_else(too_large)
}

impl DailyTimeIntervalSchedule {
    pub fn builder() -> DailyTimeIntervalScheduleBuilder {
        DailyTimeIntervalScheduleBuilder::default()
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    pub fn days_of_week(&self) -> &BTreeSet<u8> {
        &self.days_of_week
    }

    pub fn start_time_of_day(&self) -> TimeOfDay {
        self.start_time_of_day
    }

    pub fn end_time_of_day(&self) -> TimeOfDay {
        self.end_time_of_day
    }

    pub fn repeat_count(&self) -> Option<u32> {
        self.repeat_count
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    fn interval_millis(&self) -> i64 {
        i64::from(self.interval) * self.unit.fixed_seconds().unwrap_or(1) * 1000
    }

    fn allows(&self, date: NaiveDate) -> bool {
        let day = date.weekday().number_from_sunday() as u8;
        self.days_of_week.contains(&day)
    }

    /// Start of the window on the first allowed day on or after `date`,
    /// or strictly after it when `force` is set
    fn window_start_on_or_after(&self, date: NaiveDate, force: bool) -> Option<NaiveDateTime> {
        if !force && self.allows(date) {
            return None;
        }
        let mut day = date;
        for _ in 0..7 {
            day = day.succ_opt()?;
            if self.allows(day) {
                return Some(self.start_time_of_day.on(day));
            }
        }
        None
    }

    pub(crate) fn fire_time_after(
        &self,
        window: &FireWindow,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if self
            .repeat_count
            .is_some_and(|count| window.times_triggered > count)
        {
            return None;
        }
        let from = (after + Duration::milliseconds(1)).max(window.start);
        let mut local = to_local(self.time_zone, from);
        let give_up = local.date().checked_add_days(Days::new(8))?;

        // Wall times keep moving forward, so a slot that still maps before
        // `from` is passed over until the clock leaves the repeated hour.
        loop {
            let candidate = self.next_local_slot(local)?;
            if candidate.date() > give_up {
                return None;
            }
            let fire = resolve_local_not_before(self.time_zone, candidate, from);
            if window.past_end(fire) {
                return None;
            }
            if fire >= from {
                return Some(fire);
            }
            local = candidate + Duration::seconds(1);
        }
    }

    fn next_local_slot(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = from.date();
        let past_end_of_day = from > self.end_time_of_day.on(date);
        let from = match self.window_start_on_or_after(date, past_end_of_day) {
            Some(next_day_start) => next_day_start,
            None => from,
        };

        let day_start = self.start_time_of_day.on(from.date());
        if from <= day_start {
            return Some(day_start);
        }
        let step = self.interval_millis();
        let elapsed = (from - day_start).num_milliseconds();
        let jumps = (elapsed + step - 1) / step;
        let slot = day_start + Duration::milliseconds(jumps * step);
        if slot > self.end_time_of_day.on(from.date()) {
            return self.window_start_on_or_after(from.date(), true);
        }
        Some(slot)
    }
}

#[cfg(test)]
#[path = "daily_time_interval_tests.rs"]
mod tests;
