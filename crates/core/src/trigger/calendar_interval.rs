// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Every N calendar units, anchored at the trigger's start time
//!
//! Second, minute, hour and day intervals are fixed durations. Week, month
//! and year intervals are calendar arithmetic on the start's wall-clock time
//! in the schedule's zone. Month and year additions clamp to the end of short
//! months, and the clamp carries forward: Jan 31 + 1 month is Feb 28, and the
//! month after that is Mar 28.

use super::local::{local_exists, resolve_local, to_local};
use super::{FireWindow, IntervalUnit, YEAR_TO_GIVE_UP_SCHEDULING_AT};
use crate::error::ScheduleError;
use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarIntervalSchedule {
    interval: u32,
    unit: IntervalUnit,
    time_zone: Tz,
    preserve_hour_of_day_across_daylight_savings: bool,
    skip_day_if_hour_does_not_exist: bool,
}

impl CalendarIntervalSchedule {
    pub fn new(interval: i64, unit: IntervalUnit, time_zone: Tz) -> Result<Self, ScheduleError> {
        let interval = u32::try_from(interval)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ScheduleError::InvalidInterval(interval))?;
        Ok(Self {
            interval,
            unit,
            time_zone,
            preserve_hour_of_day_across_daylight_savings: false,
            skip_day_if_hour_does_not_exist: false,
        })
    }

    /// Keep firing at the start's local hour when the zone's offset changes
    pub fn preserve_hour_of_day_across_daylight_savings(mut self, preserve: bool) -> Self {
        self.preserve_hour_of_day_across_daylight_savings = preserve;
        self
    }

    /// With hour preservation, skip days on which that hour does not exist
    pub fn skip_day_if_hour_does_not_exist(mut self, skip: bool) -> Self {
        self.skip_day_if_hour_does_not_exist = skip;
        self
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub(crate) fn fire_time_after(
        &self,
        window: &FireWindow,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let from = after + Duration::milliseconds(1);
        if window.end.is_some_and(|end| end < from) {
            return None;
        }
        if from <= window.start {
            return Some(window.start);
        }

        let next = match self.unit {
            IntervalUnit::Second | IntervalUnit::Minute | IntervalUnit::Hour => {
                self.next_fixed(window.start, from)
            }
            IntervalUnit::Day => self.next_day(window.start, from),
            IntervalUnit::Week | IntervalUnit::Month | IntervalUnit::Year => {
                self.next_calendar(window.start, from)
            }
        }?;
        if window.past_end(next) {
            return None;
        }
        Some(next)
    }

    fn step_millis(&self) -> i64 {
        let unit_seconds = self.unit.fixed_seconds().unwrap_or(1);
        i64::from(self.interval) * unit_seconds * 1000
    }

    fn next_fixed(&self, start: DateTime<Utc>, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let step = self.step_millis();
        let elapsed = (from - start).num_milliseconds();
        let jumps = (elapsed + step - 1) / step;
        let next = offset_by(start, jumps, step)?;
        (next.year() < YEAR_TO_GIVE_UP_SCHEDULING_AT).then_some(next)
    }

    fn next_day(&self, start: DateTime<Utc>, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let step = self.step_millis();
        let initial_hour = to_local(self.time_zone, start).hour();
        let elapsed = (from - start).num_milliseconds();
        let mut jumps = (elapsed / step - 1).max(1);
        loop {
            let candidate = offset_by(start, jumps, step)?;
            if candidate.year() >= YEAR_TO_GIVE_UP_SCHEDULING_AT {
                return None;
            }
            jumps += 1;
            match self.preserved(candidate, initial_hour) {
                Some(time) if time >= from => return Some(time),
                _ => continue,
            }
        }
    }

    fn next_calendar(&self, start: DateTime<Utc>, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start_local = to_local(self.time_zone, start);
        let initial_hour = start_local.hour();
        let mut local = start_local;
        let mut jumps: u32 = 0;
        if self.unit == IntervalUnit::Week {
            let week_millis = i64::from(self.interval) * 7 * 86_400_000;
            let elapsed = (from - start).num_milliseconds();
            let skip = (elapsed / week_millis - 1).max(0);
            jumps = u32::try_from(skip).unwrap_or(0);
            local = self.advance_weeks(start_local, jumps)?;
        }
        loop {
            jumps += 1;
            local = match self.unit {
                IntervalUnit::Week => self.advance_weeks(start_local, jumps)?,
                IntervalUnit::Month => local.checked_add_months(Months::new(self.interval))?,
                _ => local.checked_add_months(Months::new(self.interval.checked_mul(12)?))?,
            };
            if local.year() >= YEAR_TO_GIVE_UP_SCHEDULING_AT {
                return None;
            }
            let candidate = resolve_local(self.time_zone, local);
            match self.preserved(candidate, initial_hour) {
                Some(time) if time >= from => return Some(time),
                _ => continue,
            }
        }
    }

    fn advance_weeks(&self, start_local: NaiveDateTime, weeks: u32) -> Option<NaiveDateTime> {
        let days = u64::from(weeks) * u64::from(self.interval) * 7;
        start_local.checked_add_days(Days::new(days))
    }

    /// Apply hour-of-day preservation; `None` drops the candidate's day
    fn preserved(&self, candidate: DateTime<Utc>, initial_hour: u32) -> Option<DateTime<Utc>> {
        if !self.preserve_hour_of_day_across_daylight_savings {
            return Some(candidate);
        }
        let local = to_local(self.time_zone, candidate);
        if local.hour() == initial_hour {
            return Some(candidate);
        }
        let wanted = local.with_hour(initial_hour)?;
        if local_exists(self.time_zone, wanted) {
            Some(resolve_local(self.time_zone, wanted))
        } else if self.skip_day_if_hour_does_not_exist {
            None
        } else {
            Some(candidate)
        }
    }
}

/// `start` moved by `jumps` steps of `step` milliseconds; `None` on overflow
fn offset_by(start: DateTime<Utc>, jumps: i64, step: i64) -> Option<DateTime<Utc>> {
    let span = Duration::try_milliseconds(jumps.checked_mul(step)?)?;
    start.checked_add_signed(span)
}

#[cfg(test)]
#[path = "calendar_interval_tests.rs"]
mod tests;
