// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusion calendars
//!
//! A calendar removes instants from a trigger's schedule. Triggers consult
//! the calendar named by `calendar_name` and skip any candidate fire time it
//! excludes. Calendars may be layered on a base calendar; an instant is
//! included only when every layer includes it.

use crate::time_of_day::TimeOfDay;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Decides whether an instant may be used as a fire time
pub trait ExclusionCalendar: Send + Sync + fmt::Debug {
    fn is_time_included(&self, instant: DateTime<Utc>) -> bool;

    fn description(&self) -> Option<&str> {
        None
    }
}

fn base_includes(base: &Option<Arc<dyn ExclusionCalendar>>, instant: DateTime<Utc>) -> bool {
    base.as_ref().map_or(true, |b| b.is_time_included(instant))
}

/// Excludes whole calendar days
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    time_zone: Tz,
    excluded: BTreeSet<NaiveDate>,
    description: Option<String>,
    base: Option<Arc<dyn ExclusionCalendar>>,
}

impl HolidayCalendar {
    pub fn new(time_zone: Tz) -> Self {
        Self {
            time_zone,
            excluded: BTreeSet::new(),
            description: None,
            base: None,
        }
    }

    pub fn with_base(mut self, base: Arc<dyn ExclusionCalendar>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn exclude(mut self, date: NaiveDate) -> Self {
        self.excluded.insert(date);
        self
    }

    pub fn add_excluded_date(&mut self, date: NaiveDate) {
        self.excluded.insert(date);
    }

    pub fn remove_excluded_date(&mut self, date: NaiveDate) -> bool {
        self.excluded.remove(&date)
    }

    pub fn excluded_dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.excluded.iter()
    }
}

impl ExclusionCalendar for HolidayCalendar {
    fn is_time_included(&self, instant: DateTime<Utc>) -> bool {
        if !base_includes(&self.base, instant) {
            return false;
        }
        let local = instant.with_timezone(&self.time_zone).date_naive();
        !self.excluded.contains(&local)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Excludes days of the week; Saturday and Sunday by default
#[derive(Debug, Clone)]
pub struct WeeklyCalendar {
    time_zone: Tz,
    excluded: [bool; 7],
    description: Option<String>,
    base: Option<Arc<dyn ExclusionCalendar>>,
}

impl WeeklyCalendar {
    pub fn new(time_zone: Tz) -> Self {
        let mut excluded = [false; 7];
        excluded[Weekday::Sat.num_days_from_monday() as usize] = true;
        excluded[Weekday::Sun.num_days_from_monday() as usize] = true;
        Self {
            time_zone,
            excluded,
            description: None,
            base: None,
        }
    }

    pub fn with_base(mut self, base: Arc<dyn ExclusionCalendar>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_day_excluded(&mut self, day: Weekday, excluded: bool) {
        self.excluded[day.num_days_from_monday() as usize] = excluded;
    }

    pub fn is_day_excluded(&self, day: Weekday) -> bool {
        self.excluded[day.num_days_from_monday() as usize]
    }

    /// True when no day of the week remains
    pub fn are_all_days_excluded(&self) -> bool {
        self.excluded.iter().all(|d| *d)
    }
}

impl ExclusionCalendar for WeeklyCalendar {
    fn is_time_included(&self, instant: DateTime<Utc>) -> bool {
        if !base_includes(&self.base, instant) {
            return false;
        }
        let weekday = instant.with_timezone(&self.time_zone).weekday();
        !self.is_day_excluded(weekday)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Excludes a time-of-day range on every day, or everything outside it
/// when inverted
#[derive(Debug, Clone)]
pub struct DailyCalendar {
    time_zone: Tz,
    range_start: TimeOfDay,
    range_end: TimeOfDay,
    invert: bool,
    description: Option<String>,
    base: Option<Arc<dyn ExclusionCalendar>>,
}

impl DailyCalendar {
    /// Exclude `[range_start, range_end]`, both inclusive
    pub fn new(time_zone: Tz, range_start: TimeOfDay, range_end: TimeOfDay) -> Self {
        let (range_start, range_end) = if range_end < range_start {
            (range_end, range_start)
        } else {
            (range_start, range_end)
        };
        Self {
            time_zone,
            range_start,
            range_end,
            invert: false,
            description: None,
            base: None,
        }
    }

    /// Only include the range instead of excluding it
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn with_base(mut self, base: Arc<dyn ExclusionCalendar>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl ExclusionCalendar for DailyCalendar {
    fn is_time_included(&self, instant: DateTime<Utc>) -> bool {
        if !base_includes(&self.base, instant) {
            return false;
        }
        let local = instant.with_timezone(&self.time_zone).naive_local();
        let time = TimeOfDay::of(&local);
        let in_range = time >= self.range_start && time <= self.range_end;
        in_range == self.invert
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
