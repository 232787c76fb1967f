// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock time of day, independent of date and zone

use crate::error::ScheduleError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hour, minute and second within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
    second: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32, second: u32) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(ScheduleError::InvalidTimeOfDay {
                hour,
                minute,
                second,
            });
        }
        Ok(Self {
            hour,
            minute,
            second,
        })
    }

    pub fn hour_and_minute(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        Self::new(hour, minute, 0)
    }

    /// 00:00:00
    pub const fn midnight() -> Self {
        Self {
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    /// 23:59:59
    pub const fn last_second() -> Self {
        Self {
            hour: 23,
            minute: 59,
            second: 59,
        }
    }

    /// Build from seconds since midnight; `None` past the end of the day
    pub fn from_second_of_day(seconds: i64) -> Option<Self> {
        if !(0..86_400).contains(&seconds) {
            return None;
        }
        let s = seconds as u32;
        Some(Self {
            hour: s / 3600,
            minute: (s % 3600) / 60,
            second: s % 60,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    pub fn second_of_day(&self) -> i64 {
        i64::from(self.hour * 3600 + self.minute * 60 + self.second)
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, self.second).unwrap_or(NaiveTime::MIN)
    }

    /// Local date-time for this time of day on the given date
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }

    /// Time of day of a local date-time, truncated to the second
    pub fn of(time: &NaiveDateTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

#[cfg(test)]
#[path = "time_of_day_tests.rs"]
mod tests;
