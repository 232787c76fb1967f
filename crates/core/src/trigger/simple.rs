// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-interval schedule with an optional repeat count

use super::FireWindow;
use crate::error::ScheduleError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fires at `start`, then every `repeat_interval`, `repeat_count` more times
/// (or forever when `repeat_count` is `None`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleSchedule {
    repeat_interval_ms: i64,
    repeat_count: Option<u32>,
}

impl SimpleSchedule {
    /// Fire exactly once, at the trigger's start time
    pub fn once() -> Self {
        Self {
            repeat_interval_ms: 0,
            repeat_count: Some(0),
        }
    }

    pub fn repeat(interval: std::time::Duration, repeat_count: u32) -> Result<Self, ScheduleError> {
        Self::new(interval, Some(repeat_count))
    }

    pub fn repeat_forever(interval: std::time::Duration) -> Result<Self, ScheduleError> {
        Self::new(interval, None)
    }

    pub fn new(
        interval: std::time::Duration,
        repeat_count: Option<u32>,
    ) -> Result<Self, ScheduleError> {
        let repeat_interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
        if repeat_count != Some(0) && repeat_interval_ms < 1 {
            return Err(ScheduleError::InvalidInterval(repeat_interval_ms));
        }
        Ok(Self {
            repeat_interval_ms,
            repeat_count,
        })
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::milliseconds(self.repeat_interval_ms)
    }

    pub fn repeat_count(&self) -> Option<u32> {
        self.repeat_count
    }

    pub(crate) fn set_repeat_count(&mut self, repeat_count: Option<u32>) {
        self.repeat_count = repeat_count;
    }

    pub(crate) fn fire_time_after(
        &self,
        window: &FireWindow,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if let Some(count) = self.repeat_count {
            if window.times_triggered > count {
                return None;
            }
            if count == 0 && after >= window.start {
                return None;
            }
        }
        if window.end.is_some_and(|end| end <= after) {
            return None;
        }
        if after < window.start {
            return Some(window.start);
        }

        let elapsed = (after - window.start).num_milliseconds();
        let fired = elapsed / self.repeat_interval_ms + 1;
        if let Some(count) = self.repeat_count {
            if fired > i64::from(count) {
                return None;
            }
        }
        let next = window.start + Duration::milliseconds(fired * self.repeat_interval_ms);
        if window.past_end(next) {
            return None;
        }
        Some(next)
    }

    /// Whole intervals between two instants
    pub(crate) fn times_fired_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
        if self.repeat_interval_ms < 1 || end <= start {
            return 0;
        }
        let n = (end - start).num_milliseconds() / self.repeat_interval_ms;
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
#[path = "simple_tests.rs"]
mod tests;
