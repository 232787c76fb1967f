// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-expression schedule evaluated in a time zone

use super::FireWindow;
use crate::error::ScheduleError;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Seconds-resolution cron expression (`sec min hour day month weekday [year]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CronScheduleRepr", into = "CronScheduleRepr")]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
    time_zone: Tz,
}

#[derive(Serialize, Deserialize)]
struct CronScheduleRepr {
    expression: String,
    time_zone: Tz,
}

impl TryFrom<CronScheduleRepr> for CronSchedule {
    type Error = ScheduleError;

    fn try_from(repr: CronScheduleRepr) -> Result<Self, Self::Error> {
        CronSchedule::new(&repr.expression, repr.time_zone)
    }
}

impl From<CronSchedule> for CronScheduleRepr {
    fn from(schedule: CronSchedule) -> Self {
        Self {
            expression: schedule.expression,
            time_zone: schedule.time_zone,
        }
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression && self.time_zone == other.time_zone
    }
}

impl CronSchedule {
    pub fn new(expression: &str, time_zone: Tz) -> Result<Self, ScheduleError> {
        let schedule =
            cron::Schedule::from_str(expression).map_err(|e| ScheduleError::InvalidCronExpression {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
            time_zone,
        })
    }

    /// Expression evaluated in UTC
    pub fn utc(expression: &str) -> Result<Self, ScheduleError> {
        Self::new(expression, Tz::UTC)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub(crate) fn fire_time_after(
        &self,
        window: &FireWindow,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let before_start = window.start - Duration::milliseconds(1);
        let after = after.max(before_start);
        if window.end.is_some_and(|end| after >= end) {
            return None;
        }
        let local = after.with_timezone(&self.time_zone);
        let next = self
            .schedule
            .after(&local)
            .map(|t| t.with_timezone(&Utc))
            .find(|t| *t > after && *t >= window.start)?;
        if window.past_end(next) {
            return None;
        }
        Some(next)
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
