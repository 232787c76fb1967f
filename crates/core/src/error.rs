// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation errors for schedules and triggers

use thiserror::Error;

/// Rejected schedule or trigger definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("repeat interval must be positive, got {0}")]
    InvalidInterval(i64),
    #[error("interval unit {0} is not supported by {1} schedules")]
    UnsupportedUnit(String, &'static str),
    #[error("daily interval may not exceed 24 hours, got {0} seconds")]
    IntervalTooLong(i64),
    #[error("days of week must be a non-empty subset of 1..=7")]
    InvalidDaysOfWeek,
    #[error("invalid time of day {hour:02}:{minute:02}:{second:02}")]
    InvalidTimeOfDay { hour: u32, minute: u32, second: u32 },
    #[error("end time of day {end} is before start time of day {start}")]
    EndTimeOfDayBeforeStart { start: String, end: String },
    #[error("start time of day must be set before deriving the end time of day")]
    StartTimeOfDayNotSet,
    #[error("daily fire count must be positive, got {0}")]
    InvalidDailyCount(i64),
    #[error("daily fire count {0} does not fit within one day")]
    DailyCountTooLarge(u32),
    #[error("repeat count must be non-negative, got {0}")]
    InvalidRepeatCount(i64),
    #[error("misfire instruction {instruction} is not valid for {family} triggers")]
    InvalidMisfireInstruction {
        instruction: String,
        family: &'static str,
    },
    #[error("unknown misfire instruction code {0}")]
    UnknownMisfireCode(i32),
    #[error("invalid cron expression {expression:?}: {message}")]
    InvalidCronExpression { expression: String, message: String },
    #[error("trigger must reference a job")]
    MissingJobKey,
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),
    #[error("end time must not be before start time")]
    EndBeforeStart,
}
