// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kairos-core: trigger time computation and firing values
//!
//! This crate provides:
//! - Job and trigger keys, and the matchers that select them
//! - Exclusion calendars
//! - The trigger family (simple, cron, calendar interval, daily time interval)
//!   with misfire policy and the per-firing state transitions
//! - Job descriptions, job failures and completion instructions

pub mod calendar;
pub mod clock;
pub mod error;
pub mod id;
pub mod instruction;
pub mod job;
pub mod key;
pub mod matcher;
pub mod time_of_day;
pub mod trigger;

pub use calendar::{DailyCalendar, ExclusionCalendar, HolidayCalendar, WeeklyCalendar};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::ScheduleError;
pub use id::{FireInstanceId, IdGen, SequentialIdGen, UuidIdGen};
pub use instruction::CompletedExecutionInstruction;
pub use job::{
    ConcurrencyPolicy, JobCapabilities, JobDataMap, JobDetail, JobExecutionError,
    PersistencePolicy, Unschedule, UnscheduleDisposition, UnscheduleScope,
};
pub use key::{JobKey, Key, TriggerKey, DEFAULT_GROUP};
pub use matcher::{GroupMatcher, Matcher, StringOperator};
pub use time_of_day::TimeOfDay;
pub use trigger::{
    CalendarIntervalSchedule, CronSchedule, DailyTimeIntervalSchedule, IntervalUnit,
    MisfireInstruction, Schedule, ScheduleFamily, SimpleSchedule, Trigger, TriggerBuilder,
    TriggerState,
};
