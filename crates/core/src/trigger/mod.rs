// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggers: when a job fires
//!
//! A trigger pairs a schedule with the per-trigger firing state
//! (`next_fire_time`, `previous_fire_time`, `times_triggered`). The store
//! owns the trigger between firings; during a firing the execution shell
//! owns a snapshot and reports the outcome back.

mod builder;
mod calendar_interval;
mod cron;
mod daily_time_interval;
mod local;
mod misfire;
mod simple;

pub use builder::TriggerBuilder;
pub use calendar_interval::CalendarIntervalSchedule;
pub use cron::CronSchedule;
pub use daily_time_interval::{DailyTimeIntervalSchedule, DailyTimeIntervalScheduleBuilder};
pub use misfire::MisfireInstruction;
pub use simple::SimpleSchedule;

use crate::calendar::ExclusionCalendar;
use crate::instruction::CompletedExecutionInstruction;
use crate::job::{JobDataMap, JobDetail, JobExecutionError, UnscheduleDisposition, UnscheduleScope};
use crate::key::{JobKey, TriggerKey};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fire-time searches stop once candidates reach this year
pub const YEAR_TO_GIVE_UP_SCHEDULING_AT: i32 = 2299;

/// Priority used when none is given; higher fires first on ties
pub const DEFAULT_PRIORITY: i32 = 5;

/// Store-visible state of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerState {
    None,
    Normal,
    Paused,
    Complete,
    Error,
    Blocked,
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerState::None => "none",
            TriggerState::Normal => "normal",
            TriggerState::Paused => "paused",
            TriggerState::Complete => "complete",
            TriggerState::Error => "error",
            TriggerState::Blocked => "blocked",
        };
        write!(f, "{}", s)
    }
}

/// Calendar units for interval schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalUnit {
    /// Length in seconds for the fixed-length units
    pub(crate) fn fixed_seconds(self) -> Option<i64> {
        match self {
            IntervalUnit::Second => Some(1),
            IntervalUnit::Minute => Some(60),
            IntervalUnit::Hour => Some(3_600),
            IntervalUnit::Day => Some(86_400),
            IntervalUnit::Week | IntervalUnit::Month | IntervalUnit::Year => None,
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntervalUnit::Second => "second",
            IntervalUnit::Minute => "minute",
            IntervalUnit::Hour => "hour",
            IntervalUnit::Day => "day",
            IntervalUnit::Week => "week",
            IntervalUnit::Month => "month",
            IntervalUnit::Year => "year",
        };
        write!(f, "{}", s)
    }
}

/// Trigger family, used to pick misfire rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleFamily {
    Simple,
    Cron,
    CalendarInterval,
    DailyTimeInterval,
}

impl ScheduleFamily {
    pub fn name(self) -> &'static str {
        match self {
            ScheduleFamily::Simple => "simple",
            ScheduleFamily::Cron => "cron",
            ScheduleFamily::CalendarInterval => "calendar interval",
            ScheduleFamily::DailyTimeInterval => "daily time interval",
        }
    }
}

/// The bounds and progress a schedule needs to place the next fire
#[derive(Debug, Clone, Copy)]
pub(crate) struct FireWindow {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub times_triggered: u32,
}

impl FireWindow {
    pub(crate) fn past_end(&self, candidate: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| candidate > end)
    }
}

/// How a trigger repeats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Schedule {
    Simple(SimpleSchedule),
    Cron(CronSchedule),
    CalendarInterval(CalendarIntervalSchedule),
    DailyTimeInterval(DailyTimeIntervalSchedule),
}

impl Schedule {
    pub fn family(&self) -> ScheduleFamily {
        match self {
            Schedule::Simple(_) => ScheduleFamily::Simple,
            Schedule::Cron(_) => ScheduleFamily::Cron,
            Schedule::CalendarInterval(_) => ScheduleFamily::CalendarInterval,
            Schedule::DailyTimeInterval(_) => ScheduleFamily::DailyTimeInterval,
        }
    }

    fn fire_time_after(&self, window: &FireWindow, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Schedule::Simple(s) => s.fire_time_after(window, after),
            Schedule::Cron(s) => s.fire_time_after(window, after),
            Schedule::CalendarInterval(s) => s.fire_time_after(window, after),
            Schedule::DailyTimeInterval(s) => s.fire_time_after(window, after),
        }
    }
}

impl From<SimpleSchedule> for Schedule {
    fn from(s: SimpleSchedule) -> Self {
        Schedule::Simple(s)
    }
}

impl From<CronSchedule> for Schedule {
    fn from(s: CronSchedule) -> Self {
        Schedule::Cron(s)
    }
}

impl From<CalendarIntervalSchedule> for Schedule {
    fn from(s: CalendarIntervalSchedule) -> Self {
        Schedule::CalendarInterval(s)
    }
}

impl From<DailyTimeIntervalSchedule> for Schedule {
    fn from(s: DailyTimeIntervalSchedule) -> Self {
        Schedule::DailyTimeInterval(s)
    }
}

/// A schedule bound to a job, with its firing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub description: Option<String>,
    pub calendar_name: Option<String>,
    pub job_data: JobDataMap,
    pub priority: i32,
    pub misfire_instruction: MisfireInstruction,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub times_triggered: u32,
    pub schedule: Schedule,
}

impl Trigger {
    pub fn builder(key: TriggerKey) -> TriggerBuilder {
        TriggerBuilder::new(key)
    }

    pub fn family(&self) -> ScheduleFamily {
        self.schedule.family()
    }

    fn window(&self) -> FireWindow {
        FireWindow {
            start: self.start_time,
            end: self.end_time,
            times_triggered: self.times_triggered,
        }
    }

    /// Next schedule instant strictly after `after`, ignoring calendars
    pub fn fire_time_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.fire_time_after(&self.window(), after)
    }

    /// Next instant strictly after `after` that the calendar also includes
    pub fn compute_fire_time_after(
        &self,
        after: DateTime<Utc>,
        calendar: Option<&dyn ExclusionCalendar>,
    ) -> Option<DateTime<Utc>> {
        let mut next = self.fire_time_after(after)?;
        let Some(calendar) = calendar else {
            return Some(next);
        };
        while !calendar.is_time_included(next) {
            next = self.fire_time_after(next)?;
            if next.year() > YEAR_TO_GIVE_UP_SCHEDULING_AT {
                return None;
            }
        }
        Some(next)
    }

    /// Place the first fire time; called once when the trigger is stored
    pub fn compute_first_fire_time(
        &mut self,
        calendar: Option<&dyn ExclusionCalendar>,
    ) -> Option<DateTime<Utc>> {
        let before_start = self.start_time - Duration::milliseconds(1);
        self.next_fire_time = self.compute_fire_time_after(before_start, calendar);
        self.next_fire_time
    }

    /// Record a firing and move to the following fire time
    pub fn triggered(&mut self, calendar: Option<&dyn ExclusionCalendar>) {
        self.times_triggered = self.times_triggered.saturating_add(1);
        self.previous_fire_time = self.next_fire_time;
        self.next_fire_time = match self.next_fire_time {
            Some(fired) => self.compute_fire_time_after(fired, calendar),
            None => None,
        };
    }

    /// Apply the misfire instruction after the trigger missed its fire time
    pub fn update_after_misfire(
        &mut self,
        calendar: Option<&dyn ExclusionCalendar>,
        now: DateTime<Utc>,
    ) {
        misfire::apply(self, calendar, now);
    }

    /// Recompute the next fire time after the trigger's calendar changed
    pub fn update_with_new_calendar(
        &mut self,
        calendar: Option<&dyn ExclusionCalendar>,
        now: DateTime<Utc>,
        misfire_threshold: Duration,
    ) {
        if self.previous_fire_time.is_none() && self.next_fire_time.is_none() {
            return;
        }
        let after = self
            .previous_fire_time
            .unwrap_or(self.start_time - Duration::milliseconds(1));
        let mut next = self.compute_fire_time_after(after, calendar);
        if let Some(candidate) = next {
            if candidate < now && now - candidate >= misfire_threshold {
                next = self.compute_fire_time_after(now, calendar);
            }
        }
        self.next_fire_time = next;
    }

    /// Decide what the store does with this trigger after a firing
    pub fn execution_complete(
        &self,
        job: &JobDetail,
        failure: Option<&JobExecutionError>,
    ) -> CompletedExecutionInstruction {
        if let Some(failure) = failure {
            if failure.refire_immediately {
                return CompletedExecutionInstruction::ReExecuteJob;
            }
            if let Some(unschedule) = failure.unschedule {
                return match (unschedule.scope, unschedule.disposition) {
                    (UnscheduleScope::FiringTrigger, UnscheduleDisposition::Complete) => {
                        CompletedExecutionInstruction::SetTriggerComplete
                    }
                    (UnscheduleScope::FiringTrigger, UnscheduleDisposition::Paused) => {
                        CompletedExecutionInstruction::SetTriggerPaused
                    }
                    (UnscheduleScope::FiringTrigger, UnscheduleDisposition::Error) => {
                        CompletedExecutionInstruction::SetTriggerError
                    }
                    (UnscheduleScope::TriggerGroup, UnscheduleDisposition::Complete) => {
                        CompletedExecutionInstruction::SetAllJobsOfTriggerGroupComplete
                    }
                    (UnscheduleScope::TriggerGroup, UnscheduleDisposition::Paused) => {
                        CompletedExecutionInstruction::SetAllJobsOfTriggerGroupPaused
                    }
                    (UnscheduleScope::TriggerGroup, UnscheduleDisposition::Error) => {
                        CompletedExecutionInstruction::SetAllJobsOfTriggerGroupError
                    }
                };
            }
        }
        if self.next_fire_time.is_none() {
            if job.durable {
                return CompletedExecutionInstruction::SetTriggerComplete;
            }
            return CompletedExecutionInstruction::DeleteTrigger;
        }
        CompletedExecutionInstruction::Noop
    }

    pub fn may_fire_again(&self) -> bool {
        self.next_fire_time.is_some()
    }

    /// The first `count` fire times of a fresh copy of this trigger
    pub fn compute_fire_times(
        &self,
        calendar: Option<&dyn ExclusionCalendar>,
        count: usize,
    ) -> Vec<DateTime<Utc>> {
        let mut scratch = self.clone();
        scratch.times_triggered = 0;
        scratch.previous_fire_time = None;
        scratch.compute_first_fire_time(calendar);
        let mut times = Vec::with_capacity(count);
        while times.len() < count {
            let Some(next) = scratch.next_fire_time else {
                break;
            };
            times.push(next);
            scratch.triggered(calendar);
        }
        times
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
