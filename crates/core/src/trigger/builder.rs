// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{MisfireInstruction, Schedule, SimpleSchedule, Trigger, DEFAULT_PRIORITY};
use crate::error::ScheduleError;
use crate::job::JobDataMap;
use crate::key::{JobKey, TriggerKey};
use chrono::{DateTime, Utc};

/// Assembles and validates a [`Trigger`]
#[derive(Debug, Clone)]
pub struct TriggerBuilder {
    key: TriggerKey,
    job_key: Option<JobKey>,
    description: Option<String>,
    calendar_name: Option<String>,
    job_data: JobDataMap,
    priority: i32,
    misfire_instruction: MisfireInstruction,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    schedule: Schedule,
}

impl TriggerBuilder {
    pub fn new(key: TriggerKey) -> Self {
        Self {
            key,
            job_key: None,
            description: None,
            calendar_name: None,
            job_data: JobDataMap::new(),
            priority: DEFAULT_PRIORITY,
            misfire_instruction: MisfireInstruction::Smart,
            start_time: None,
            end_time: None,
            schedule: Schedule::Simple(SimpleSchedule::once()),
        }
    }

    pub fn for_job(mut self, job_key: JobKey) -> Self {
        self.job_key = Some(job_key);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name of the exclusion calendar consulted for this trigger
    pub fn modified_by_calendar(mut self, calendar_name: impl Into<String>) -> Self {
        self.calendar_name = Some(calendar_name.into());
        self
    }

    pub fn using_job_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.job_data.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_misfire_instruction(mut self, instruction: MisfireInstruction) -> Self {
        self.misfire_instruction = instruction;
        self
    }

    pub fn start_at(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn end_at(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn with_schedule(mut self, schedule: impl Into<Schedule>) -> Self {
        self.schedule = schedule.into();
        self
    }

    /// Validate and build; the start time defaults to now
    pub fn build(self) -> Result<Trigger, ScheduleError> {
        if self.key.name().is_empty() {
            return Err(ScheduleError::EmptyName("trigger"));
        }
        let job_key = self.job_key.ok_or(ScheduleError::MissingJobKey)?;
        if job_key.name().is_empty() {
            return Err(ScheduleError::EmptyName("job"));
        }
        let start_time = self.start_time.unwrap_or_else(Utc::now);
        if self.end_time.is_some_and(|end| end < start_time) {
            return Err(ScheduleError::EndBeforeStart);
        }
        let family = self.schedule.family();
        if !self.misfire_instruction.is_valid_for(family) {
            return Err(ScheduleError::InvalidMisfireInstruction {
                instruction: self.misfire_instruction.to_string(),
                family: family.name(),
            });
        }
        Ok(Trigger {
            key: self.key,
            job_key,
            description: self.description,
            calendar_name: self.calendar_name,
            job_data: self.job_data,
            priority: self.priority,
            misfire_instruction: self.misfire_instruction,
            start_time,
            end_time: self.end_time,
            next_fire_time: None,
            previous_fire_time: None,
            times_triggered: 0,
            schedule: self.schedule,
        })
    }
}
