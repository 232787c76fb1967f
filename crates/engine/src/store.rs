// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage boundary between the scheduler and its job store
//!
//! The scheduler never touches trigger state directly. It acquires triggers
//! that are due, tells the store they fired, and reports the outcome of
//! each execution back through [`JobStore::triggered_job_complete`].

use crate::signals::SchedulerSignaler;
use chrono::{DateTime, Duration, Utc};
use kairos_core::{
    CompletedExecutionInstruction, ExclusionCalendar, FireInstanceId, GroupMatcher, JobDetail,
    JobKey, Trigger, TriggerKey, TriggerState,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors from job store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("job already exists: {0}")]
    JobExists(JobKey),
    #[error("trigger already exists: {0}")]
    TriggerExists(TriggerKey),
    #[error("calendar already exists: {0}")]
    CalendarExists(String),
    #[error("job not found: {0}")]
    JobNotFound(JobKey),
    #[error("trigger not found: {0}")]
    TriggerNotFound(TriggerKey),
    #[error("calendar not found: {0}")]
    CalendarNotFound(String),
    #[error("calendar {0} is referenced by a trigger")]
    CalendarInUse(String),
    #[error("trigger {0} will never fire")]
    TriggerWillNeverFire(TriggerKey),
    #[error("replacement for trigger {0} targets a different job")]
    TriggerJobChanged(TriggerKey),
    #[error("store not initialized")]
    NotInitialized,
}

/// Everything a worker needs to run one fire of a trigger
#[derive(Debug, Clone)]
pub struct FiredTriggerBundle {
    pub job_detail: JobDetail,
    /// Snapshot of the trigger after it was advanced past this fire
    pub trigger: Trigger,
    pub calendar: Option<Arc<dyn ExclusionCalendar>>,
    pub job_is_recovering: bool,
    pub fire_time: DateTime<Utc>,
    pub scheduled_fire_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub fire_instance_id: FireInstanceId,
}

/// Per-trigger result of [`JobStore::triggers_fired`]
#[derive(Debug, Clone)]
pub enum TriggerFiredResult {
    Fired(Box<FiredTriggerBundle>),
    /// The trigger was removed, paused, or is no longer acquired
    Unavailable(TriggerKey),
    Failed { key: TriggerKey, error: StoreError },
}

/// Persistent or in-memory home of jobs, triggers, and calendars.
///
/// Implementations are synchronous and internally locked; callers may share
/// one store across the acquisition loop and every worker.
pub trait JobStore: Send + Sync {
    /// Short human-readable name for metadata
    fn name(&self) -> &'static str;

    /// Wire the store to the scheduler before any other call
    fn initialize(
        &self,
        signaler: Arc<dyn SchedulerSignaler>,
        misfire_threshold: Duration,
    ) -> Result<(), StoreError>;

    fn store_job(&self, job: JobDetail, replace_existing: bool) -> Result<(), StoreError>;

    fn store_trigger(&self, trigger: Trigger, replace_existing: bool) -> Result<(), StoreError>;

    fn store_job_and_trigger(&self, job: JobDetail, trigger: Trigger) -> Result<(), StoreError>;

    /// Remove a job and all of its triggers
    fn remove_job(&self, key: &JobKey) -> Result<bool, StoreError>;

    /// Remove a trigger, and its job when the job is not durable and has no
    /// other triggers
    fn remove_trigger(&self, key: &TriggerKey) -> Result<bool, StoreError>;

    /// Swap a trigger for a new one bound to the same job
    fn replace_trigger(&self, key: &TriggerKey, trigger: Trigger) -> Result<bool, StoreError>;

    fn retrieve_job(&self, key: &JobKey) -> Result<Option<JobDetail>, StoreError>;

    fn retrieve_trigger(&self, key: &TriggerKey) -> Result<Option<Trigger>, StoreError>;

    fn triggers_for_job(&self, key: &JobKey) -> Result<Vec<Trigger>, StoreError>;

    fn job_keys(&self, matcher: &GroupMatcher) -> Result<Vec<JobKey>, StoreError>;

    fn trigger_keys(&self, matcher: &GroupMatcher) -> Result<Vec<TriggerKey>, StoreError>;

    fn number_of_jobs(&self) -> Result<usize, StoreError>;

    fn number_of_triggers(&self) -> Result<usize, StoreError>;

    fn number_of_calendars(&self) -> Result<usize, StoreError>;

    fn store_calendar(
        &self,
        name: &str,
        calendar: Arc<dyn ExclusionCalendar>,
        replace_existing: bool,
        update_triggers: bool,
    ) -> Result<(), StoreError>;

    fn remove_calendar(&self, name: &str) -> Result<bool, StoreError>;

    fn retrieve_calendar(&self, name: &str)
        -> Result<Option<Arc<dyn ExclusionCalendar>>, StoreError>;

    fn trigger_state(&self, key: &TriggerKey) -> Result<TriggerState, StoreError>;

    fn reset_trigger_from_error_state(&self, key: &TriggerKey) -> Result<(), StoreError>;

    fn pause_trigger(&self, key: &TriggerKey) -> Result<(), StoreError>;

    /// Pause matching trigger groups; returns the groups paused
    fn pause_triggers(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError>;

    fn pause_job(&self, key: &JobKey) -> Result<(), StoreError>;

    fn pause_jobs(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError>;

    fn resume_trigger(&self, key: &TriggerKey) -> Result<(), StoreError>;

    fn resume_triggers(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError>;

    fn resume_job(&self, key: &JobKey) -> Result<(), StoreError>;

    fn resume_jobs(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError>;

    fn paused_trigger_groups(&self) -> Result<BTreeSet<String>, StoreError>;

    /// Claim up to `max_count` triggers due no later than `no_later_than`
    /// plus `time_window`, earliest first
    fn acquire_next_triggers(
        &self,
        no_later_than: DateTime<Utc>,
        max_count: usize,
        time_window: Duration,
    ) -> Result<Vec<Trigger>, StoreError>;

    /// Give back a trigger acquired but not fired
    fn release_acquired_trigger(&self, trigger: &Trigger) -> Result<(), StoreError>;

    /// Advance the acquired triggers and hand back what each worker needs
    fn triggers_fired(&self, triggers: &[Trigger]) -> Result<Vec<TriggerFiredResult>, StoreError>;

    /// Apply the outcome of an execution to the trigger and its job
    fn triggered_job_complete(
        &self,
        trigger: &Trigger,
        job: &JobDetail,
        instruction: CompletedExecutionInstruction,
    ) -> Result<(), StoreError>;

    /// Drop every job, trigger, and calendar
    fn clear(&self) -> Result<(), StoreError>;
}
