// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-fire execution context handed to jobs and listeners

use crate::store::FiredTriggerBundle;
use chrono::{DateTime, Utc};
use kairos_core::{ExclusionCalendar, FireInstanceId, JobDataMap, JobDetail, Trigger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative interruption flag shared between a running job and the scheduler
#[derive(Debug, Clone, Default)]
pub struct InterruptToken(Arc<AtomicBool>);

impl InterruptToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State visible to a job for one fire.
///
/// The merged data map is the job's data overlaid with the trigger's data,
/// trigger values winning.
#[derive(Debug)]
pub struct JobExecutionContext {
    job_detail: JobDetail,
    trigger: Trigger,
    calendar: Option<Arc<dyn ExclusionCalendar>>,
    merged_job_data: JobDataMap,
    recovering: bool,
    fire_time: DateTime<Utc>,
    scheduled_fire_time: Option<DateTime<Utc>>,
    previous_fire_time: Option<DateTime<Utc>>,
    next_fire_time: Option<DateTime<Utc>>,
    fire_instance_id: FireInstanceId,
    refire_count: u32,
    result: Option<serde_json::Value>,
    job_run_time: Option<Duration>,
    interrupt: InterruptToken,
}

impl JobExecutionContext {
    pub fn new(bundle: &FiredTriggerBundle) -> Self {
        let mut merged_job_data = bundle.job_detail.job_data.clone();
        merged_job_data.extend(bundle.trigger.job_data.clone());
        Self {
            job_detail: bundle.job_detail.clone(),
            trigger: bundle.trigger.clone(),
            calendar: bundle.calendar.clone(),
            merged_job_data,
            recovering: bundle.job_is_recovering,
            fire_time: bundle.fire_time,
            scheduled_fire_time: bundle.scheduled_fire_time,
            previous_fire_time: bundle.previous_fire_time,
            next_fire_time: bundle.next_fire_time,
            fire_instance_id: bundle.fire_instance_id.clone(),
            refire_count: 0,
            result: None,
            job_run_time: None,
            interrupt: InterruptToken::new(),
        }
    }

    pub fn job_detail(&self) -> &JobDetail {
        &self.job_detail
    }

    /// Job-level data, persisted after execution when the job type asks for it
    pub fn job_data_mut(&mut self) -> &mut JobDataMap {
        &mut self.job_detail.job_data
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn calendar(&self) -> Option<&Arc<dyn ExclusionCalendar>> {
        self.calendar.as_ref()
    }

    pub fn merged_job_data(&self) -> &JobDataMap {
        &self.merged_job_data
    }

    pub fn merged_job_data_mut(&mut self) -> &mut JobDataMap {
        &mut self.merged_job_data
    }

    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    pub fn fire_time(&self) -> DateTime<Utc> {
        self.fire_time
    }

    pub fn scheduled_fire_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_fire_time
    }

    pub fn previous_fire_time(&self) -> Option<DateTime<Utc>> {
        self.previous_fire_time
    }

    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.next_fire_time
    }

    pub fn fire_instance_id(&self) -> &FireInstanceId {
        &self.fire_instance_id
    }

    /// Number of times this fire has been re-executed
    pub fn refire_count(&self) -> u32 {
        self.refire_count
    }

    pub(crate) fn increment_refire_count(&mut self) {
        self.refire_count += 1;
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, result: serde_json::Value) {
        self.result = Some(result);
    }

    pub(crate) fn clear_result(&mut self) {
        self.result = None;
    }

    pub fn job_run_time(&self) -> Option<Duration> {
        self.job_run_time
    }

    pub(crate) fn set_job_run_time(&mut self, elapsed: Duration) {
        self.job_run_time = Some(elapsed);
    }

    pub fn interrupt_token(&self) -> &InterruptToken {
        &self.interrupt
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_interrupted()
    }
}
