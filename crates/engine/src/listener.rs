// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener traits
//!
//! Job and trigger listeners are registered by name together with the
//! matchers that select which keys they hear about. Scheduler listeners hear
//! about everything. Every method has a no-op default so listeners only
//! implement what they care about.

use crate::context::JobExecutionContext;
use crate::error::SchedulerError;
use kairos_core::{
    CompletedExecutionInstruction, JobDetail, JobExecutionError, JobKey, Trigger, TriggerKey,
};
use thiserror::Error;

/// Failure raised by a listener callback
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub trait JobListener: Send + Sync {
    fn name(&self) -> &str;

    fn job_to_be_executed(&self, _context: &JobExecutionContext) -> Result<(), ListenerError> {
        Ok(())
    }

    fn job_execution_vetoed(&self, _context: &JobExecutionContext) -> Result<(), ListenerError> {
        Ok(())
    }

    fn job_was_executed(
        &self,
        _context: &JobExecutionContext,
        _error: Option<&JobExecutionError>,
    ) -> Result<(), ListenerError> {
        Ok(())
    }
}

pub trait TriggerListener: Send + Sync {
    fn name(&self) -> &str;

    fn trigger_fired(
        &self,
        _trigger: &Trigger,
        _context: &JobExecutionContext,
    ) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Return `true` to stop the job from running for this fire
    fn veto_job_execution(
        &self,
        _trigger: &Trigger,
        _context: &JobExecutionContext,
    ) -> Result<bool, ListenerError> {
        Ok(false)
    }

    fn trigger_misfired(&self, _trigger: &Trigger) -> Result<(), ListenerError> {
        Ok(())
    }

    fn trigger_complete(
        &self,
        _trigger: &Trigger,
        _context: &JobExecutionContext,
        _instruction: CompletedExecutionInstruction,
    ) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Scheduler-wide notifications
pub trait SchedulerListener: Send + Sync {
    fn job_scheduled(&self, _trigger: &Trigger) {}

    fn job_unscheduled(&self, _key: &TriggerKey) {}

    /// The trigger will never fire again
    fn trigger_finalized(&self, _trigger: &Trigger) {}

    fn trigger_paused(&self, _key: &TriggerKey) {}

    fn triggers_paused(&self, _group: &str) {}

    fn trigger_resumed(&self, _key: &TriggerKey) {}

    fn triggers_resumed(&self, _group: &str) {}

    fn job_added(&self, _job: &JobDetail) {}

    fn job_deleted(&self, _key: &JobKey) {}

    fn job_paused(&self, _key: &JobKey) {}

    fn jobs_paused(&self, _group: &str) {}

    fn job_resumed(&self, _key: &JobKey) {}

    fn jobs_resumed(&self, _group: &str) {}

    fn scheduler_error(&self, _message: &str, _error: &SchedulerError) {}

    fn scheduler_in_standby_mode(&self) {}

    fn scheduler_started(&self) {}

    fn scheduler_shutting_down(&self) {}

    fn scheduler_shutdown(&self) {}

    fn scheduling_data_cleared(&self) {}
}
