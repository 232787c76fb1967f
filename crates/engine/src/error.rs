// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the scheduler engine

use crate::store::StoreError;
use kairos_core::{JobExecutionError, JobKey, ScheduleError, TriggerKey};
use thiserror::Error;

/// Errors surfaced by the scheduler and reported to scheduler listeners
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to instantiate job {job}: {message}")]
    JobInstantiation { job: JobKey, message: String },
    #[error("unknown job type: {0}")]
    UnknownJobType(String),
    #[error("listener {listener} failed: {message}")]
    Listener { listener: String, message: String },
    #[error("listener name must not be empty")]
    EmptyListenerName,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("trigger logic failed for {trigger}: {message}")]
    TriggerLogic { trigger: TriggerKey, message: String },
    #[error("job {job} failed: {source}")]
    JobFailed {
        job: JobKey,
        source: JobExecutionError,
    },
    #[error("execution boundary failed: {0}")]
    Boundary(String),
    #[error("trigger {0} will never fire")]
    WillNeverFire(TriggerKey),
    #[error("job {0} has no trigger and is not durable")]
    NonDurableJob(JobKey),
    #[error("trigger {trigger} does not reference job {job}")]
    TriggerJobMismatch { trigger: TriggerKey, job: JobKey },
    #[error("calendar not found: {0}")]
    CalendarNotFound(String),
    #[error("scheduler has been shut down")]
    Shutdown,
    #[error("scheduler must be started inside a tokio runtime")]
    NoRuntime,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
