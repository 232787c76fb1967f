// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job descriptions and job failures

use crate::key::JobKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form data handed to a job on every execution
pub type JobDataMap = BTreeMap<String, serde_json::Value>;

/// Whether instances of one job may run at the same time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConcurrencyPolicy {
    #[default]
    Allow,
    Disallow,
}

/// Whether data the job writes back is kept after execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistencePolicy {
    #[default]
    Transient,
    PersistAfterExecution,
}

/// Capability flags computed once when a job type is registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobCapabilities {
    pub concurrency: ConcurrencyPolicy,
    pub persistence: PersistencePolicy,
}

/// A stored job: its identity, the job type that implements it, and its data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub key: JobKey,
    pub job_type: String,
    pub description: Option<String>,
    /// Kept when no trigger references it
    pub durable: bool,
    /// Re-run after a crash that interrupted execution
    pub requests_recovery: bool,
    pub concurrency: ConcurrencyPolicy,
    pub persistence: PersistencePolicy,
    pub job_data: JobDataMap,
}

impl JobDetail {
    pub fn new(key: JobKey, job_type: impl Into<String>) -> Self {
        Self {
            key,
            job_type: job_type.into(),
            description: None,
            durable: false,
            requests_recovery: false,
            concurrency: ConcurrencyPolicy::Allow,
            persistence: PersistencePolicy::Transient,
            job_data: JobDataMap::new(),
        }
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn requests_recovery(mut self, requests_recovery: bool) -> Self {
        self.requests_recovery = requests_recovery;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn capabilities(mut self, capabilities: JobCapabilities) -> Self {
        self.concurrency = capabilities.concurrency;
        self.persistence = capabilities.persistence;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.job_data.insert(key.into(), value);
        self
    }

    pub fn is_concurrent_execution_disallowed(&self) -> bool {
        self.concurrency == ConcurrencyPolicy::Disallow
    }

    pub fn is_persist_job_data_after_execution(&self) -> bool {
        self.persistence == PersistencePolicy::PersistAfterExecution
    }
}

/// Which triggers an unschedule request applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnscheduleScope {
    FiringTrigger,
    /// Every trigger in the firing trigger's group
    TriggerGroup,
}

/// State the selected triggers move to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnscheduleDisposition {
    Complete,
    Paused,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unschedule {
    pub scope: UnscheduleScope,
    pub disposition: UnscheduleDisposition,
}

/// Failure reported by a job, carrying what the scheduler should do next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecutionError {
    pub message: String,
    pub refire_immediately: bool,
    pub unschedule: Option<Unschedule>,
}

impl JobExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            refire_immediately: false,
            unschedule: None,
        }
    }

    /// Normalize a caught panic payload
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::new(format!("job panicked: {}", detail))
    }

    pub fn refire_immediately(mut self) -> Self {
        self.refire_immediately = true;
        self
    }

    pub fn unschedule_firing_trigger(self) -> Self {
        self.unschedule(UnscheduleScope::FiringTrigger, UnscheduleDisposition::Complete)
    }

    pub fn unschedule_all_triggers(self) -> Self {
        self.unschedule(UnscheduleScope::TriggerGroup, UnscheduleDisposition::Complete)
    }

    pub fn unschedule(mut self, scope: UnscheduleScope, disposition: UnscheduleDisposition) -> Self {
        self.unschedule = Some(Unschedule { scope, disposition });
        self
    }
}

impl fmt::Display for JobExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for JobExecutionError {}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
