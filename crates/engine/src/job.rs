// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs, job types, and the factory that instantiates them per fire

use crate::context::JobExecutionContext;
use crate::error::SchedulerError;
use crate::store::FiredTriggerBundle;
use kairos_core::{
    ConcurrencyPolicy, JobCapabilities, JobDetail, JobExecutionError, JobKey, PersistencePolicy,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A unit of work run by the scheduler
pub trait Job: Send {
    fn execute(&self, context: &mut JobExecutionContext) -> Result<(), JobExecutionError>;
}

type Constructor = dyn Fn() -> Result<Box<dyn Job>, String> + Send + Sync;

/// A named kind of job with its capability flags and constructor
#[derive(Clone)]
pub struct JobType {
    name: String,
    capabilities: JobCapabilities,
    constructor: Arc<Constructor>,
}

impl JobType {
    pub fn new<F, J>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> J + Send + Sync + 'static,
        J: Job + 'static,
    {
        Self::fallible(name, move || Ok(constructor()))
    }

    /// A job type whose constructor can fail
    pub fn fallible<F, J>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Result<J, String> + Send + Sync + 'static,
        J: Job + 'static,
    {
        Self {
            name: name.into(),
            capabilities: JobCapabilities::default(),
            constructor: Arc::new(move || constructor().map(|job| Box::new(job) as Box<dyn Job>)),
        }
    }

    pub fn disallow_concurrent_execution(mut self) -> Self {
        self.capabilities.concurrency = ConcurrencyPolicy::Disallow;
        self
    }

    pub fn persist_job_data_after_execution(mut self) -> Self {
        self.capabilities.persistence = PersistencePolicy::PersistAfterExecution;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> JobCapabilities {
        self.capabilities
    }

    fn instantiate(&self) -> Result<Box<dyn Job>, String> {
        (self.constructor)()
    }
}

impl std::fmt::Debug for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobType")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Registered job types, keyed by name
#[derive(Debug, Default)]
pub struct JobTypeRegistry {
    types: RwLock<HashMap<String, JobType>>,
}

impl JobTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job type, replacing any previous type of the same name
    pub fn register(&self, job_type: JobType) -> JobCapabilities {
        let capabilities = job_type.capabilities();
        let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
        types.insert(job_type.name.clone(), job_type);
        capabilities
    }

    pub fn capabilities(&self, name: &str) -> Option<JobCapabilities> {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.get(name).map(JobType::capabilities)
    }

    pub fn contains(&self, name: &str) -> bool {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.contains_key(name)
    }

    /// Build a job detail for a registered type with its capabilities copied in
    pub fn describe(&self, key: JobKey, job_type: &str) -> Result<JobDetail, SchedulerError> {
        let capabilities = self
            .capabilities(job_type)
            .ok_or_else(|| SchedulerError::UnknownJobType(job_type.to_string()))?;
        Ok(JobDetail::new(key, job_type).capabilities(capabilities))
    }

    fn get(&self, name: &str) -> Option<JobType> {
        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.get(name).cloned()
    }
}

/// Produces a fresh job instance for each fire
pub trait JobFactory: Send + Sync {
    fn new_job(&self, bundle: &FiredTriggerBundle) -> Result<Box<dyn Job>, SchedulerError>;

    /// Hand an instance back once its fire is over
    fn return_job(&self, _job: Box<dyn Job>) {}
}

/// Factory backed by a [`JobTypeRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryJobFactory {
    registry: Arc<JobTypeRegistry>,
}

impl RegistryJobFactory {
    pub fn new(registry: Arc<JobTypeRegistry>) -> Self {
        Self { registry }
    }
}

impl JobFactory for RegistryJobFactory {
    fn new_job(&self, bundle: &FiredTriggerBundle) -> Result<Box<dyn Job>, SchedulerError> {
        let detail = &bundle.job_detail;
        let job_type = self
            .registry
            .get(&detail.job_type)
            .ok_or_else(|| SchedulerError::UnknownJobType(detail.job_type.clone()))?;
        job_type
            .instantiate()
            .map_err(|message| SchedulerError::JobInstantiation {
                job: detail.key.clone(),
                message,
            })
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
