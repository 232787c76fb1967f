// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler facade
//!
//! Owns the core, the worker pool, and the acquisition loop task. Scheduling
//! operations go to the store and are echoed to scheduler listeners.

use crate::acquire::AcquisitionLoop;
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::job::{JobFactory, JobType, JobTypeRegistry, RegistryJobFactory};
use crate::pool::WorkerPool;
use crate::registry::ListenerRegistry;
use crate::shell::ExecutionBoundary;
use crate::signals::{ExecutingJob, SchedulerCore, SchedulerSignaler};
use crate::store::JobStore;
use chrono::{DateTime, Utc};
use kairos_core::{
    Clock, ExclusionCalendar, FireInstanceId, GroupMatcher, IdGen, JobCapabilities, JobDataMap,
    JobDetail, JobKey, Trigger, TriggerKey, TriggerState, UuidIdGen,
};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Group of triggers created by [`Scheduler::trigger_job`]
pub const MANUAL_TRIGGER_GROUP: &str = "MANUAL_TRIGGER";

/// Snapshot of a scheduler's identity and status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerMetadata {
    pub instance_name: String,
    pub instance_id: String,
    pub job_store: &'static str,
    pub started: bool,
    pub in_standby_mode: bool,
    pub shutdown: bool,
    pub running_since: Option<DateTime<Utc>>,
    pub number_of_jobs_executed: u64,
    pub thread_pool_size: usize,
    pub max_batch_size: usize,
}

#[derive(Default)]
struct Lifecycle {
    acquisition: Option<JoinHandle<()>>,
    running_since: Option<DateTime<Utc>>,
    shutdown: bool,
}

pub struct Scheduler<C: Clock> {
    config: SchedulerConfig,
    core: Arc<SchedulerCore>,
    pool: Arc<WorkerPool>,
    job_types: Arc<JobTypeRegistry>,
    clock: C,
    lifecycle: Mutex<Lifecycle>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn JobStore>,
        clock: C,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let job_types = Arc::new(JobTypeRegistry::new());
        let factory = Arc::new(RegistryJobFactory::new(Arc::clone(&job_types)));
        let core = Arc::new(SchedulerCore::new(
            config.instance_name.clone(),
            config.instance_id.clone(),
            Arc::clone(&store),
            factory,
        ));
        store.initialize(
            Arc::clone(&core) as Arc<dyn SchedulerSignaler>,
            config.misfire_threshold_chrono(),
        )?;
        tracing::info!(
            instance = %config.instance_name,
            store = store.name(),
            threads = config.thread_count,
            "scheduler created"
        );
        Ok(Self {
            pool: Arc::new(WorkerPool::new(config.thread_count)),
            config,
            core,
            job_types,
            clock,
            lifecycle: Mutex::new(Lifecycle::default()),
        })
    }

    pub fn core(&self) -> &Arc<SchedulerCore> {
        &self.core
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        self.core.listeners()
    }

    fn store(&self) -> &Arc<dyn JobStore> {
        self.core.store()
    }

    pub fn register_job_type(&self, job_type: JobType) -> JobCapabilities {
        self.job_types.register(job_type)
    }

    pub fn job_types(&self) -> &Arc<JobTypeRegistry> {
        &self.job_types
    }

    pub fn set_job_factory(&self, factory: Arc<dyn JobFactory>) {
        self.core.set_job_factory(factory);
    }

    pub fn set_execution_boundary(&self, boundary: Arc<dyn ExecutionBoundary>) {
        self.core.set_boundary(boundary);
    }

    // -- lifecycle --

    /// Start firing triggers; must be called inside a tokio runtime
    pub fn start(&self) -> Result<(), SchedulerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if lifecycle.shutdown {
            return Err(SchedulerError::Shutdown);
        }
        if lifecycle.acquisition.is_none() {
            let acquisition = AcquisitionLoop::new(
                Arc::clone(&self.core),
                Arc::clone(&self.pool),
                self.clock.clone(),
                self.config.clone(),
            );
            lifecycle.acquisition = Some(runtime.spawn(acquisition.run()));
        }
        if lifecycle.running_since.is_none() {
            lifecycle.running_since = Some(self.clock.now());
        }
        drop(lifecycle);

        self.core.set_standby(false);
        self.core.signal_scheduling_change(None);
        tracing::info!(instance = %self.config.instance_name, "scheduler started");
        self.core.notify_scheduler_listeners(|l| l.scheduler_started());
        Ok(())
    }

    /// Stop firing triggers without shutting down
    pub fn standby(&self) {
        self.core.set_standby(true);
        self.core.signal_scheduling_change(None);
        tracing::info!(instance = %self.config.instance_name, "scheduler in standby");
        self.core
            .notify_scheduler_listeners(|l| l.scheduler_in_standby_mode());
    }

    pub fn is_started(&self) -> bool {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        lifecycle.running_since.is_some()
    }

    pub fn is_in_standby_mode(&self) -> bool {
        self.core.is_in_standby()
    }

    pub fn is_shutdown(&self) -> bool {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        lifecycle.shutdown
    }

    /// Stop the acquisition loop and the worker pool
    pub async fn shutdown(&self, wait_for_jobs_to_complete: bool) {
        let acquisition = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
            if lifecycle.shutdown {
                return;
            }
            lifecycle.shutdown = true;
            lifecycle.acquisition.take()
        };

        tracing::info!(
            instance = %self.config.instance_name,
            wait = wait_for_jobs_to_complete,
            "scheduler shutting down"
        );
        self.core
            .notify_scheduler_listeners(|l| l.scheduler_shutting_down());
        self.core.set_standby(true);
        self.core.begin_shutdown();

        if let Some(handle) = acquisition {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "acquisition loop failed");
            }
        }
        self.pool.shutdown(wait_for_jobs_to_complete).await;

        self.core.notify_scheduler_listeners(|l| l.scheduler_shutdown());
        tracing::info!(instance = %self.config.instance_name, "scheduler shut down");
    }

    pub fn metadata(&self) -> SchedulerMetadata {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        SchedulerMetadata {
            instance_name: self.config.instance_name.clone(),
            instance_id: self.config.instance_id.clone(),
            job_store: self.store().name(),
            started: lifecycle.running_since.is_some(),
            in_standby_mode: self.core.is_in_standby(),
            shutdown: lifecycle.shutdown,
            running_since: lifecycle.running_since,
            number_of_jobs_executed: self.core.jobs_executed(),
            thread_pool_size: self.pool.size(),
            max_batch_size: self.config.max_batch_size,
        }
    }

    fn ensure_running(&self) -> Result<(), SchedulerError> {
        if self.is_shutdown() {
            return Err(SchedulerError::Shutdown);
        }
        Ok(())
    }

    // -- scheduling --

    /// Copy registered capability flags onto the job
    fn with_registered_capabilities(&self, job: JobDetail) -> JobDetail {
        match self.job_types.capabilities(&job.job_type) {
            Some(capabilities) => job.capabilities(capabilities),
            None => job,
        }
    }

    fn prepare_trigger(&self, mut trigger: Trigger) -> Result<Trigger, SchedulerError> {
        let calendar = match &trigger.calendar_name {
            Some(name) => Some(
                self.store()
                    .retrieve_calendar(name)?
                    .ok_or_else(|| SchedulerError::CalendarNotFound(name.clone()))?,
            ),
            None => None,
        };
        if trigger
            .compute_first_fire_time(calendar.as_deref())
            .is_none()
        {
            return Err(SchedulerError::WillNeverFire(trigger.key.clone()));
        }
        Ok(trigger)
    }

    fn announce_scheduled(&self, trigger: &Trigger) {
        tracing::info!(
            trigger = %trigger.key,
            job = %trigger.job_key,
            next_fire_time = ?trigger.next_fire_time,
            "job scheduled"
        );
        self.core.notify_scheduler_listeners(|l| l.job_scheduled(trigger));
        self.core.signal_scheduling_change(trigger.next_fire_time);
    }

    /// Store a job with a trigger; returns the first fire time
    pub fn schedule_job(
        &self,
        job: JobDetail,
        trigger: Trigger,
    ) -> Result<DateTime<Utc>, SchedulerError> {
        self.ensure_running()?;
        if trigger.job_key != job.key {
            return Err(SchedulerError::TriggerJobMismatch {
                trigger: trigger.key,
                job: job.key,
            });
        }
        let job = self.with_registered_capabilities(job);
        let trigger = self.prepare_trigger(trigger)?;
        let first = trigger
            .next_fire_time
            .ok_or_else(|| SchedulerError::WillNeverFire(trigger.key.clone()))?;
        self.store().store_job_and_trigger(job.clone(), trigger.clone())?;
        self.core.notify_scheduler_listeners(|l| l.job_added(&job));
        self.announce_scheduled(&trigger);
        Ok(first)
    }

    /// Store a trigger for a job already in the store
    pub fn schedule_trigger(&self, trigger: Trigger) -> Result<DateTime<Utc>, SchedulerError> {
        self.ensure_running()?;
        let trigger = self.prepare_trigger(trigger)?;
        let first = trigger
            .next_fire_time
            .ok_or_else(|| SchedulerError::WillNeverFire(trigger.key.clone()))?;
        self.store().store_trigger(trigger.clone(), false)?;
        self.announce_scheduled(&trigger);
        Ok(first)
    }

    /// Store a job with no trigger; it must be durable
    pub fn add_job(&self, job: JobDetail, replace_existing: bool) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        if !job.durable {
            return Err(SchedulerError::NonDurableJob(job.key));
        }
        let job = self.with_registered_capabilities(job);
        self.store().store_job(job.clone(), replace_existing)?;
        self.core.signal_scheduling_change(None);
        self.core.notify_scheduler_listeners(|l| l.job_added(&job));
        Ok(())
    }

    pub fn delete_job(&self, key: &JobKey) -> Result<bool, SchedulerError> {
        self.ensure_running()?;
        let triggers = self.store().triggers_for_job(key)?;
        let removed = self.store().remove_job(key)?;
        if removed {
            for trigger in &triggers {
                self.core
                    .notify_scheduler_listeners(|l| l.job_unscheduled(&trigger.key));
            }
            self.core.signal_scheduling_change(None);
            self.core.notify_scheduler_listeners(|l| l.job_deleted(key));
        }
        Ok(removed)
    }

    pub fn unschedule_job(&self, key: &TriggerKey) -> Result<bool, SchedulerError> {
        self.ensure_running()?;
        let removed = self.store().remove_trigger(key)?;
        if removed {
            self.core.signal_scheduling_change(None);
            self.core.notify_scheduler_listeners(|l| l.job_unscheduled(key));
        }
        Ok(removed)
    }

    /// Replace a trigger; returns the new trigger's first fire time, or
    /// `None` when the old trigger was not found
    pub fn reschedule_job(
        &self,
        key: &TriggerKey,
        trigger: Trigger,
    ) -> Result<Option<DateTime<Utc>>, SchedulerError> {
        self.ensure_running()?;
        let trigger = self.prepare_trigger(trigger)?;
        let first = trigger.next_fire_time;
        if !self.store().replace_trigger(key, trigger.clone())? {
            return Ok(None);
        }
        self.core.notify_scheduler_listeners(|l| l.job_unscheduled(key));
        self.announce_scheduled(&trigger);
        Ok(first)
    }

    /// Fire a stored job once, now
    pub fn trigger_job(&self, key: &JobKey, data: JobDataMap) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        let name = format!("MT_{}", UuidIdGen.next());
        let mut trigger = Trigger::builder(TriggerKey::with_group(name, MANUAL_TRIGGER_GROUP))
            .for_job(key.clone())
            .start_at(self.clock.now())
            .build()?;
        trigger.job_data = data;
        self.schedule_trigger(trigger).map(|_| ())
    }

    // -- pause and resume --

    pub fn pause_trigger(&self, key: &TriggerKey) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.store().pause_trigger(key)?;
        self.core.signal_scheduling_change(None);
        self.core.notify_scheduler_listeners(|l| l.trigger_paused(key));
        Ok(())
    }

    pub fn pause_triggers(&self, matcher: &GroupMatcher) -> Result<Vec<String>, SchedulerError> {
        self.ensure_running()?;
        let groups = self.store().pause_triggers(matcher)?;
        self.core.signal_scheduling_change(None);
        for group in &groups {
            self.core.notify_scheduler_listeners(|l| l.triggers_paused(group));
        }
        Ok(groups)
    }

    pub fn pause_job(&self, key: &JobKey) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.store().pause_job(key)?;
        self.core.signal_scheduling_change(None);
        self.core.notify_scheduler_listeners(|l| l.job_paused(key));
        Ok(())
    }

    pub fn pause_jobs(&self, matcher: &GroupMatcher) -> Result<Vec<String>, SchedulerError> {
        self.ensure_running()?;
        let groups = self.store().pause_jobs(matcher)?;
        self.core.signal_scheduling_change(None);
        for group in &groups {
            self.core.notify_scheduler_listeners(|l| l.jobs_paused(group));
        }
        Ok(groups)
    }

    pub fn resume_trigger(&self, key: &TriggerKey) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.store().resume_trigger(key)?;
        self.core.signal_scheduling_change(None);
        self.core.notify_scheduler_listeners(|l| l.trigger_resumed(key));
        Ok(())
    }

    pub fn resume_triggers(&self, matcher: &GroupMatcher) -> Result<Vec<String>, SchedulerError> {
        self.ensure_running()?;
        let groups = self.store().resume_triggers(matcher)?;
        self.core.signal_scheduling_change(None);
        for group in &groups {
            self.core
                .notify_scheduler_listeners(|l| l.triggers_resumed(group));
        }
        Ok(groups)
    }

    pub fn resume_job(&self, key: &JobKey) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.store().resume_job(key)?;
        self.core.signal_scheduling_change(None);
        self.core.notify_scheduler_listeners(|l| l.job_resumed(key));
        Ok(())
    }

    pub fn resume_jobs(&self, matcher: &GroupMatcher) -> Result<Vec<String>, SchedulerError> {
        self.ensure_running()?;
        let groups = self.store().resume_jobs(matcher)?;
        self.core.signal_scheduling_change(None);
        for group in &groups {
            self.core.notify_scheduler_listeners(|l| l.jobs_resumed(group));
        }
        Ok(groups)
    }

    pub fn pause_all(&self) -> Result<(), SchedulerError> {
        self.pause_triggers(&GroupMatcher::any()).map(|_| ())
    }

    pub fn resume_all(&self) -> Result<(), SchedulerError> {
        self.resume_triggers(&GroupMatcher::any()).map(|_| ())
    }

    // -- calendars --

    pub fn add_calendar(
        &self,
        name: &str,
        calendar: Arc<dyn ExclusionCalendar>,
        replace_existing: bool,
        update_triggers: bool,
    ) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.store()
            .store_calendar(name, calendar, replace_existing, update_triggers)?;
        if update_triggers {
            self.core.signal_scheduling_change(None);
        }
        Ok(())
    }

    pub fn delete_calendar(&self, name: &str) -> Result<bool, SchedulerError> {
        self.ensure_running()?;
        Ok(self.store().remove_calendar(name)?)
    }

    pub fn get_calendar(
        &self,
        name: &str,
    ) -> Result<Option<Arc<dyn ExclusionCalendar>>, SchedulerError> {
        Ok(self.store().retrieve_calendar(name)?)
    }

    // -- queries --

    pub fn get_job_detail(&self, key: &JobKey) -> Result<Option<JobDetail>, SchedulerError> {
        Ok(self.store().retrieve_job(key)?)
    }

    pub fn get_trigger(&self, key: &TriggerKey) -> Result<Option<Trigger>, SchedulerError> {
        Ok(self.store().retrieve_trigger(key)?)
    }

    pub fn get_triggers_of_job(&self, key: &JobKey) -> Result<Vec<Trigger>, SchedulerError> {
        Ok(self.store().triggers_for_job(key)?)
    }

    pub fn job_keys(&self, matcher: &GroupMatcher) -> Result<Vec<JobKey>, SchedulerError> {
        Ok(self.store().job_keys(matcher)?)
    }

    pub fn trigger_keys(&self, matcher: &GroupMatcher) -> Result<Vec<TriggerKey>, SchedulerError> {
        Ok(self.store().trigger_keys(matcher)?)
    }

    pub fn trigger_state(&self, key: &TriggerKey) -> Result<TriggerState, SchedulerError> {
        Ok(self.store().trigger_state(key)?)
    }

    pub fn reset_trigger_from_error_state(&self, key: &TriggerKey) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.store().reset_trigger_from_error_state(key)?;
        self.core.signal_scheduling_change(None);
        Ok(())
    }

    /// Remove every job, trigger, and calendar
    pub fn clear(&self) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        self.store().clear()?;
        self.core.signal_scheduling_change(None);
        self.core
            .notify_scheduler_listeners(|l| l.scheduling_data_cleared());
        Ok(())
    }

    // -- running jobs --

    pub fn currently_executing_jobs(&self) -> Vec<ExecutingJob> {
        self.core.currently_executing()
    }

    /// Interrupt every running instance of a job
    pub fn interrupt(&self, key: &JobKey) -> bool {
        self.core.interrupt(key)
    }

    pub fn interrupt_instance(&self, id: &FireInstanceId) -> bool {
        self.core.interrupt_instance(id)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
