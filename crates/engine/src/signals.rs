// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler core: listener fan-out, store notifications, and signals
//!
//! [`SchedulerCore`] is shared by the acquisition loop, every job run shell,
//! and the job store (through [`SchedulerSignaler`]).

use crate::context::{InterruptToken, JobExecutionContext};
use crate::error::SchedulerError;
use crate::job::JobFactory;
use crate::listener::ListenerError;
use crate::registry::ListenerRegistry;
use crate::shell::{ExecutionBoundary, NoOpBoundary};
use crate::store::JobStore;
use chrono::{DateTime, Utc};
use kairos_core::{
    CompletedExecutionInstruction, FireInstanceId, JobDetail, JobExecutionError, JobKey, Trigger,
    TriggerKey,
};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Notify;

/// Callbacks a job store uses to reach back into the scheduler
pub trait SchedulerSignaler: Send + Sync {
    fn notify_trigger_listeners_misfired(&self, trigger: &Trigger);

    fn notify_scheduler_listeners_finalized(&self, trigger: &Trigger);

    fn notify_scheduler_listeners_job_deleted(&self, key: &JobKey);

    /// Wake the acquisition loop; `None` means the new time is unknown
    fn signal_scheduling_change(&self, candidate_new_next_fire_time: Option<DateTime<Utc>>);

    fn notify_scheduler_listeners_error(&self, message: &str, error: &SchedulerError);
}

/// A job currently running on a worker
#[derive(Debug, Clone)]
pub struct ExecutingJob {
    pub job_key: JobKey,
    pub trigger_key: TriggerKey,
    pub fire_instance_id: FireInstanceId,
    pub fire_time: DateTime<Utc>,
    interrupt: InterruptToken,
}

#[derive(Default)]
struct SchedulingSignal {
    notify: Notify,
    /// `Some(None)` records a change with no known candidate time
    pending: Mutex<Option<Option<DateTime<Utc>>>>,
}

/// State shared by every part of a running scheduler
pub struct SchedulerCore {
    instance_name: String,
    instance_id: String,
    store: Arc<dyn JobStore>,
    listeners: ListenerRegistry,
    job_factory: RwLock<Arc<dyn JobFactory>>,
    boundary: RwLock<Arc<dyn ExecutionBoundary>>,
    executing: Mutex<HashMap<FireInstanceId, ExecutingJob>>,
    signal: SchedulingSignal,
    standby: AtomicBool,
    shutting_down: AtomicBool,
    jobs_executed: AtomicU64,
}

impl SchedulerCore {
    pub fn new(
        instance_name: impl Into<String>,
        instance_id: impl Into<String>,
        store: Arc<dyn JobStore>,
        job_factory: Arc<dyn JobFactory>,
    ) -> Self {
        Self {
            instance_name: instance_name.into(),
            instance_id: instance_id.into(),
            store,
            listeners: ListenerRegistry::new(),
            job_factory: RwLock::new(job_factory),
            boundary: RwLock::new(Arc::new(NoOpBoundary)),
            executing: Mutex::new(HashMap::new()),
            signal: SchedulingSignal::default(),
            standby: AtomicBool::new(true),
            shutting_down: AtomicBool::new(false),
            jobs_executed: AtomicU64::new(0),
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn job_factory(&self) -> Arc<dyn JobFactory> {
        let factory = self.job_factory.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&factory)
    }

    pub fn set_job_factory(&self, factory: Arc<dyn JobFactory>) {
        let mut current = self.job_factory.write().unwrap_or_else(|e| e.into_inner());
        *current = factory;
    }

    pub fn boundary(&self) -> Arc<dyn ExecutionBoundary> {
        let boundary = self.boundary.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&boundary)
    }

    pub fn set_boundary(&self, boundary: Arc<dyn ExecutionBoundary>) {
        let mut current = self.boundary.write().unwrap_or_else(|e| e.into_inner());
        *current = boundary;
    }

    // -- lifecycle flags --

    pub fn is_in_standby(&self) -> bool {
        self.standby.load(Ordering::SeqCst)
    }

    pub(crate) fn set_standby(&self, standby: bool) {
        self.standby.store(standby, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub(crate) fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.signal_scheduling_change(None);
    }

    pub fn jobs_executed(&self) -> u64 {
        self.jobs_executed.load(Ordering::SeqCst)
    }

    // -- scheduling change signal --

    /// Take the pending scheduling change, if any
    pub fn take_scheduling_change(&self) -> Option<Option<DateTime<Utc>>> {
        let mut pending = self.signal.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.take()
    }

    /// Resolves once a scheduling change is signaled
    pub async fn scheduling_changed(&self) {
        self.signal.notify.notified().await;
    }

    // -- executing jobs --

    pub(crate) fn job_started(&self, context: &JobExecutionContext) {
        let entry = ExecutingJob {
            job_key: context.job_detail().key.clone(),
            trigger_key: context.trigger().key.clone(),
            fire_instance_id: context.fire_instance_id().clone(),
            fire_time: context.fire_time(),
            interrupt: context.interrupt_token().clone(),
        };
        let mut executing = self.executing.lock().unwrap_or_else(|e| e.into_inner());
        executing.insert(entry.fire_instance_id.clone(), entry);
    }

    pub(crate) fn job_finished(&self, id: &FireInstanceId) {
        let mut executing = self.executing.lock().unwrap_or_else(|e| e.into_inner());
        if executing.remove(id).is_some() {
            self.jobs_executed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn currently_executing(&self) -> Vec<ExecutingJob> {
        let executing = self.executing.lock().unwrap_or_else(|e| e.into_inner());
        let mut jobs: Vec<ExecutingJob> = executing.values().cloned().collect();
        jobs.sort_by(|a, b| a.fire_time.cmp(&b.fire_time));
        jobs
    }

    /// Interrupt every running instance of a job; returns whether any ran
    pub fn interrupt(&self, job_key: &JobKey) -> bool {
        let executing = self.executing.lock().unwrap_or_else(|e| e.into_inner());
        let mut found = false;
        for job in executing.values().filter(|j| &j.job_key == job_key) {
            job.interrupt.interrupt();
            found = true;
        }
        found
    }

    pub fn interrupt_instance(&self, id: &FireInstanceId) -> bool {
        let executing = self.executing.lock().unwrap_or_else(|e| e.into_inner());
        match executing.get(id) {
            Some(job) => {
                job.interrupt.interrupt();
                true
            }
            None => false,
        }
    }

    // -- listener fan-out --

    /// Run trigger listeners for a fire; returns whether any vetoed.
    ///
    /// A veto does not stop the fan-out, a failure does.
    pub fn notify_trigger_listeners_fired(
        &self,
        context: &JobExecutionContext,
    ) -> Result<bool, SchedulerError> {
        let trigger = context.trigger();
        let mut vetoed = false;
        for listener in self.listeners.triggers().matching(&trigger.key) {
            guarded(listener.name(), || listener.trigger_fired(trigger, context))?;
            if guarded(listener.name(), || listener.veto_job_execution(trigger, context))? {
                tracing::info!(listener = listener.name(), trigger = %trigger.key, "job execution vetoed");
                vetoed = true;
            }
        }
        Ok(vetoed)
    }

    pub fn notify_trigger_listeners_complete(
        &self,
        context: &JobExecutionContext,
        instruction: CompletedExecutionInstruction,
    ) -> Result<(), SchedulerError> {
        let trigger = context.trigger();
        for listener in self.listeners.triggers().matching(&trigger.key) {
            guarded(listener.name(), || {
                listener.trigger_complete(trigger, context, instruction)
            })?;
        }
        Ok(())
    }

    pub fn notify_job_listeners_to_be_executed(
        &self,
        context: &JobExecutionContext,
    ) -> Result<(), SchedulerError> {
        for listener in self.listeners.jobs().matching(&context.job_detail().key) {
            guarded(listener.name(), || listener.job_to_be_executed(context))?;
        }
        Ok(())
    }

    pub fn notify_job_listeners_vetoed(
        &self,
        context: &JobExecutionContext,
    ) -> Result<(), SchedulerError> {
        for listener in self.listeners.jobs().matching(&context.job_detail().key) {
            guarded(listener.name(), || listener.job_execution_vetoed(context))?;
        }
        Ok(())
    }

    pub fn notify_job_listeners_executed(
        &self,
        context: &JobExecutionContext,
        error: Option<&JobExecutionError>,
    ) -> Result<(), SchedulerError> {
        for listener in self.listeners.jobs().matching(&context.job_detail().key) {
            guarded(listener.name(), || listener.job_was_executed(context, error))?;
        }
        Ok(())
    }

    /// Call every scheduler listener, containing panics
    pub fn notify_scheduler_listeners(&self, f: impl Fn(&dyn crate::listener::SchedulerListener)) {
        for listener in self.listeners.scheduler_listeners().iter() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(listener.as_ref()))) {
                tracing::error!(
                    detail = panic_detail(payload.as_ref()),
                    "scheduler listener panicked"
                );
            }
        }
    }

    // -- store notifications --

    pub fn notify_job_store_job_complete(
        &self,
        trigger: &Trigger,
        job: &JobDetail,
        instruction: CompletedExecutionInstruction,
    ) {
        if let Err(e) = self.store.triggered_job_complete(trigger, job, instruction) {
            let error = SchedulerError::from(e);
            tracing::error!(trigger = %trigger.key, %instruction, error = %error, "store rejected completion");
            self.notify_scheduler_listeners_error(
                &format!("failed to report completion of trigger {}", trigger.key),
                &error,
            );
        }
    }

    pub fn notify_job_store_job_vetoed(
        &self,
        trigger: &Trigger,
        job: &JobDetail,
        instruction: CompletedExecutionInstruction,
    ) {
        self.notify_job_store_job_complete(trigger, job, instruction);
    }
}

impl SchedulerSignaler for SchedulerCore {
    fn notify_trigger_listeners_misfired(&self, trigger: &Trigger) {
        for listener in self.listeners.triggers().matching(&trigger.key) {
            if let Err(e) = guarded(listener.name(), || listener.trigger_misfired(trigger)) {
                self.notify_scheduler_listeners_error(
                    &format!("trigger listener failed on misfire of {}", trigger.key),
                    &e,
                );
            }
        }
    }

    fn notify_scheduler_listeners_finalized(&self, trigger: &Trigger) {
        tracing::debug!(trigger = %trigger.key, "trigger finalized");
        self.notify_scheduler_listeners(|l| l.trigger_finalized(trigger));
    }

    fn notify_scheduler_listeners_job_deleted(&self, key: &JobKey) {
        self.notify_scheduler_listeners(|l| l.job_deleted(key));
    }

    fn signal_scheduling_change(&self, candidate: Option<DateTime<Utc>>) {
        {
            let mut pending = self.signal.pending.lock().unwrap_or_else(|e| e.into_inner());
            *pending = Some(match (*pending, candidate) {
                (Some(Some(existing)), Some(new)) => Some(existing.min(new)),
                (Some(_), _) => None,
                (None, new) => new,
            });
        }
        self.signal.notify.notify_one();
    }

    fn notify_scheduler_listeners_error(&self, message: &str, error: &SchedulerError) {
        tracing::error!(error = %error, "{}", message);
        self.notify_scheduler_listeners(|l| l.scheduler_error(message, error));
    }
}

/// Run one listener callback, turning failures and panics into scheduler errors
fn guarded<T>(
    listener: &str,
    f: impl FnOnce() -> Result<T, ListenerError>,
) -> Result<T, SchedulerError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SchedulerError::Listener {
            listener: listener.to_string(),
            message: e.0,
        }),
        Err(payload) => Err(SchedulerError::Listener {
            listener: listener.to_string(),
            message: format!("panicked: {}", panic_detail(payload.as_ref())),
        }),
    }
}

pub(crate) fn panic_detail(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
