// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store that keeps everything in memory

use crate::state::{Notice, StoreState};
use chrono::{DateTime, Duration, Utc};
use kairos_core::{
    Clock, CompletedExecutionInstruction, ExclusionCalendar, GroupMatcher, JobDetail, JobKey,
    SequentialIdGen, SystemClock, Trigger, TriggerKey, TriggerState,
};
use kairos_engine::{JobStore, SchedulerSignaler, StoreError, TriggerFiredResult};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};

/// In-memory [`JobStore`].
///
/// All state sits behind one mutex. Listener notifications produced while
/// the lock is held are delivered after it is released, so a signaler may
/// call back into the store.
pub struct RamJobStore<C: Clock = SystemClock> {
    state: Mutex<StoreState>,
    signaler: RwLock<Option<Arc<dyn SchedulerSignaler>>>,
    clock: C,
    ids: SequentialIdGen,
}

impl RamJobStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RamJobStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RamJobStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            signaler: RwLock::new(None),
            clock,
            ids: SequentialIdGen::default(),
        }
    }

    /// Prefix fire-instance ids with the scheduler's instance id
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.ids = SequentialIdGen::new(instance_id);
        self
    }

    /// Triggers currently waiting in the time queue
    pub fn queued_triggers(&self) -> usize {
        self.lock().queued_len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn signaler(&self) -> Option<Arc<dyn SchedulerSignaler>> {
        self.signaler
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Run `f` under the lock, then deliver whatever it reported
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreState, &mut Vec<Notice>) -> T) -> T {
        let mut notices = Vec::new();
        let result = {
            let mut state = self.lock();
            f(&mut state, &mut notices)
        };
        self.dispatch(notices);
        result
    }

    fn dispatch(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let Some(signaler) = self.signaler() else {
            return;
        };
        for notice in notices {
            match notice {
                Notice::Misfired(trigger) => signaler.notify_trigger_listeners_misfired(&trigger),
                Notice::Finalized(trigger) => {
                    signaler.notify_scheduler_listeners_finalized(&trigger)
                }
                Notice::JobDeleted(key) => signaler.notify_scheduler_listeners_job_deleted(&key),
                Notice::SchedulingChange => signaler.signal_scheduling_change(None),
            }
        }
    }
}

impl<C: Clock> JobStore for RamJobStore<C> {
    fn name(&self) -> &'static str {
        "RamJobStore"
    }

    fn initialize(
        &self,
        signaler: Arc<dyn SchedulerSignaler>,
        misfire_threshold: Duration,
    ) -> Result<(), StoreError> {
        *self.signaler.write().unwrap_or_else(|e| e.into_inner()) = Some(signaler);
        self.lock().misfire_threshold = misfire_threshold;
        tracing::debug!(
            misfire_threshold_ms = misfire_threshold.num_milliseconds(),
            "ram job store initialized"
        );
        Ok(())
    }

    fn store_job(&self, job: JobDetail, replace_existing: bool) -> Result<(), StoreError> {
        self.lock().store_job(job, replace_existing)
    }

    fn store_trigger(&self, trigger: Trigger, replace_existing: bool) -> Result<(), StoreError> {
        self.lock().store_trigger(trigger, replace_existing)
    }

    fn store_job_and_trigger(&self, job: JobDetail, trigger: Trigger) -> Result<(), StoreError> {
        self.lock().store_job_and_trigger(job, trigger)
    }

    fn remove_job(&self, key: &JobKey) -> Result<bool, StoreError> {
        Ok(self.lock().remove_job(key))
    }

    fn remove_trigger(&self, key: &TriggerKey) -> Result<bool, StoreError> {
        Ok(self.mutate(|state, notices| state.remove_trigger(key, notices)))
    }

    fn replace_trigger(&self, key: &TriggerKey, trigger: Trigger) -> Result<bool, StoreError> {
        self.lock().replace_trigger(key, trigger)
    }

    fn retrieve_job(&self, key: &JobKey) -> Result<Option<JobDetail>, StoreError> {
        Ok(self.lock().jobs.get(key).cloned())
    }

    fn retrieve_trigger(&self, key: &TriggerKey) -> Result<Option<Trigger>, StoreError> {
        Ok(self.lock().triggers.get(key).map(|e| e.trigger.clone()))
    }

    fn triggers_for_job(&self, key: &JobKey) -> Result<Vec<Trigger>, StoreError> {
        Ok(self.lock().triggers_for_job(key))
    }

    fn job_keys(&self, matcher: &GroupMatcher) -> Result<Vec<JobKey>, StoreError> {
        Ok(self.lock().job_keys(matcher))
    }

    fn trigger_keys(&self, matcher: &GroupMatcher) -> Result<Vec<TriggerKey>, StoreError> {
        Ok(self.lock().trigger_keys(matcher))
    }

    fn number_of_jobs(&self) -> Result<usize, StoreError> {
        Ok(self.lock().jobs.len())
    }

    fn number_of_triggers(&self) -> Result<usize, StoreError> {
        Ok(self.lock().triggers.len())
    }

    fn number_of_calendars(&self) -> Result<usize, StoreError> {
        Ok(self.lock().calendars.len())
    }

    fn store_calendar(
        &self,
        name: &str,
        calendar: Arc<dyn ExclusionCalendar>,
        replace_existing: bool,
        update_triggers: bool,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.lock()
            .store_calendar(name, calendar, replace_existing, update_triggers, now)
    }

    fn remove_calendar(&self, name: &str) -> Result<bool, StoreError> {
        self.lock().remove_calendar(name)
    }

    fn retrieve_calendar(
        &self,
        name: &str,
    ) -> Result<Option<Arc<dyn ExclusionCalendar>>, StoreError> {
        Ok(self.lock().calendars.get(name).cloned())
    }

    fn trigger_state(&self, key: &TriggerKey) -> Result<TriggerState, StoreError> {
        Ok(self.lock().trigger_state(key))
    }

    fn reset_trigger_from_error_state(&self, key: &TriggerKey) -> Result<(), StoreError> {
        self.lock().reset_trigger_from_error_state(key);
        Ok(())
    }

    fn pause_trigger(&self, key: &TriggerKey) -> Result<(), StoreError> {
        self.lock().pause_trigger(key);
        Ok(())
    }

    fn pause_triggers(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().pause_triggers(matcher))
    }

    fn pause_job(&self, key: &JobKey) -> Result<(), StoreError> {
        self.lock().pause_job(key);
        Ok(())
    }

    fn pause_jobs(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().pause_jobs(matcher))
    }

    fn resume_trigger(&self, key: &TriggerKey) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.mutate(|state, notices| state.resume_trigger(key, now, notices));
        Ok(())
    }

    fn resume_triggers(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        Ok(self.mutate(|state, notices| state.resume_triggers(matcher, now, notices)))
    }

    fn resume_job(&self, key: &JobKey) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.mutate(|state, notices| state.resume_job(key, now, notices));
        Ok(())
    }

    fn resume_jobs(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now();
        Ok(self.mutate(|state, notices| state.resume_jobs(matcher, now, notices)))
    }

    fn paused_trigger_groups(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.lock().paused_trigger_groups.clone())
    }

    fn acquire_next_triggers(
        &self,
        no_later_than: DateTime<Utc>,
        max_count: usize,
        time_window: Duration,
    ) -> Result<Vec<Trigger>, StoreError> {
        let now = self.clock.now();
        let acquired = self.mutate(|state, notices| {
            state.acquire_next_triggers(
                no_later_than,
                max_count,
                time_window,
                now,
                &self.ids,
                notices,
            )
        });
        tracing::trace!(count = acquired.len(), %no_later_than, "acquired triggers");
        Ok(acquired)
    }

    fn release_acquired_trigger(&self, trigger: &Trigger) -> Result<(), StoreError> {
        self.lock().release_acquired_trigger(&trigger.key);
        Ok(())
    }

    fn triggers_fired(&self, triggers: &[Trigger]) -> Result<Vec<TriggerFiredResult>, StoreError> {
        let now = self.clock.now();
        Ok(self.lock().triggers_fired(triggers, now, &self.ids))
    }

    fn triggered_job_complete(
        &self,
        trigger: &Trigger,
        job: &JobDetail,
        instruction: CompletedExecutionInstruction,
    ) -> Result<(), StoreError> {
        self.mutate(|state, notices| {
            state.triggered_job_complete(trigger, job, instruction, notices)
        });
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "ram_tests.rs"]
mod tests;
