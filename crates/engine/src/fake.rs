// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for testing the engine and code built on it
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::context::JobExecutionContext;
use crate::error::SchedulerError;
use crate::job::{Job, JobType};
use crate::listener::{JobListener, ListenerError, SchedulerListener, TriggerListener};
use crate::signals::SchedulerSignaler;
use crate::store::{FiredTriggerBundle, JobStore, StoreError, TriggerFiredResult};
use chrono::{DateTime, Duration, Utc};
use kairos_core::{
    CompletedExecutionInstruction, ExclusionCalendar, FireInstanceId, GroupMatcher, JobDetail,
    JobExecutionError, JobKey, Trigger, TriggerKey, TriggerState,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Ordered record of events shared between fakes
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Events starting with `prefix`
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }
}

/// Job that runs a closure
pub struct FnJob<F> {
    f: F,
}

impl<F> FnJob<F>
where
    F: Fn(&mut JobExecutionContext) -> Result<(), JobExecutionError> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Job for FnJob<F>
where
    F: Fn(&mut JobExecutionContext) -> Result<(), JobExecutionError> + Send,
{
    fn execute(&self, context: &mut JobExecutionContext) -> Result<(), JobExecutionError> {
        (self.f)(context)
    }
}

/// Job type whose instances all run `f`
pub fn fn_job_type<F>(name: &str, f: F) -> JobType
where
    F: Fn(&mut JobExecutionContext) -> Result<(), JobExecutionError>
        + Send
        + Sync
        + Clone
        + 'static,
{
    JobType::new(name, move || FnJob::new(f.clone()))
}

/// Which listener hook a fake should fail or panic in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    ToBeExecuted,
    Vetoed,
    WasExecuted,
    Fired,
    Veto,
    Misfired,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Fail(Hook),
    Panic(Hook),
}

fn inject(fault: Option<Fault>, hook: Hook) -> Result<(), ListenerError> {
    match fault {
        Some(Fault::Fail(h)) if h == hook => Err(ListenerError::new(format!("{hook:?} failed"))),
        #[allow(clippy::panic)]
        Some(Fault::Panic(h)) if h == hook => panic!("{hook:?} panicked"),
        _ => Ok(()),
    }
}

/// Job listener that records each callback as `<name>:<hook>:<job>`
#[derive(Debug, Clone)]
pub struct RecordingJobListener {
    name: String,
    log: EventLog,
    fault: Option<Fault>,
}

impl RecordingJobListener {
    pub fn new(name: impl Into<String>, log: EventLog) -> Self {
        Self {
            name: name.into(),
            log,
            fault: None,
        }
    }

    pub fn failing_on(mut self, hook: Hook) -> Self {
        self.fault = Some(Fault::Fail(hook));
        self
    }

    pub fn panicking_on(mut self, hook: Hook) -> Self {
        self.fault = Some(Fault::Panic(hook));
        self
    }
}

impl JobListener for RecordingJobListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn job_to_be_executed(&self, context: &JobExecutionContext) -> Result<(), ListenerError> {
        self.log
            .push(format!("{}:to_be_executed:{}", self.name, context.job_detail().key));
        inject(self.fault, Hook::ToBeExecuted)
    }

    fn job_execution_vetoed(&self, context: &JobExecutionContext) -> Result<(), ListenerError> {
        self.log
            .push(format!("{}:vetoed:{}", self.name, context.job_detail().key));
        inject(self.fault, Hook::Vetoed)
    }

    fn job_was_executed(
        &self,
        context: &JobExecutionContext,
        error: Option<&JobExecutionError>,
    ) -> Result<(), ListenerError> {
        let outcome = if error.is_some() { "failed" } else { "ok" };
        self.log.push(format!(
            "{}:was_executed:{}:{}",
            self.name,
            context.job_detail().key,
            outcome
        ));
        inject(self.fault, Hook::WasExecuted)
    }
}

/// Trigger listener that records each callback as `<name>:<hook>:<trigger>`
#[derive(Debug, Clone)]
pub struct RecordingTriggerListener {
    name: String,
    log: EventLog,
    veto: bool,
    fault: Option<Fault>,
}

impl RecordingTriggerListener {
    pub fn new(name: impl Into<String>, log: EventLog) -> Self {
        Self {
            name: name.into(),
            log,
            veto: false,
            fault: None,
        }
    }

    pub fn vetoing(mut self) -> Self {
        self.veto = true;
        self
    }

    pub fn failing_on(mut self, hook: Hook) -> Self {
        self.fault = Some(Fault::Fail(hook));
        self
    }

    pub fn panicking_on(mut self, hook: Hook) -> Self {
        self.fault = Some(Fault::Panic(hook));
        self
    }
}

impl TriggerListener for RecordingTriggerListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn trigger_fired(
        &self,
        trigger: &Trigger,
        _context: &JobExecutionContext,
    ) -> Result<(), ListenerError> {
        self.log
            .push(format!("{}:fired:{}", self.name, trigger.key));
        inject(self.fault, Hook::Fired)
    }

    fn veto_job_execution(
        &self,
        trigger: &Trigger,
        _context: &JobExecutionContext,
    ) -> Result<bool, ListenerError> {
        self.log.push(format!("{}:veto:{}", self.name, trigger.key));
        inject(self.fault, Hook::Veto)?;
        Ok(self.veto)
    }

    fn trigger_misfired(&self, trigger: &Trigger) -> Result<(), ListenerError> {
        self.log
            .push(format!("{}:misfired:{}", self.name, trigger.key));
        inject(self.fault, Hook::Misfired)
    }

    fn trigger_complete(
        &self,
        trigger: &Trigger,
        _context: &JobExecutionContext,
        instruction: CompletedExecutionInstruction,
    ) -> Result<(), ListenerError> {
        self.log.push(format!(
            "{}:complete:{}:{}",
            self.name, trigger.key, instruction
        ));
        inject(self.fault, Hook::Complete)
    }
}

/// Scheduler listener that records callbacks as `scheduler:<event>[:<subject>]`
#[derive(Debug, Clone)]
pub struct RecordingSchedulerListener {
    log: EventLog,
}

impl RecordingSchedulerListener {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl SchedulerListener for RecordingSchedulerListener {
    fn job_scheduled(&self, trigger: &Trigger) {
        self.log.push(format!("scheduler:job_scheduled:{}", trigger.key));
    }

    fn job_unscheduled(&self, key: &TriggerKey) {
        self.log.push(format!("scheduler:job_unscheduled:{key}"));
    }

    fn trigger_finalized(&self, trigger: &Trigger) {
        self.log.push(format!("scheduler:finalized:{}", trigger.key));
    }

    fn trigger_paused(&self, key: &TriggerKey) {
        self.log.push(format!("scheduler:trigger_paused:{key}"));
    }

    fn triggers_paused(&self, group: &str) {
        self.log.push(format!("scheduler:triggers_paused:{group}"));
    }

    fn trigger_resumed(&self, key: &TriggerKey) {
        self.log.push(format!("scheduler:trigger_resumed:{key}"));
    }

    fn triggers_resumed(&self, group: &str) {
        self.log.push(format!("scheduler:triggers_resumed:{group}"));
    }

    fn job_added(&self, job: &JobDetail) {
        self.log.push(format!("scheduler:job_added:{}", job.key));
    }

    fn job_deleted(&self, key: &JobKey) {
        self.log.push(format!("scheduler:job_deleted:{key}"));
    }

    fn job_paused(&self, key: &JobKey) {
        self.log.push(format!("scheduler:job_paused:{key}"));
    }

    fn jobs_paused(&self, group: &str) {
        self.log.push(format!("scheduler:jobs_paused:{group}"));
    }

    fn job_resumed(&self, key: &JobKey) {
        self.log.push(format!("scheduler:job_resumed:{key}"));
    }

    fn jobs_resumed(&self, group: &str) {
        self.log.push(format!("scheduler:jobs_resumed:{group}"));
    }

    fn scheduler_error(&self, message: &str, _error: &SchedulerError) {
        self.log.push(format!("scheduler:error:{message}"));
    }

    fn scheduler_in_standby_mode(&self) {
        self.log.push("scheduler:standby");
    }

    fn scheduler_started(&self) {
        self.log.push("scheduler:started");
    }

    fn scheduler_shutting_down(&self) {
        self.log.push("scheduler:shutting_down");
    }

    fn scheduler_shutdown(&self) {
        self.log.push("scheduler:shutdown");
    }

    fn scheduling_data_cleared(&self) {
        self.log.push("scheduler:cleared");
    }
}

/// Signaler that records what a store reports
#[derive(Debug, Clone, Default)]
pub struct RecordingSignaler {
    log: EventLog,
}

impl RecordingSignaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.log.events()
    }
}

impl SchedulerSignaler for RecordingSignaler {
    fn notify_trigger_listeners_misfired(&self, trigger: &Trigger) {
        self.log.push(format!("misfired:{}", trigger.key));
    }

    fn notify_scheduler_listeners_finalized(&self, trigger: &Trigger) {
        self.log.push(format!("finalized:{}", trigger.key));
    }

    fn notify_scheduler_listeners_job_deleted(&self, key: &JobKey) {
        self.log.push(format!("job_deleted:{key}"));
    }

    fn signal_scheduling_change(&self, candidate: Option<DateTime<Utc>>) {
        match candidate {
            Some(at) => self.log.push(format!("scheduling_change:{}", at.to_rfc3339())),
            None => self.log.push("scheduling_change"),
        }
    }

    fn notify_scheduler_listeners_error(&self, message: &str, _error: &SchedulerError) {
        self.log.push(format!("error:{message}"));
    }
}

/// Store call recorded by [`FakeJobStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    StoreJob(JobKey),
    StoreTrigger(TriggerKey),
    RemoveJob(JobKey),
    RemoveTrigger(TriggerKey),
    Acquire { max_count: usize },
    Release(TriggerKey),
    Fired(Vec<TriggerKey>),
    Completed {
        trigger: TriggerKey,
        instruction: CompletedExecutionInstruction,
    },
}

#[derive(Default)]
struct FakeStoreState {
    jobs: BTreeMap<JobKey, JobDetail>,
    triggers: BTreeMap<TriggerKey, Trigger>,
    calendars: BTreeMap<String, Arc<dyn ExclusionCalendar>>,
    due: VecDeque<FiredTriggerBundle>,
    acquired: BTreeMap<TriggerKey, FiredTriggerBundle>,
    calls: Vec<StoreCall>,
    fail_acquire: bool,
}

/// Job store that keeps maps, records calls, and fires queued bundles
#[derive(Clone, Default)]
pub struct FakeJobStore {
    state: Arc<Mutex<FakeStoreState>>,
}

impl FakeJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeStoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Instructions reported through `triggered_job_complete`, in order
    pub fn completions(&self) -> Vec<(TriggerKey, CompletedExecutionInstruction)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                StoreCall::Completed {
                    trigger,
                    instruction,
                } => Some((trigger.clone(), *instruction)),
                _ => None,
            })
            .collect()
    }

    /// Queue a bundle to be handed out by acquire and fire
    pub fn push_due(&self, bundle: FiredTriggerBundle) {
        self.lock().due.push_back(bundle);
    }

    pub fn fail_acquire(&self, fail: bool) {
        self.lock().fail_acquire = fail;
    }
}

/// Bundle for a trigger that has just fired at `fire_time`
pub fn bundle(job: JobDetail, mut trigger: Trigger, fire_time: DateTime<Utc>) -> FiredTriggerBundle {
    if trigger.next_fire_time.is_none() && trigger.previous_fire_time.is_none() {
        trigger.compute_first_fire_time(None);
    }
    let scheduled = trigger.next_fire_time;
    let previous = trigger.previous_fire_time;
    trigger.triggered(None);
    FiredTriggerBundle {
        job_detail: job,
        previous_fire_time: previous,
        next_fire_time: trigger.next_fire_time,
        trigger,
        calendar: None,
        job_is_recovering: false,
        fire_time,
        scheduled_fire_time: scheduled,
        fire_instance_id: FireInstanceId(format!("FAKE{}", fire_time.timestamp_millis())),
    }
}

impl JobStore for FakeJobStore {
    fn name(&self) -> &'static str {
        "FakeJobStore"
    }

    fn initialize(
        &self,
        _signaler: Arc<dyn SchedulerSignaler>,
        _misfire_threshold: Duration,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn store_job(&self, job: JobDetail, replace_existing: bool) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !replace_existing && state.jobs.contains_key(&job.key) {
            return Err(StoreError::JobExists(job.key));
        }
        state.calls.push(StoreCall::StoreJob(job.key.clone()));
        state.jobs.insert(job.key.clone(), job);
        Ok(())
    }

    fn store_trigger(&self, trigger: Trigger, replace_existing: bool) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !replace_existing && state.triggers.contains_key(&trigger.key) {
            return Err(StoreError::TriggerExists(trigger.key));
        }
        if !state.jobs.contains_key(&trigger.job_key) {
            return Err(StoreError::JobNotFound(trigger.job_key));
        }
        state.calls.push(StoreCall::StoreTrigger(trigger.key.clone()));
        state.triggers.insert(trigger.key.clone(), trigger);
        Ok(())
    }

    fn store_job_and_trigger(&self, job: JobDetail, trigger: Trigger) -> Result<(), StoreError> {
        self.store_job(job, false)?;
        self.store_trigger(trigger, false)
    }

    fn remove_job(&self, key: &JobKey) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::RemoveJob(key.clone()));
        state.triggers.retain(|_, t| &t.job_key != key);
        Ok(state.jobs.remove(key).is_some())
    }

    fn remove_trigger(&self, key: &TriggerKey) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::RemoveTrigger(key.clone()));
        Ok(state.triggers.remove(key).is_some())
    }

    fn replace_trigger(&self, key: &TriggerKey, trigger: Trigger) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if state.triggers.remove(key).is_none() {
            return Ok(false);
        }
        state.calls.push(StoreCall::StoreTrigger(trigger.key.clone()));
        state.triggers.insert(trigger.key.clone(), trigger);
        Ok(true)
    }

    fn retrieve_job(&self, key: &JobKey) -> Result<Option<JobDetail>, StoreError> {
        Ok(self.lock().jobs.get(key).cloned())
    }

    fn retrieve_trigger(&self, key: &TriggerKey) -> Result<Option<Trigger>, StoreError> {
        Ok(self.lock().triggers.get(key).cloned())
    }

    fn triggers_for_job(&self, key: &JobKey) -> Result<Vec<Trigger>, StoreError> {
        Ok(self
            .lock()
            .triggers
            .values()
            .filter(|t| &t.job_key == key)
            .cloned()
            .collect())
    }

    fn job_keys(&self, matcher: &GroupMatcher) -> Result<Vec<JobKey>, StoreError> {
        Ok(self
            .lock()
            .jobs
            .keys()
            .filter(|k| matcher.is_match(k.group()))
            .cloned()
            .collect())
    }

    fn trigger_keys(&self, matcher: &GroupMatcher) -> Result<Vec<TriggerKey>, StoreError> {
        Ok(self
            .lock()
            .triggers
            .keys()
            .filter(|k| matcher.is_match(k.group()))
            .cloned()
            .collect())
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
        _update_triggers: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !replace_existing && state.calendars.contains_key(name) {
            return Err(StoreError::CalendarExists(name.to_string()));
        }
        state.calendars.insert(name.to_string(), calendar);
        Ok(())
    }

    fn remove_calendar(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.lock().calendars.remove(name).is_some())
    }

    fn retrieve_calendar(
        &self,
        name: &str,
    ) -> Result<Option<Arc<dyn ExclusionCalendar>>, StoreError> {
        Ok(self.lock().calendars.get(name).cloned())
    }

    fn trigger_state(&self, key: &TriggerKey) -> Result<TriggerState, StoreError> {
        Ok(if self.lock().triggers.contains_key(key) {
            TriggerState::Normal
        } else {
            TriggerState::None
        })
    }

    fn reset_trigger_from_error_state(&self, _key: &TriggerKey) -> Result<(), StoreError> {
        Ok(())
    }

    fn pause_trigger(&self, _key: &TriggerKey) -> Result<(), StoreError> {
        Ok(())
    }

    fn pause_triggers(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError> {
        Ok(matcher.exact_group().map(str::to_string).into_iter().collect())
    }

    fn pause_job(&self, _key: &JobKey) -> Result<(), StoreError> {
        Ok(())
    }

    fn pause_jobs(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError> {
        Ok(matcher.exact_group().map(str::to_string).into_iter().collect())
    }

    fn resume_trigger(&self, _key: &TriggerKey) -> Result<(), StoreError> {
        Ok(())
    }

    fn resume_triggers(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError> {
        Ok(matcher.exact_group().map(str::to_string).into_iter().collect())
    }

    fn resume_job(&self, _key: &JobKey) -> Result<(), StoreError> {
        Ok(())
    }

    fn resume_jobs(&self, matcher: &GroupMatcher) -> Result<Vec<String>, StoreError> {
        Ok(matcher.exact_group().map(str::to_string).into_iter().collect())
    }

    fn paused_trigger_groups(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(BTreeSet::new())
    }

    fn acquire_next_triggers(
        &self,
        _no_later_than: DateTime<Utc>,
        max_count: usize,
        _time_window: Duration,
    ) -> Result<Vec<Trigger>, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Acquire { max_count });
        if state.fail_acquire {
            return Err(StoreError::NotInitialized);
        }
        let mut acquired = Vec::new();
        while acquired.len() < max_count {
            let Some(bundle) = state.due.pop_front() else {
                break;
            };
            let mut trigger = bundle.trigger.clone();
            trigger.next_fire_time = bundle.scheduled_fire_time;
            acquired.push(trigger);
            state.acquired.insert(bundle.trigger.key.clone(), bundle);
        }
        Ok(acquired)
    }

    fn release_acquired_trigger(&self, trigger: &Trigger) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Release(trigger.key.clone()));
        if let Some(bundle) = state.acquired.remove(&trigger.key) {
            state.due.push_front(bundle);
        }
        Ok(())
    }

    fn triggers_fired(&self, triggers: &[Trigger]) -> Result<Vec<TriggerFiredResult>, StoreError> {
        let mut state = self.lock();
        state
            .calls
            .push(StoreCall::Fired(triggers.iter().map(|t| t.key.clone()).collect()));
        Ok(triggers
            .iter()
            .map(|t| match state.acquired.remove(&t.key) {
                Some(bundle) => TriggerFiredResult::Fired(Box::new(bundle)),
                None => TriggerFiredResult::Unavailable(t.key.clone()),
            })
            .collect())
    }

    fn triggered_job_complete(
        &self,
        trigger: &Trigger,
        _job: &JobDetail,
        instruction: CompletedExecutionInstruction,
    ) -> Result<(), StoreError> {
        self.lock().calls.push(StoreCall::Completed {
            trigger: trigger.key.clone(),
            instruction,
        });
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.jobs.clear();
        state.triggers.clear();
        state.calendars.clear();
        Ok(())
    }
}
