// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory scheduling state
//!
//! Jobs, triggers, and calendars keyed by name, plus the time-ordered queue
//! of triggers waiting to fire. Every mutation that the scheduler must hear
//! about is pushed as a [`Notice`] and delivered once the store lock is
//! released.

use chrono::{DateTime, Duration, Utc};
use kairos_core::{
    CompletedExecutionInstruction, ExclusionCalendar, FireInstanceId, GroupMatcher, IdGen,
    JobDetail, JobKey, MisfireInstruction, Trigger, TriggerKey, TriggerState,
};
use kairos_engine::{FiredTriggerBundle, StoreError, TriggerFiredResult};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Store-internal trigger state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Waiting,
    Acquired,
    Complete,
    Paused,
    Blocked,
    PausedBlocked,
    Error,
}

impl Slot {
    fn public(self) -> TriggerState {
        match self {
            Slot::Waiting | Slot::Acquired => TriggerState::Normal,
            Slot::Complete => TriggerState::Complete,
            Slot::Paused | Slot::PausedBlocked => TriggerState::Paused,
            Slot::Blocked => TriggerState::Blocked,
            Slot::Error => TriggerState::Error,
        }
    }
}

/// Something the scheduler must be told after the lock is released
#[derive(Debug, Clone)]
pub(crate) enum Notice {
    Misfired(Trigger),
    Finalized(Trigger),
    JobDeleted(JobKey),
    SchedulingChange,
}

/// Queue order: earliest fire time, then highest priority, then key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct TimeKey {
    fire_at: DateTime<Utc>,
    priority: Reverse<i32>,
    key: TriggerKey,
}

#[derive(Debug, Clone)]
pub(crate) struct TriggerEntry {
    pub trigger: Trigger,
    pub slot: Slot,
    fire_instance_id: Option<FireInstanceId>,
}

pub(crate) struct StoreState {
    pub jobs: BTreeMap<JobKey, JobDetail>,
    pub triggers: BTreeMap<TriggerKey, TriggerEntry>,
    pub calendars: BTreeMap<String, Arc<dyn ExclusionCalendar>>,
    pub paused_trigger_groups: BTreeSet<String>,
    pub paused_job_groups: BTreeSet<String>,
    pub blocked_jobs: BTreeSet<JobKey>,
    pub misfire_threshold: Duration,
    time_order: BTreeSet<TimeKey>,
    queued: HashMap<TriggerKey, TimeKey>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            jobs: BTreeMap::new(),
            triggers: BTreeMap::new(),
            calendars: BTreeMap::new(),
            paused_trigger_groups: BTreeSet::new(),
            paused_job_groups: BTreeSet::new(),
            blocked_jobs: BTreeSet::new(),
            misfire_threshold: Duration::seconds(60),
            time_order: BTreeSet::new(),
            queued: HashMap::new(),
        }
    }
}

impl StoreState {
    // -- time queue --

    /// Place a trigger in the time queue if it is waiting and has a next fire time
    fn queue(&mut self, key: &TriggerKey) {
        self.dequeue(key);
        let Some(entry) = self.triggers.get(key) else {
            return;
        };
        if entry.slot != Slot::Waiting {
            return;
        }
        if let Some(fire_at) = entry.trigger.next_fire_time {
            let time_key = TimeKey {
                fire_at,
                priority: Reverse(entry.trigger.priority),
                key: key.clone(),
            };
            self.time_order.insert(time_key.clone());
            self.queued.insert(key.clone(), time_key);
        }
    }

    fn dequeue(&mut self, key: &TriggerKey) {
        if let Some(time_key) = self.queued.remove(key) {
            self.time_order.remove(&time_key);
        }
    }

    pub fn queued_len(&self) -> usize {
        self.time_order.len()
    }

    fn set_slot(&mut self, key: &TriggerKey, slot: Slot) {
        if let Some(entry) = self.triggers.get_mut(key) {
            entry.slot = slot;
        }
        self.queue(key);
    }

    fn calendar_for(&self, trigger: &Trigger) -> Option<Arc<dyn ExclusionCalendar>> {
        trigger
            .calendar_name
            .as_ref()
            .and_then(|name| self.calendars.get(name).cloned())
    }

    fn triggers_of_job(&self, job: &JobKey) -> Vec<TriggerKey> {
        self.triggers
            .values()
            .filter(|e| &e.trigger.job_key == job)
            .map(|e| e.trigger.key.clone())
            .collect()
    }

    fn triggers_in_group(&self, group: &str) -> Vec<TriggerKey> {
        self.triggers
            .keys()
            .filter(|k| k.group() == group)
            .cloned()
            .collect()
    }

    fn initial_slot(&self, trigger: &Trigger) -> Slot {
        let paused = self.paused_trigger_groups.contains(trigger.key.group())
            || self.paused_job_groups.contains(trigger.job_key.group());
        let blocked = self.blocked_jobs.contains(&trigger.job_key);
        match (paused, blocked) {
            (true, true) => Slot::PausedBlocked,
            (true, false) => Slot::Paused,
            (false, true) => Slot::Blocked,
            (false, false) => Slot::Waiting,
        }
    }

    // -- jobs and triggers --

    pub fn store_job(&mut self, job: JobDetail, replace_existing: bool) -> Result<(), StoreError> {
        if !replace_existing && self.jobs.contains_key(&job.key) {
            return Err(StoreError::JobExists(job.key));
        }
        self.jobs.insert(job.key.clone(), job);
        Ok(())
    }

    pub fn store_trigger(
        &mut self,
        trigger: Trigger,
        replace_existing: bool,
    ) -> Result<(), StoreError> {
        if !replace_existing && self.triggers.contains_key(&trigger.key) {
            return Err(StoreError::TriggerExists(trigger.key));
        }
        if !self.jobs.contains_key(&trigger.job_key) {
            return Err(StoreError::JobNotFound(trigger.job_key));
        }
        let key = trigger.key.clone();
        self.dequeue(&key);
        let slot = self.initial_slot(&trigger);
        self.triggers.insert(
            key.clone(),
            TriggerEntry {
                trigger,
                slot,
                fire_instance_id: None,
            },
        );
        self.queue(&key);
        Ok(())
    }

    pub fn store_job_and_trigger(
        &mut self,
        job: JobDetail,
        trigger: Trigger,
    ) -> Result<(), StoreError> {
        if self.jobs.contains_key(&job.key) {
            return Err(StoreError::JobExists(job.key));
        }
        if self.triggers.contains_key(&trigger.key) {
            return Err(StoreError::TriggerExists(trigger.key));
        }
        self.store_job(job, false)?;
        self.store_trigger(trigger, false)
    }

    /// Remove a trigger; an orphaned non-durable job goes with it
    pub fn remove_trigger(&mut self, key: &TriggerKey, notices: &mut Vec<Notice>) -> bool {
        self.dequeue(key);
        let Some(entry) = self.triggers.remove(key) else {
            return false;
        };
        let job_key = entry.trigger.job_key;
        let orphaned = self
            .jobs
            .get(&job_key)
            .is_some_and(|job| !job.durable && self.triggers_of_job(&job_key).is_empty());
        if orphaned {
            self.jobs.remove(&job_key);
            self.blocked_jobs.remove(&job_key);
            notices.push(Notice::JobDeleted(job_key));
        }
        true
    }

    pub fn remove_job(&mut self, key: &JobKey) -> bool {
        let mut found = false;
        for trigger in self.triggers_of_job(key) {
            self.dequeue(&trigger);
            self.triggers.remove(&trigger);
            found = true;
        }
        self.blocked_jobs.remove(key);
        self.jobs.remove(key).is_some() || found
    }

    pub fn replace_trigger(
        &mut self,
        key: &TriggerKey,
        trigger: Trigger,
    ) -> Result<bool, StoreError> {
        let Some(old) = self.triggers.get(key) else {
            return Ok(false);
        };
        if old.trigger.job_key != trigger.job_key {
            return Err(StoreError::TriggerJobChanged(key.clone()));
        }
        if &trigger.key != key && self.triggers.contains_key(&trigger.key) {
            return Err(StoreError::TriggerExists(trigger.key));
        }
        self.dequeue(key);
        self.triggers.remove(key);
        self.store_trigger(trigger, false)?;
        Ok(true)
    }

    pub fn job_keys(&self, matcher: &GroupMatcher) -> Vec<JobKey> {
        self.jobs
            .keys()
            .filter(|k| matcher.is_match(k.group()))
            .cloned()
            .collect()
    }

    pub fn trigger_keys(&self, matcher: &GroupMatcher) -> Vec<TriggerKey> {
        self.triggers
            .keys()
            .filter(|k| matcher.is_match(k.group()))
            .cloned()
            .collect()
    }

    pub fn triggers_for_job(&self, key: &JobKey) -> Vec<Trigger> {
        self.triggers
            .values()
            .filter(|e| &e.trigger.job_key == key)
            .map(|e| e.trigger.clone())
            .collect()
    }

    // -- calendars --

    pub fn store_calendar(
        &mut self,
        name: &str,
        calendar: Arc<dyn ExclusionCalendar>,
        replace_existing: bool,
        update_triggers: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if !replace_existing && self.calendars.contains_key(name) {
            return Err(StoreError::CalendarExists(name.to_string()));
        }
        self.calendars
            .insert(name.to_string(), Arc::clone(&calendar));
        if !update_triggers {
            return Ok(());
        }
        let affected: Vec<TriggerKey> = self
            .triggers
            .values()
            .filter(|e| e.trigger.calendar_name.as_deref() == Some(name))
            .map(|e| e.trigger.key.clone())
            .collect();
        let threshold = self.misfire_threshold;
        for key in affected {
            self.dequeue(&key);
            if let Some(entry) = self.triggers.get_mut(&key) {
                entry
                    .trigger
                    .update_with_new_calendar(Some(calendar.as_ref()), now, threshold);
            }
            self.queue(&key);
        }
        Ok(())
    }

    pub fn remove_calendar(&mut self, name: &str) -> Result<bool, StoreError> {
        let in_use = self
            .triggers
            .values()
            .any(|e| e.trigger.calendar_name.as_deref() == Some(name));
        if in_use {
            return Err(StoreError::CalendarInUse(name.to_string()));
        }
        Ok(self.calendars.remove(name).is_some())
    }

    // -- state, pause and resume --

    pub fn trigger_state(&self, key: &TriggerKey) -> TriggerState {
        self.triggers
            .get(key)
            .map_or(TriggerState::None, |e| e.slot.public())
    }

    pub fn reset_trigger_from_error_state(&mut self, key: &TriggerKey) {
        let Some(entry) = self.triggers.get(key) else {
            return;
        };
        if entry.slot != Slot::Error {
            return;
        }
        let slot = if self.paused_trigger_groups.contains(key.group()) {
            Slot::Paused
        } else {
            Slot::Waiting
        };
        self.set_slot(key, slot);
    }

    pub fn pause_trigger(&mut self, key: &TriggerKey) {
        let Some(entry) = self.triggers.get_mut(key) else {
            return;
        };
        entry.slot = match entry.slot {
            Slot::Complete | Slot::Paused | Slot::PausedBlocked => return,
            Slot::Blocked => Slot::PausedBlocked,
            _ => Slot::Paused,
        };
        self.dequeue(key);
    }

    pub fn pause_triggers(&mut self, matcher: &GroupMatcher) -> Vec<String> {
        let mut groups = BTreeSet::new();
        if let Some(group) = matcher.exact_group() {
            groups.insert(group.to_string());
        }
        for key in self.trigger_keys(matcher) {
            groups.insert(key.group().to_string());
            self.pause_trigger(&key);
        }
        self.paused_trigger_groups.extend(groups.iter().cloned());
        groups.into_iter().collect()
    }

    pub fn pause_job(&mut self, key: &JobKey) {
        for trigger in self.triggers_of_job(key) {
            self.pause_trigger(&trigger);
        }
    }

    pub fn pause_jobs(&mut self, matcher: &GroupMatcher) -> Vec<String> {
        let mut groups = BTreeSet::new();
        if let Some(group) = matcher.exact_group() {
            groups.insert(group.to_string());
        }
        for key in self.job_keys(matcher) {
            groups.insert(key.group().to_string());
            self.pause_job(&key);
        }
        self.paused_job_groups.extend(groups.iter().cloned());
        groups.into_iter().collect()
    }

    pub fn resume_trigger(&mut self, key: &TriggerKey, now: DateTime<Utc>, notices: &mut Vec<Notice>) {
        let Some(entry) = self.triggers.get_mut(key) else {
            return;
        };
        if !matches!(entry.slot, Slot::Paused | Slot::PausedBlocked) {
            return;
        }
        entry.slot = if self.blocked_jobs.contains(&entry.trigger.job_key) {
            Slot::Blocked
        } else {
            Slot::Waiting
        };
        self.apply_misfire(key, now, notices);
        self.queue(key);
    }

    pub fn resume_triggers(
        &mut self,
        matcher: &GroupMatcher,
        now: DateTime<Utc>,
        notices: &mut Vec<Notice>,
    ) -> Vec<String> {
        let mut groups: BTreeSet<String> = self
            .paused_trigger_groups
            .iter()
            .filter(|g| matcher.is_match(g))
            .cloned()
            .collect();
        let keys = self.trigger_keys(matcher);
        groups.extend(keys.iter().map(|k| k.group().to_string()));
        self.paused_trigger_groups.retain(|g| !groups.contains(g));
        for key in keys {
            let job_group_paused = self
                .triggers
                .get(&key)
                .is_some_and(|e| self.paused_job_groups.contains(e.trigger.job_key.group()));
            if !job_group_paused {
                self.resume_trigger(&key, now, notices);
            }
        }
        groups.into_iter().collect()
    }

    pub fn resume_job(&mut self, key: &JobKey, now: DateTime<Utc>, notices: &mut Vec<Notice>) {
        for trigger in self.triggers_of_job(key) {
            self.resume_trigger(&trigger, now, notices);
        }
    }

    pub fn resume_jobs(
        &mut self,
        matcher: &GroupMatcher,
        now: DateTime<Utc>,
        notices: &mut Vec<Notice>,
    ) -> Vec<String> {
        let mut groups: BTreeSet<String> = self
            .paused_job_groups
            .iter()
            .filter(|g| matcher.is_match(g))
            .cloned()
            .collect();
        let keys = self.job_keys(matcher);
        groups.extend(keys.iter().map(|k| k.group().to_string()));
        self.paused_job_groups.retain(|g| !groups.contains(g));
        for key in keys {
            self.resume_job(&key, now, notices);
        }
        groups.into_iter().collect()
    }

    // -- firing --

    /// Apply the misfire policy when the trigger is later than the threshold.
    ///
    /// Returns `true` when the next fire time moved.
    fn apply_misfire(
        &mut self,
        key: &TriggerKey,
        now: DateTime<Utc>,
        notices: &mut Vec<Notice>,
    ) -> bool {
        let Some(entry) = self.triggers.get(key) else {
            return false;
        };
        let Some(scheduled) = entry.trigger.next_fire_time else {
            return false;
        };
        if entry.trigger.misfire_instruction == MisfireInstruction::IgnoreMisfires {
            return false;
        }
        let Some(limit) = now.checked_sub_signed(self.misfire_threshold) else {
            return false;
        };
        if scheduled > limit {
            return false;
        }

        let calendar = self.calendar_for(&entry.trigger);
        notices.push(Notice::Misfired(entry.trigger.clone()));
        let Some(entry) = self.triggers.get_mut(key) else {
            return false;
        };
        entry.trigger.update_after_misfire(calendar.as_deref(), now);
        tracing::debug!(
            trigger = %key,
            %scheduled,
            next_fire_time = ?entry.trigger.next_fire_time,
            "trigger misfired"
        );
        match entry.trigger.next_fire_time {
            None => {
                entry.slot = Slot::Complete;
                notices.push(Notice::Finalized(entry.trigger.clone()));
                self.dequeue(key);
                true
            }
            Some(next) => next != scheduled,
        }
    }

    pub fn acquire_next_triggers(
        &mut self,
        no_later_than: DateTime<Utc>,
        max_count: usize,
        time_window: Duration,
        now: DateTime<Utc>,
        ids: &impl IdGen,
        notices: &mut Vec<Notice>,
    ) -> Vec<Trigger> {
        let mut acquired = Vec::new();
        let mut excluded = Vec::new();
        let mut claimed_jobs = BTreeSet::new();
        let mut batch_end = no_later_than;

        while acquired.len() < max_count {
            let Some(first) = self.time_order.first().cloned() else {
                break;
            };
            let key = first.key;
            self.dequeue(&key);

            if self.apply_misfire(&key, now, notices) {
                self.queue(&key);
                continue;
            }
            let Some(entry) = self.triggers.get(&key) else {
                continue;
            };
            let Some(fire_at) = entry.trigger.next_fire_time else {
                continue;
            };
            if fire_at > batch_end {
                self.queue(&key);
                break;
            }

            let job_key = entry.trigger.job_key.clone();
            let exclusive = self
                .jobs
                .get(&job_key)
                .is_some_and(JobDetail::is_concurrent_execution_disallowed);
            if exclusive && !claimed_jobs.insert(job_key) {
                excluded.push(key);
                continue;
            }

            let Some(entry) = self.triggers.get_mut(&key) else {
                continue;
            };
            entry.slot = Slot::Acquired;
            entry.fire_instance_id = Some(ids.next());
            if acquired.is_empty() {
                batch_end = fire_at
                    .max(now)
                    .checked_add_signed(time_window)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
            }
            acquired.push(entry.trigger.clone());
        }

        for key in excluded {
            self.queue(&key);
        }
        acquired
    }

    pub fn release_acquired_trigger(&mut self, key: &TriggerKey) {
        let Some(entry) = self.triggers.get_mut(key) else {
            return;
        };
        if entry.slot != Slot::Acquired {
            return;
        }
        entry.slot = Slot::Waiting;
        entry.fire_instance_id = None;
        self.queue(key);
    }

    pub fn triggers_fired(
        &mut self,
        triggers: &[Trigger],
        now: DateTime<Utc>,
        ids: &impl IdGen,
    ) -> Vec<TriggerFiredResult> {
        triggers
            .iter()
            .map(|t| self.trigger_fired(&t.key, now, ids))
            .collect()
    }

    fn trigger_fired(
        &mut self,
        key: &TriggerKey,
        now: DateTime<Utc>,
        ids: &impl IdGen,
    ) -> TriggerFiredResult {
        let Some(entry) = self.triggers.get(key) else {
            return TriggerFiredResult::Unavailable(key.clone());
        };
        if entry.slot != Slot::Acquired {
            return TriggerFiredResult::Unavailable(key.clone());
        }
        let calendar = match &entry.trigger.calendar_name {
            Some(name) => match self.calendars.get(name) {
                Some(calendar) => Some(Arc::clone(calendar)),
                None => return TriggerFiredResult::Unavailable(key.clone()),
            },
            None => None,
        };
        let Some(job) = self.jobs.get(&entry.trigger.job_key).cloned() else {
            return TriggerFiredResult::Failed {
                key: key.clone(),
                error: StoreError::JobNotFound(entry.trigger.job_key.clone()),
            };
        };

        self.dequeue(key);
        let Some(entry) = self.triggers.get_mut(key) else {
            return TriggerFiredResult::Unavailable(key.clone());
        };
        let previous_fire_time = entry.trigger.previous_fire_time;
        entry.trigger.triggered(calendar.as_deref());
        entry.slot = Slot::Waiting;
        let fire_instance_id = entry
            .fire_instance_id
            .take()
            .unwrap_or_else(|| ids.next());
        let bundle = FiredTriggerBundle {
            job_detail: job.clone(),
            trigger: entry.trigger.clone(),
            calendar,
            job_is_recovering: false,
            fire_time: now,
            scheduled_fire_time: entry.trigger.previous_fire_time,
            previous_fire_time,
            next_fire_time: entry.trigger.next_fire_time,
            fire_instance_id,
        };

        if job.is_concurrent_execution_disallowed() {
            for sibling in self.triggers_of_job(&job.key) {
                if let Some(entry) = self.triggers.get_mut(&sibling) {
                    entry.slot = match entry.slot {
                        Slot::Waiting => Slot::Blocked,
                        Slot::Paused => Slot::PausedBlocked,
                        other => other,
                    };
                }
                self.dequeue(&sibling);
            }
            self.blocked_jobs.insert(job.key);
        } else {
            self.queue(key);
        }
        TriggerFiredResult::Fired(Box::new(bundle))
    }

    pub fn triggered_job_complete(
        &mut self,
        trigger: &Trigger,
        job: &JobDetail,
        instruction: CompletedExecutionInstruction,
        notices: &mut Vec<Notice>,
    ) {
        let mut exclusive = false;
        if let Some(stored) = self.jobs.get_mut(&job.key) {
            if stored.is_persist_job_data_after_execution() {
                stored.job_data = job.job_data.clone();
            }
            exclusive = stored.is_concurrent_execution_disallowed();
        }
        if exclusive {
            self.unblock_job(&job.key);
            notices.push(Notice::SchedulingChange);
        } else {
            self.blocked_jobs.remove(&job.key);
        }

        let key = &trigger.key;
        let Some(stored_next) = self.triggers.get(key).map(|e| e.trigger.next_fire_time) else {
            return;
        };
        use CompletedExecutionInstruction as I;
        match instruction {
            I::DeleteTrigger => {
                if trigger.next_fire_time.is_some() {
                    self.remove_trigger(key, notices);
                    notices.push(Notice::SchedulingChange);
                } else if stored_next.is_none() {
                    // not rescheduled while the job ran
                    self.remove_trigger(key, notices);
                }
            }
            I::SetTriggerComplete => {
                self.set_slot(key, Slot::Complete);
                notices.push(Notice::SchedulingChange);
            }
            I::SetTriggerPaused => {
                self.pause_trigger(key);
                notices.push(Notice::SchedulingChange);
            }
            I::SetTriggerError => {
                tracing::warn!(trigger = %key, "trigger set to error state");
                self.set_slot(key, Slot::Error);
                notices.push(Notice::SchedulingChange);
            }
            I::SetAllJobsOfTriggerGroupComplete => {
                for sibling in self.triggers_in_group(key.group()) {
                    self.set_slot(&sibling, Slot::Complete);
                }
                notices.push(Notice::SchedulingChange);
            }
            I::SetAllJobsOfTriggerGroupPaused => {
                for sibling in self.triggers_in_group(key.group()) {
                    self.pause_trigger(&sibling);
                }
                notices.push(Notice::SchedulingChange);
            }
            I::SetAllJobsOfTriggerGroupError => {
                tracing::warn!(group = key.group(), "trigger group set to error state");
                for sibling in self.triggers_in_group(key.group()) {
                    self.set_slot(&sibling, Slot::Error);
                }
                notices.push(Notice::SchedulingChange);
            }
            I::Noop | I::ReExecuteJob => {}
        }
    }

    fn unblock_job(&mut self, job: &JobKey) {
        self.blocked_jobs.remove(job);
        for key in self.triggers_of_job(job) {
            match self.triggers.get(&key).map(|e| e.slot) {
                Some(Slot::Blocked) => self.set_slot(&key, Slot::Waiting),
                Some(Slot::PausedBlocked) => self.set_slot(&key, Slot::Paused),
                _ => {}
            }
        }
    }

    pub fn clear(&mut self) {
        let misfire_threshold = self.misfire_threshold;
        *self = Self {
            misfire_threshold,
            ..Self::default()
        };
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
