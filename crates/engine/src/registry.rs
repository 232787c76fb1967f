// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener registry
//!
//! Registrations are copy-on-write: mutation swaps in a new list, and
//! dispatch iterates an `Arc` snapshot taken under a short read lock. A
//! listener registered mid-dispatch is seen from the next dispatch on.

use crate::error::SchedulerError;
use crate::listener::{JobListener, SchedulerListener, TriggerListener};
use kairos_core::{matcher, JobKey, Key, Matcher, TriggerKey};
use std::sync::{Arc, RwLock};

/// Listeners registered under a name
pub trait NamedListener: Send + Sync {
    fn listener_name(&self) -> &str;
}

impl NamedListener for dyn JobListener {
    fn listener_name(&self) -> &str {
        self.name()
    }
}

impl NamedListener for dyn TriggerListener {
    fn listener_name(&self) -> &str {
        self.name()
    }
}

struct Registration<L: ?Sized, K> {
    listener: Arc<L>,
    matchers: Vec<Matcher<K>>,
}

impl<L: ?Sized, K: Clone> Clone for Registration<L, K> {
    fn clone(&self) -> Self {
        Self {
            listener: Arc::clone(&self.listener),
            matchers: self.matchers.clone(),
        }
    }
}

/// Ordered, named registrations of one listener kind
pub struct Registrations<L: ?Sized, K> {
    entries: RwLock<Arc<Vec<Registration<L, K>>>>,
}

impl<L: ?Sized, K> Default for Registrations<L, K> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }
}

impl<L, K> Registrations<L, K>
where
    L: ?Sized + NamedListener,
    K: Key + Clone + PartialEq,
{
    fn snapshot(&self) -> Arc<Vec<Registration<L, K>>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&entries)
    }

    fn update<T>(&self, f: impl FnOnce(&mut Vec<Registration<L, K>>) -> T) -> T {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let mut next = entries.as_ref().clone();
        let out = f(&mut next);
        *entries = Arc::new(next);
        out
    }

    /// Register a listener; a name already present is replaced in place
    pub fn add(&self, listener: Arc<L>, matchers: Vec<Matcher<K>>) -> Result<(), SchedulerError> {
        if listener.listener_name().is_empty() {
            return Err(SchedulerError::EmptyListenerName);
        }
        let registration = Registration { listener, matchers };
        self.update(|entries| {
            let name = registration.listener.listener_name();
            match entries
                .iter()
                .position(|e| e.listener.listener_name() == name)
            {
                Some(pos) => entries[pos] = registration,
                None => entries.push(registration),
            }
        });
        Ok(())
    }

    pub fn remove(&self, name: &str) -> bool {
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|e| e.listener.listener_name() != name);
            entries.len() != before
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<L>> {
        self.snapshot()
            .iter()
            .find(|e| e.listener.listener_name() == name)
            .map(|e| Arc::clone(&e.listener))
    }

    pub fn listeners(&self) -> Vec<Arc<L>> {
        self.snapshot()
            .iter()
            .map(|e| Arc::clone(&e.listener))
            .collect()
    }

    pub fn add_matcher(&self, name: &str, matcher: Matcher<K>) -> bool {
        self.with_entry(name, |e| e.matchers.push(matcher))
    }

    pub fn remove_matcher(&self, name: &str, matcher: &Matcher<K>) -> bool {
        let mut removed = false;
        let found = self.with_entry(name, |e| {
            let before = e.matchers.len();
            e.matchers.retain(|m| m != matcher);
            removed = e.matchers.len() != before;
        });
        found && removed
    }

    pub fn set_matchers(&self, name: &str, matchers: Vec<Matcher<K>>) -> bool {
        self.with_entry(name, |e| e.matchers = matchers)
    }

    pub fn matchers(&self, name: &str) -> Option<Vec<Matcher<K>>> {
        self.snapshot()
            .iter()
            .find(|e| e.listener.listener_name() == name)
            .map(|e| e.matchers.clone())
    }

    /// Listeners whose matchers select `key`, in registration order
    pub fn matching(&self, key: &K) -> Vec<Arc<L>> {
        self.snapshot()
            .iter()
            .filter(|e| matcher::any_match(&e.matchers, key))
            .map(|e| Arc::clone(&e.listener))
            .collect()
    }

    fn with_entry(&self, name: &str, f: impl FnOnce(&mut Registration<L, K>)) -> bool {
        self.update(|entries| {
            match entries
                .iter_mut()
                .find(|e| e.listener.listener_name() == name)
            {
                Some(entry) => {
                    f(entry);
                    true
                }
                None => false,
            }
        })
    }
}

/// Job, trigger, and scheduler listeners known to one scheduler
#[derive(Default)]
pub struct ListenerRegistry {
    jobs: Registrations<dyn JobListener, JobKey>,
    triggers: Registrations<dyn TriggerListener, TriggerKey>,
    scheduler: RwLock<Arc<Vec<Arc<dyn SchedulerListener>>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> &Registrations<dyn JobListener, JobKey> {
        &self.jobs
    }

    pub fn triggers(&self) -> &Registrations<dyn TriggerListener, TriggerKey> {
        &self.triggers
    }

    pub fn add_job_listener(
        &self,
        listener: Arc<dyn JobListener>,
        matchers: Vec<Matcher<JobKey>>,
    ) -> Result<(), SchedulerError> {
        self.jobs.add(listener, matchers)
    }

    pub fn remove_job_listener(&self, name: &str) -> bool {
        self.jobs.remove(name)
    }

    pub fn add_trigger_listener(
        &self,
        listener: Arc<dyn TriggerListener>,
        matchers: Vec<Matcher<TriggerKey>>,
    ) -> Result<(), SchedulerError> {
        self.triggers.add(listener, matchers)
    }

    pub fn remove_trigger_listener(&self, name: &str) -> bool {
        self.triggers.remove(name)
    }

    pub fn add_scheduler_listener(&self, listener: Arc<dyn SchedulerListener>) {
        let mut current = self.scheduler.write().unwrap_or_else(|e| e.into_inner());
        let mut next = current.as_ref().clone();
        next.push(listener);
        *current = Arc::new(next);
    }

    pub fn remove_scheduler_listener(&self, listener: &Arc<dyn SchedulerListener>) -> bool {
        let mut current = self.scheduler.write().unwrap_or_else(|e| e.into_inner());
        let mut next = current.as_ref().clone();
        let before = next.len();
        next.retain(|l| !Arc::ptr_eq(l, listener));
        let removed = next.len() != before;
        *current = Arc::new(next);
        removed
    }

    pub fn scheduler_listeners(&self) -> Arc<Vec<Arc<dyn SchedulerListener>>> {
        let current = self.scheduler.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&current)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
