// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acquisition loop
//!
//! Waits for a free worker, claims due triggers from the store, sleeps until
//! the earliest is due, fires the batch, and hands each bundle to the pool.
//! A scheduling change that moves an earlier trigger into view releases the
//! claimed batch and starts over.

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::pool::WorkerPool;
use crate::shell::JobRunShell;
use crate::signals::{SchedulerCore, SchedulerSignaler};
use crate::store::{FiredTriggerBundle, TriggerFiredResult};
use chrono::{DateTime, Utc};
use kairos_core::{Clock, CompletedExecutionInstruction, Trigger};
use std::sync::Arc;
use std::time::Duration;

/// Triggers closer than this to their fire time are fired without sleeping
const FIRE_SLACK: Duration = Duration::from_millis(2);

/// Back-off after a store failure during acquisition
const STORE_FAILURE_BACKOFF: Duration = Duration::from_millis(500);

/// How often standby re-checks its flags
const STANDBY_POLL: Duration = Duration::from_secs(1);

pub struct AcquisitionLoop<C: Clock> {
    core: Arc<SchedulerCore>,
    pool: Arc<WorkerPool>,
    clock: C,
    config: SchedulerConfig,
}

impl<C: Clock> AcquisitionLoop<C> {
    pub fn new(
        core: Arc<SchedulerCore>,
        pool: Arc<WorkerPool>,
        clock: C,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            core,
            pool,
            clock,
            config,
        }
    }

    pub async fn run(self) {
        tracing::info!(instance = self.core.instance_name(), "acquisition loop started");
        while !self.core.is_shutting_down() {
            if self.core.is_in_standby() {
                self.wait_for_change(STANDBY_POLL).await;
                continue;
            }

            let available = self.pool.block_for_available_threads().await;
            if available == 0 || self.core.is_shutting_down() {
                break;
            }

            let triggers = match self.acquire(available) {
                Some(triggers) => triggers,
                None => {
                    tokio::time::sleep(STORE_FAILURE_BACKOFF).await;
                    continue;
                }
            };

            let Some(first_fire) = triggers.first().and_then(|t| t.next_fire_time) else {
                self.wait_for_change(self.config.idle_wait_time).await;
                continue;
            };

            if !self.wait_until_due(first_fire).await {
                self.release(&triggers);
                continue;
            }
            if self.core.is_shutting_down() || self.core.is_in_standby() {
                self.release(&triggers);
                continue;
            }

            self.fire(&triggers).await;
        }
        tracing::info!(instance = self.core.instance_name(), "acquisition loop stopped");
    }

    fn acquire(&self, available: usize) -> Option<Vec<Trigger>> {
        let idle = chrono::Duration::from_std(self.config.idle_wait_time)
            .unwrap_or(chrono::Duration::seconds(30));
        let no_later_than = self.clock.now() + idle;
        let max_count = available.min(self.config.max_batch_size);
        self.core
            .store()
            .acquire_next_triggers(
                no_later_than,
                max_count,
                self.config.batch_time_window_chrono(),
            )
            .map_err(|e| {
                self.core.notify_scheduler_listeners_error(
                    "unable to acquire the next triggers",
                    &SchedulerError::from(e),
                );
            })
            .ok()
    }

    /// Sleep until `fire_at`; returns `false` when an earlier change arrived
    async fn wait_until_due(&self, fire_at: DateTime<Utc>) -> bool {
        loop {
            let remaining = (fire_at - self.clock.now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            if remaining <= FIRE_SLACK {
                return true;
            }
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = self.core.scheduling_changed() => {
                    if self.core.is_shutting_down() {
                        return false;
                    }
                    if let Some(candidate) = self.core.take_scheduling_change() {
                        if is_candidate_earlier(candidate, fire_at) {
                            tracing::debug!(%fire_at, ?candidate, "earlier trigger appeared");
                            return false;
                        }
                    }
                }
            }
        }
    }

    async fn wait_for_change(&self, timeout: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {}
            _ = self.core.scheduling_changed() => {
                self.core.take_scheduling_change();
            }
        }
    }

    fn release(&self, triggers: &[Trigger]) {
        for trigger in triggers {
            if let Err(e) = self.core.store().release_acquired_trigger(trigger) {
                self.core.notify_scheduler_listeners_error(
                    &format!("unable to release trigger {}", trigger.key),
                    &SchedulerError::from(e),
                );
            }
        }
    }

    async fn fire(&self, triggers: &[Trigger]) {
        let results = match self.core.store().triggers_fired(triggers) {
            Ok(results) => results,
            Err(e) => {
                self.core.notify_scheduler_listeners_error(
                    "unable to mark acquired triggers as fired",
                    &SchedulerError::from(e),
                );
                self.release(triggers);
                return;
            }
        };

        let mut pool_closed = false;
        for result in results {
            let bundle = match result {
                TriggerFiredResult::Fired(bundle) => *bundle,
                TriggerFiredResult::Unavailable(key) => {
                    tracing::debug!(trigger = %key, "trigger no longer available");
                    continue;
                }
                TriggerFiredResult::Failed { key, error } => {
                    self.core.notify_scheduler_listeners_error(
                        &format!("trigger {key} could not be fired"),
                        &SchedulerError::from(error),
                    );
                    if let Some(trigger) = triggers.iter().find(|t| t.key == key) {
                        self.release(std::slice::from_ref(trigger));
                    }
                    continue;
                }
            };
            if pool_closed {
                self.abandon(&bundle);
                continue;
            }

            let mut shell = JobRunShell::new(Arc::clone(&self.core), bundle);
            if shell.initialize().is_err() {
                self.abandon(shell.bundle());
                continue;
            }
            tracing::debug!(
                trigger = %shell.bundle().trigger.key,
                fire_instance_id = %shell.bundle().fire_instance_id,
                "dispatching fired trigger"
            );
            if let Err(shell) = self.pool.run_in_thread(shell).await {
                tracing::warn!(
                    trigger = %shell.bundle().trigger.key,
                    "worker pool closed while dispatching"
                );
                self.abandon(shell.bundle());
                pool_closed = true;
            }
        }
    }

    /// Report a fired bundle that will never run as an error
    fn abandon(&self, bundle: &FiredTriggerBundle) {
        self.core.notify_job_store_job_complete(
            &bundle.trigger,
            &bundle.job_detail,
            CompletedExecutionInstruction::SetTriggerError,
        );
    }
}

/// An unknown candidate always counts as earlier
fn is_candidate_earlier(candidate: Option<DateTime<Utc>>, current: DateTime<Utc>) -> bool {
    match candidate {
        Some(candidate) => candidate < current,
        None => true,
    }
}

#[cfg(test)]
#[path = "acquire_tests.rs"]
mod tests;
