// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job run shell
//!
//! One shell wraps one fire of one trigger. It instantiates the job, runs
//! the listener protocol around it, asks the trigger what to do next, and
//! reports that instruction to the store. Nothing escapes [`JobRunShell::run`]:
//! job failures, listener failures, and panics all end in a reported outcome.

use crate::context::JobExecutionContext;
use crate::error::SchedulerError;
use crate::job::Job;
use crate::signals::{SchedulerCore, SchedulerSignaler};
use crate::store::FiredTriggerBundle;
use kairos_core::{CompletedExecutionInstruction, JobExecutionError, Trigger};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Hooks wrapped around each execution attempt, such as a transaction
pub trait ExecutionBoundary: Send + Sync {
    fn begin(&self, context: &JobExecutionContext) -> Result<(), SchedulerError>;

    fn complete(&self, context: &JobExecutionContext, successful: bool);
}

/// Boundary that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpBoundary;

impl ExecutionBoundary for NoOpBoundary {
    fn begin(&self, _context: &JobExecutionContext) -> Result<(), SchedulerError> {
        Ok(())
    }

    fn complete(&self, _context: &JobExecutionContext, _successful: bool) {}
}

/// Outcome of notifying listeners before an execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    Proceed,
    Vetoed,
    Aborted,
}

/// Lifecycle of a shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Created,
    Initialized,
    Running,
    Vetoed,
    Aborted,
    Completed,
}

/// Cloneable handle that asks a running shell to stop before its next refire
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs one fire of a trigger on a worker
pub struct JobRunShell {
    core: Arc<SchedulerCore>,
    bundle: FiredTriggerBundle,
    job: Option<Box<dyn Job>>,
    context: Option<JobExecutionContext>,
    state: ShellState,
    shutdown: ShutdownHandle,
    finalized_signaled: bool,
}

impl JobRunShell {
    pub fn new(core: Arc<SchedulerCore>, bundle: FiredTriggerBundle) -> Self {
        Self {
            core,
            bundle,
            job: None,
            context: None,
            state: ShellState::Created,
            shutdown: ShutdownHandle::default(),
            finalized_signaled: false,
        }
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn bundle(&self) -> &FiredTriggerBundle {
        &self.bundle
    }

    /// Instantiate the job and build its context.
    ///
    /// A failure is reported to scheduler listeners before it is returned;
    /// the caller then marks the trigger as errored.
    pub fn initialize(&mut self) -> Result<(), SchedulerError> {
        let factory = self.core.job_factory();
        let created = panic::catch_unwind(AssertUnwindSafe(|| factory.new_job(&self.bundle)))
            .unwrap_or_else(|payload| {
                Err(SchedulerError::JobInstantiation {
                    job: self.bundle.job_detail.key.clone(),
                    message: format!(
                        "factory panicked: {}",
                        crate::signals::panic_detail(payload.as_ref())
                    ),
                })
            });
        match created {
            Ok(job) => {
                self.job = Some(job);
                self.context = Some(JobExecutionContext::new(&self.bundle));
                self.state = ShellState::Initialized;
                Ok(())
            }
            Err(e) => {
                self.core.notify_scheduler_listeners_error(
                    &format!(
                        "unable to instantiate job {} for trigger {}",
                        self.bundle.job_detail.key, self.bundle.trigger.key
                    ),
                    &e,
                );
                self.state = ShellState::Aborted;
                Err(e)
            }
        }
    }

    /// Ask the shell to stop before its next refire
    pub fn request_shutdown(&self) {
        self.shutdown.request();
    }

    /// Handle for requesting shutdown after the shell has moved to a worker
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    fn shutdown_pending(&self) -> bool {
        self.shutdown.is_requested() || self.core.is_shutting_down()
    }

    /// Execute the fire, looping while the job asks to be re-executed
    pub fn run(&mut self) {
        let (Some(job), Some(mut context)) = (self.job.take(), self.context.take()) else {
            let error = SchedulerError::JobInstantiation {
                job: self.bundle.job_detail.key.clone(),
                message: "shell was not initialized".to_string(),
            };
            self.core
                .notify_scheduler_listeners_error("job run shell ran before initialize", &error);
            self.state = ShellState::Aborted;
            return;
        };

        let span = tracing::info_span!(
            "shell.run",
            trigger = %self.bundle.trigger.key,
            job = %self.bundle.job_detail.key,
            fire_instance_id = %self.bundle.fire_instance_id,
        );
        let _guard = span.enter();

        self.state = ShellState::Running;
        self.core.job_started(&context);
        let instruction = self.run_attempts(job.as_ref(), &mut context);
        self.core.job_finished(context.fire_instance_id());

        if let Some(instruction) = instruction {
            self.core.notify_job_store_job_complete(
                context.trigger(),
                context.job_detail(),
                instruction,
            );
            if self.state == ShellState::Running {
                self.state = ShellState::Completed;
            }
        }

        self.job = Some(job);
        self.context = None;
    }

    /// Drive attempts until one settles; `None` means the outcome was
    /// already reported through the veto path
    fn run_attempts(
        &mut self,
        job: &dyn Job,
        context: &mut JobExecutionContext,
    ) -> Option<CompletedExecutionInstruction> {
        let boundary = self.core.boundary();
        loop {
            if let Err(e) = boundary.begin(context) {
                self.core.notify_scheduler_listeners_error(
                    &format!("execution boundary rejected job {}", context.job_detail().key),
                    &e,
                );
                self.state = ShellState::Aborted;
                return Some(CompletedExecutionInstruction::Noop);
            }

            match self.notify_listeners_beginning(context) {
                BeginOutcome::Proceed => {}
                BeginOutcome::Aborted => {
                    boundary.complete(context, false);
                    self.state = ShellState::Aborted;
                    return Some(CompletedExecutionInstruction::Noop);
                }
                BeginOutcome::Vetoed => {
                    let instruction = self.trigger_instruction(context, None);
                    self.core.notify_job_store_job_vetoed(
                        context.trigger(),
                        context.job_detail(),
                        instruction,
                    );
                    self.signal_finalized_once(context);
                    boundary.complete(context, true);
                    self.state = ShellState::Vetoed;
                    return None;
                }
            }

            tracing::info!(refire_count = context.refire_count(), "executing job");
            let start = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.execute(context)));
            let elapsed = start.elapsed();
            context.set_job_run_time(elapsed);

            let failure = match outcome {
                Ok(Ok(())) => {
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "job completed");
                    None
                }
                Ok(Err(e)) => {
                    tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, error = %e, "job failed");
                    Some(e)
                }
                Err(payload) => {
                    let e = JobExecutionError::from_panic(payload.as_ref());
                    tracing::error!(elapsed_ms = elapsed.as_millis() as u64, error = %e, "job panicked");
                    let error = SchedulerError::JobFailed {
                        job: context.job_detail().key.clone(),
                        source: e.clone(),
                    };
                    self.core.notify_scheduler_listeners_error(
                        &format!("job {} panicked", context.job_detail().key),
                        &error,
                    );
                    Some(e)
                }
            };

            if let Err(e) = self
                .core
                .notify_job_listeners_executed(context, failure.as_ref())
            {
                self.core.notify_scheduler_listeners_error(
                    "unable to notify job listeners of completion",
                    &e,
                );
            }

            let instruction = self.trigger_instruction(context, failure.as_ref());

            if let Err(e) = self
                .core
                .notify_trigger_listeners_complete(context, instruction)
            {
                self.core.notify_scheduler_listeners_error(
                    "unable to notify trigger listeners of completion",
                    &e,
                );
            }

            self.signal_finalized_once(context);
            boundary.complete(context, failure.is_none());

            if instruction == CompletedExecutionInstruction::ReExecuteJob {
                if self.shutdown_pending() {
                    tracing::info!("shutdown requested, dropping refire");
                    return Some(CompletedExecutionInstruction::Noop);
                }
                context.increment_refire_count();
                context.clear_result();
                continue;
            }
            return Some(instruction);
        }
    }

    /// Trigger listeners first (which may veto), then job listeners
    fn notify_listeners_beginning(&self, context: &JobExecutionContext) -> BeginOutcome {
        let vetoed = match self.core.notify_trigger_listeners_fired(context) {
            Ok(vetoed) => vetoed,
            Err(e) => {
                self.core.notify_scheduler_listeners_error(
                    "unable to notify trigger listeners while firing; job will not run",
                    &e,
                );
                return BeginOutcome::Aborted;
            }
        };

        if vetoed {
            if let Err(e) = self.core.notify_job_listeners_vetoed(context) {
                self.core.notify_scheduler_listeners_error(
                    "unable to notify job listeners of veto",
                    &e,
                );
            }
            return BeginOutcome::Vetoed;
        }

        if let Err(e) = self.core.notify_job_listeners_to_be_executed(context) {
            self.core.notify_scheduler_listeners_error(
                "unable to notify job listeners before execution; job will not run",
                &e,
            );
            return BeginOutcome::Aborted;
        }
        BeginOutcome::Proceed
    }

    fn trigger_instruction(
        &self,
        context: &JobExecutionContext,
        failure: Option<&JobExecutionError>,
    ) -> CompletedExecutionInstruction {
        self.guard_trigger_logic(context.trigger(), || {
            context
                .trigger()
                .execution_complete(context.job_detail(), failure)
        })
    }

    /// A panic in trigger completion logic is reported and degrades to `Noop`
    fn guard_trigger_logic(
        &self,
        trigger: &Trigger,
        decide: impl FnOnce() -> CompletedExecutionInstruction,
    ) -> CompletedExecutionInstruction {
        panic::catch_unwind(AssertUnwindSafe(decide)).unwrap_or_else(|payload| {
            let error = SchedulerError::TriggerLogic {
                trigger: trigger.key.clone(),
                message: crate::signals::panic_detail(payload.as_ref()).to_string(),
            };
            self.core
                .notify_scheduler_listeners_error("trigger completion logic failed", &error);
            CompletedExecutionInstruction::Noop
        })
    }

    fn signal_finalized_once(&mut self, context: &JobExecutionContext) {
        if self.finalized_signaled || context.trigger().next_fire_time.is_some() {
            return;
        }
        self.finalized_signaled = true;
        self.core
            .notify_scheduler_listeners_finalized(context.trigger());
    }

    /// Return the job instance to the factory and let go of the scheduler
    pub fn passivate(mut self) {
        if let Some(job) = self.job.take() {
            self.core.job_factory().return_job(job);
        }
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
