// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kairos-engine: runs fired triggers
//!
//! The acquisition loop claims due triggers from a [`JobStore`], the worker
//! pool runs one [`JobRunShell`] per fire, and the shell drives listeners,
//! the job, and the completion instruction back to the store.

mod acquire;
pub mod config;
mod context;
mod error;
pub mod job;
pub mod listener;
mod pool;
mod registry;
mod scheduler;
mod shell;
mod signals;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use config::SchedulerConfig;
pub use context::{InterruptToken, JobExecutionContext};
pub use error::SchedulerError;
pub use job::{Job, JobFactory, JobType, JobTypeRegistry, RegistryJobFactory};
pub use listener::{JobListener, ListenerError, SchedulerListener, TriggerListener};
pub use pool::WorkerPool;
pub use registry::{ListenerRegistry, NamedListener, Registrations};
pub use scheduler::{Scheduler, SchedulerMetadata, MANUAL_TRIGGER_GROUP};
pub use shell::{BeginOutcome, ExecutionBoundary, JobRunShell, NoOpBoundary, ShellState, ShutdownHandle};
pub use signals::{ExecutingJob, SchedulerCore, SchedulerSignaler};
pub use store::{FiredTriggerBundle, JobStore, StoreError, TriggerFiredResult};
