// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::{
    bundle, fn_job_type, EventLog, FakeJobStore, Hook, RecordingJobListener,
    RecordingSchedulerListener, RecordingTriggerListener,
};
use crate::job::{JobTypeRegistry, RegistryJobFactory};
use chrono::{DateTime, TimeZone, Utc};
use kairos_core::{JobDetail, JobKey, SimpleSchedule, Trigger, TriggerKey};
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn with_tracing<T>(f: impl FnOnce() -> T) -> (String, T) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (logs.contents(), result)
}

struct Fixture {
    core: Arc<SchedulerCore>,
    store: FakeJobStore,
    registry: Arc<JobTypeRegistry>,
    log: EventLog,
}

impl Fixture {
    fn new() -> Self {
        let store = FakeJobStore::new();
        let registry = Arc::new(JobTypeRegistry::new());
        let core = Arc::new(SchedulerCore::new(
            "test",
            "TEST",
            Arc::new(store.clone()),
            Arc::new(RegistryJobFactory::new(Arc::clone(&registry))),
        ));
        let log = EventLog::new();
        core.listeners()
            .add_scheduler_listener(Arc::new(RecordingSchedulerListener::new(log.clone())));
        Self {
            core,
            store,
            registry,
            log,
        }
    }

    fn with_job<F>(self, f: F) -> Self
    where
        F: Fn(&mut JobExecutionContext) -> Result<(), JobExecutionError>
            + Send
            + Sync
            + Clone
            + 'static,
    {
        self.registry.register(fn_job_type("work", f));
        self
    }

    fn job_listener(&self, listener: RecordingJobListener) {
        self.core
            .listeners()
            .add_job_listener(Arc::new(listener), Vec::new())
            .unwrap();
    }

    fn trigger_listener(&self, listener: RecordingTriggerListener) {
        self.core
            .listeners()
            .add_trigger_listener(Arc::new(listener), Vec::new())
            .unwrap();
    }

    fn shell(&self, trigger: Trigger) -> JobRunShell {
        let job = JobDetail::new(JobKey::new("j"), "work");
        JobRunShell::new(Arc::clone(&self.core), bundle(job, trigger, at(0)))
    }

    fn run(&self, trigger: Trigger) -> JobRunShell {
        let mut shell = self.shell(trigger);
        shell.initialize().unwrap();
        shell.run();
        shell
    }
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
}

fn once() -> Trigger {
    Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::new("j"))
        .start_at(at(0))
        .build()
        .unwrap()
}

fn repeating() -> Trigger {
    Trigger::builder(TriggerKey::new("t"))
        .for_job(JobKey::new("j"))
        .start_at(at(0))
        .with_schedule(SimpleSchedule::repeat_forever(std::time::Duration::from_secs(60)).unwrap())
        .build()
        .unwrap()
}

fn ok(_: &mut JobExecutionContext) -> Result<(), JobExecutionError> {
    Ok(())
}

#[test]
fn listeners_run_in_protocol_order() {
    let fixture = Fixture::new().with_job(ok);
    fixture.trigger_listener(RecordingTriggerListener::new("tl", fixture.log.clone()));
    fixture.job_listener(RecordingJobListener::new("jl", fixture.log.clone()));

    let shell = fixture.run(once());

    assert_eq!(shell.state(), ShellState::Completed);
    assert_eq!(
        fixture.log.events(),
        vec![
            "tl:fired:DEFAULT.t",
            "tl:veto:DEFAULT.t",
            "jl:to_be_executed:DEFAULT.j",
            "jl:was_executed:DEFAULT.j:ok",
            "tl:complete:DEFAULT.t:delete-trigger",
            "scheduler:finalized:DEFAULT.t",
        ]
    );
    assert_eq!(
        fixture.store.completions(),
        vec![(TriggerKey::new("t"), CompletedExecutionInstruction::DeleteTrigger)]
    );
    assert_eq!(fixture.core.jobs_executed(), 1);
    assert!(fixture.core.currently_executing().is_empty());
}

#[test]
fn repeating_trigger_is_not_finalized() {
    let fixture = Fixture::new().with_job(ok);
    fixture.run(repeating());

    assert!(fixture.log.matching("scheduler:finalized").is_empty());
    assert_eq!(
        fixture.store.completions(),
        vec![(TriggerKey::new("t"), CompletedExecutionInstruction::Noop)]
    );
}

#[test]
fn veto_skips_the_job_and_reports_through_the_veto_path() {
    let ran = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&ran);
    let fixture = Fixture::new().with_job(move |_: &mut JobExecutionContext| {
        *flag.lock().unwrap() = true;
        Ok(())
    });
    fixture.trigger_listener(RecordingTriggerListener::new("v", fixture.log.clone()).vetoing());
    fixture.job_listener(RecordingJobListener::new("jl", fixture.log.clone()));

    let shell = fixture.run(once());

    assert!(!*ran.lock().unwrap());
    assert_eq!(shell.state(), ShellState::Vetoed);
    assert_eq!(
        fixture.log.events(),
        vec![
            "v:fired:DEFAULT.t",
            "v:veto:DEFAULT.t",
            "jl:vetoed:DEFAULT.j",
            "scheduler:finalized:DEFAULT.t",
        ]
    );
    assert_eq!(
        fixture.store.completions(),
        vec![(TriggerKey::new("t"), CompletedExecutionInstruction::DeleteTrigger)]
    );
}

#[test]
fn listener_failure_before_execution_aborts_with_noop() {
    let fixture = Fixture::new().with_job(ok);
    fixture.job_listener(
        RecordingJobListener::new("jl", fixture.log.clone()).failing_on(Hook::ToBeExecuted),
    );

    let shell = fixture.run(once());

    assert_eq!(shell.state(), ShellState::Aborted);
    assert!(fixture.log.matching("jl:was_executed").is_empty());
    assert_eq!(fixture.log.matching("scheduler:error").len(), 1);
    assert_eq!(
        fixture.store.completions(),
        vec![(TriggerKey::new("t"), CompletedExecutionInstruction::Noop)]
    );
}

#[test]
fn listener_failure_after_execution_is_reported_and_completion_continues() {
    let fixture = Fixture::new().with_job(ok);
    fixture.job_listener(
        RecordingJobListener::new("jl", fixture.log.clone()).failing_on(Hook::WasExecuted),
    );

    let shell = fixture.run(once());

    assert_eq!(shell.state(), ShellState::Completed);
    assert_eq!(fixture.log.matching("scheduler:error").len(), 1);
    assert_eq!(
        fixture.store.completions(),
        vec![(TriggerKey::new("t"), CompletedExecutionInstruction::DeleteTrigger)]
    );
}

#[test]
fn refire_runs_the_same_instance_again() {
    let counts = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&counts);
    let fixture = Fixture::new().with_job(move |ctx: &mut JobExecutionContext| {
        seen.lock().unwrap().push(ctx.refire_count());
        if ctx.refire_count() < 2 {
            return Err(JobExecutionError::new("retry").refire_immediately());
        }
        Ok(())
    });
    fixture.job_listener(RecordingJobListener::new("jl", fixture.log.clone()));

    fixture.run(once());

    assert_eq!(*counts.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(
        fixture.log.matching("jl:was_executed"),
        vec![
            "jl:was_executed:DEFAULT.j:failed",
            "jl:was_executed:DEFAULT.j:failed",
            "jl:was_executed:DEFAULT.j:ok",
        ]
    );
    assert_eq!(fixture.log.matching("scheduler:finalized").len(), 1);
    assert_eq!(
        fixture.store.completions(),
        vec![(TriggerKey::new("t"), CompletedExecutionInstruction::DeleteTrigger)]
    );
}

#[test]
fn shutdown_drops_pending_refire() {
    let runs = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&runs);
    let fixture = Fixture::new().with_job(move |_: &mut JobExecutionContext| {
        *counter.lock().unwrap() += 1;
        Err(JobExecutionError::new("again").refire_immediately())
    });

    let mut shell = fixture.shell(once());
    shell.initialize().unwrap();
    shell.request_shutdown();
    shell.run();

    assert_eq!(*runs.lock().unwrap(), 1);
    assert_eq!(
        fixture.store.completions(),
        vec![(TriggerKey::new("t"), CompletedExecutionInstruction::Noop)]
    );
}

#[test]
fn job_panic_is_contained_and_reported() {
    let fixture = Fixture::new().with_job(|_: &mut JobExecutionContext| -> Result<(), JobExecutionError> {
        panic!("boom")
    });
    fixture.job_listener(RecordingJobListener::new("jl", fixture.log.clone()));

    let shell = fixture.run(once());

    assert_eq!(shell.state(), ShellState::Completed);
    assert_eq!(fixture.log.matching("jl:was_executed"), vec!["jl:was_executed:DEFAULT.j:failed"]);
    assert_eq!(
        fixture.log.matching("scheduler:error"),
        vec!["scheduler:error:job DEFAULT.j panicked"]
    );
    assert_eq!(fixture.core.jobs_executed(), 1);
}

#[test]
fn unschedule_request_maps_to_instruction() {
    let fixture = Fixture::new().with_job(|_: &mut JobExecutionContext| {
        Err(JobExecutionError::new("stop").unschedule_all_triggers())
    });

    fixture.run(repeating());

    assert_eq!(
        fixture.store.completions(),
        vec![(
            TriggerKey::new("t"),
            CompletedExecutionInstruction::SetAllJobsOfTriggerGroupComplete
        )]
    );
}

#[test]
fn initialize_failure_is_reported() {
    let fixture = Fixture::new();
    let mut shell = fixture.shell(once());

    let err = shell.initialize().unwrap_err();

    assert!(matches!(err, SchedulerError::UnknownJobType(name) if name == "work"));
    assert_eq!(shell.state(), ShellState::Aborted);
    assert_eq!(
        fixture.log.matching("scheduler:error"),
        vec!["scheduler:error:unable to instantiate job DEFAULT.j for trigger DEFAULT.t"]
    );
}

#[test]
fn run_without_initialize_aborts() {
    let fixture = Fixture::new().with_job(ok);
    let mut shell = fixture.shell(once());
    shell.run();

    assert_eq!(shell.state(), ShellState::Aborted);
    assert!(fixture.store.completions().is_empty());
    assert_eq!(fixture.log.matching("scheduler:error").len(), 1);
}

struct RecordingBoundary {
    log: EventLog,
    reject: bool,
}

impl ExecutionBoundary for RecordingBoundary {
    fn begin(&self, _context: &JobExecutionContext) -> Result<(), SchedulerError> {
        self.log.push("boundary:begin");
        if self.reject {
            return Err(SchedulerError::Boundary("no transaction".to_string()));
        }
        Ok(())
    }

    fn complete(&self, _context: &JobExecutionContext, successful: bool) {
        self.log.push(format!("boundary:complete:{successful}"));
    }
}

#[test]
fn boundary_wraps_each_attempt() {
    let fixture = Fixture::new().with_job(|_: &mut JobExecutionContext| {
        Err(JobExecutionError::new("failed"))
    });
    fixture.core.set_boundary(Arc::new(RecordingBoundary {
        log: fixture.log.clone(),
        reject: false,
    }));

    fixture.run(repeating());

    assert_eq!(
        fixture.log.matching("boundary"),
        vec!["boundary:begin", "boundary:complete:false"]
    );
}

#[test]
fn boundary_rejection_skips_execution() {
    let fixture = Fixture::new().with_job(ok);
    fixture.core.set_boundary(Arc::new(RecordingBoundary {
        log: fixture.log.clone(),
        reject: true,
    }));
    fixture.job_listener(RecordingJobListener::new("jl", fixture.log.clone()));

    let shell = fixture.run(once());

    assert_eq!(shell.state(), ShellState::Aborted);
    assert!(fixture.log.matching("jl:").is_empty());
    assert_eq!(
        fixture.store.completions(),
        vec![(TriggerKey::new("t"), CompletedExecutionInstruction::Noop)]
    );
}

#[test]
fn run_logs_within_shell_span() {
    let fixture = Fixture::new().with_job(ok);
    let (logs, _) = with_tracing(|| fixture.run(once()));

    assert!(logs.contains("shell.run"), "{logs}");
    assert!(logs.contains("trigger=DEFAULT.t"), "{logs}");
    assert!(logs.contains("job completed"), "{logs}");
}

#[test]
fn failed_job_logs_warning() {
    let fixture = Fixture::new().with_job(|_: &mut JobExecutionContext| {
        Err(JobExecutionError::new("disk full"))
    });
    let (logs, _) = with_tracing(|| fixture.run(once()));

    assert!(logs.contains("WARN"), "{logs}");
    assert!(logs.contains("error=disk full"), "{logs}");
}

#[test]
fn panicking_completion_logic_degrades_to_noop() {
    let fixture = Fixture::new().with_job(ok);
    let shell = fixture.shell(once());

    let instruction = shell.guard_trigger_logic(&once(), || panic!("bad arithmetic"));

    assert_eq!(instruction, CompletedExecutionInstruction::Noop);
    assert_eq!(
        fixture.log.matching("scheduler:error"),
        vec!["scheduler:error:trigger completion logic failed"]
    );
}

#[test]
fn shutdown_handle_reaches_the_shell() {
    let fixture = Fixture::new().with_job(ok);
    let shell = fixture.shell(once());
    let handle = shell.shutdown_handle();

    assert!(!shell.shutdown_pending());
    handle.request();
    assert!(shell.shutdown_pending());
}

#[test]
fn passivate_lets_go_of_the_scheduler() {
    let fixture = Fixture::new().with_job(ok);
    let shell = fixture.run(once());
    let held = Arc::strong_count(&fixture.core);

    shell.passivate();

    assert_eq!(Arc::strong_count(&fixture.core), held - 1);
}
