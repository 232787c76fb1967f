//! Shared harness for scheduler specs

pub use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
pub use kairos_core::{
    CompletedExecutionInstruction, JobDetail, JobExecutionError, JobKey, Matcher, SimpleSchedule,
    SystemClock, Trigger, TriggerKey, TriggerState,
};
pub use kairos_engine::{
    Job, JobExecutionContext, JobListener, JobType, ListenerError, Scheduler, SchedulerConfig,
    SchedulerError, SchedulerListener, TriggerListener,
};
pub use kairos_storage::RamJobStore;
pub use std::sync::atomic::{AtomicUsize, Ordering};
pub use std::sync::{Arc, Mutex};
pub use std::time::Duration;

/// Listener that records every callback as a short string
#[derive(Clone, Default)]
pub struct Recorder {
    name: String,
    veto: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn vetoing(mut self) -> Self {
        self.veto = true;
        self
    }

    fn push(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

impl JobListener for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn job_to_be_executed(&self, context: &JobExecutionContext) -> Result<(), ListenerError> {
        self.push(format!("job:to_be_executed:{}", context.job_detail().key));
        Ok(())
    }

    fn job_execution_vetoed(&self, context: &JobExecutionContext) -> Result<(), ListenerError> {
        self.push(format!("job:vetoed:{}", context.job_detail().key));
        Ok(())
    }

    fn job_was_executed(
        &self,
        context: &JobExecutionContext,
        error: Option<&JobExecutionError>,
    ) -> Result<(), ListenerError> {
        match error {
            Some(e) => self.push(format!("job:failed:{}:{}", context.job_detail().key, e)),
            None => self.push(format!("job:executed:{}", context.job_detail().key)),
        }
        Ok(())
    }
}

impl TriggerListener for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn trigger_fired(
        &self,
        trigger: &Trigger,
        _context: &JobExecutionContext,
    ) -> Result<(), ListenerError> {
        self.push(format!(
            "trigger:fired:{}:{}",
            trigger.key, trigger.times_triggered
        ));
        Ok(())
    }

    fn veto_job_execution(
        &self,
        _trigger: &Trigger,
        _context: &JobExecutionContext,
    ) -> Result<bool, ListenerError> {
        Ok(self.veto)
    }

    fn trigger_misfired(&self, trigger: &Trigger) -> Result<(), ListenerError> {
        self.push(format!("trigger:misfired:{}", trigger.key));
        Ok(())
    }

    fn trigger_complete(
        &self,
        trigger: &Trigger,
        _context: &JobExecutionContext,
        instruction: CompletedExecutionInstruction,
    ) -> Result<(), ListenerError> {
        self.push(format!("trigger:complete:{}:{}", trigger.key, instruction));
        Ok(())
    }
}

impl SchedulerListener for Recorder {
    fn trigger_finalized(&self, trigger: &Trigger) {
        self.push(format!("scheduler:finalized:{}", trigger.key));
    }

    fn job_deleted(&self, key: &JobKey) {
        self.push(format!("scheduler:job_deleted:{key}"));
    }

    fn scheduler_error(&self, message: &str, _error: &SchedulerError) {
        self.push(format!("scheduler:error:{message}"));
    }
}

/// Job that counts its executions
pub struct Counting(pub Arc<AtomicUsize>);

impl Job for Counting {
    fn execute(&self, _context: &mut JobExecutionContext) -> Result<(), JobExecutionError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A started scheduler over an in-memory store, observed by one recorder
pub struct Harness {
    pub scheduler: Scheduler<SystemClock>,
    pub store: Arc<RamJobStore>,
    pub events: Recorder,
    pub executions: Arc<AtomicUsize>,
}

impl Harness {
    /// Must be called inside a tokio runtime
    pub fn start() -> Self {
        let store = Arc::new(RamJobStore::new());
        let scheduler =
            Scheduler::new(SchedulerConfig::default(), store.clone(), SystemClock).unwrap();
        let executions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&executions);
        scheduler.register_job_type(JobType::new("count", move || {
            Counting(Arc::clone(&counter))
        }));
        let events = Recorder::new("recorder");
        scheduler
            .listeners()
            .add_scheduler_listener(Arc::new(events.clone()));
        scheduler.start().unwrap();
        Self {
            scheduler,
            store,
            events,
            executions,
        }
    }

    pub fn watch_jobs(&self) {
        self.scheduler
            .listeners()
            .add_job_listener(Arc::new(self.events.clone()), vec![])
            .unwrap();
    }

    pub fn watch_triggers(&self, listener: Recorder) {
        self.scheduler
            .listeners()
            .add_trigger_listener(Arc::new(listener), vec![])
            .unwrap();
    }

    /// Poll until `done` holds, failing after five seconds
    pub async fn until(&self, done: impl Fn(&Self) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !done(self) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    pub async fn stop(self) {
        self.scheduler.shutdown(true).await;
    }
}

pub fn job(name: &str) -> JobDetail {
    JobDetail::new(JobKey::new(name), "count")
}

/// One-shot trigger due now
pub fn once(name: &str, job: &str) -> Trigger {
    Trigger::builder(TriggerKey::new(name))
        .for_job(JobKey::new(job))
        .start_at(Utc::now())
        .build()
        .unwrap()
}
