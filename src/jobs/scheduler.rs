use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use jiff::Timestamp;
use serde::Serialize;
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::jobs::driver::JobDriver;
use crate::jobs::handle::JobHandle;
use crate::jobs::hooks::{LifecycleHooks, OutputFlusher};
use crate::jobs::record::JobRecord;
use crate::jobs::types::{JobArgs, JobStatus};

/// Outcome counts of one drain
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    pub executed: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Collects jobs during a unit of work and runs them once it ends
///
/// Jobs run one at a time in submission order. A failing job is logged and
/// the drain moves on to the next one.
pub struct Scheduler {
    driver: JobDriver,
    config: QueueConfig,
    pending: Mutex<Vec<Arc<JobRecord>>>,
    installed: AtomicBool,
}

impl Scheduler {
    pub fn new(driver: JobDriver, config: QueueConfig) -> Self {
        Self {
            driver,
            config,
            pending: Mutex::new(Vec::new()),
            installed: AtomicBool::new(false),
        }
    }

    /// Queue a job for the end of the unit of work
    ///
    /// Never executes anything; the returned handle stays live and reports
    /// the final status once the drain has run.
    pub fn submit(&self, job_type: impl Into<String>, args: JobArgs) -> JobHandle {
        let record = Arc::new(JobRecord::new(job_type, args));
        if let Err(e) = record.set_id(self.next_id()) {
            tracing::warn!(
                pid = std::process::id(),
                timestamp = %Timestamp::now(),
                error = %e,
                "Fresh job record already had an id"
            );
        }
        record.set_status(JobStatus::Received);

        let args = serde_json::to_string(record.args()).unwrap_or_else(|_| "{}".to_string());
        tracing::info!(
            pid = std::process::id(),
            timestamp = %Timestamp::now(),
            job_id = %record.id(),
            job_type = %record.job_type(),
            args = %args,
            "Job has been scheduled"
        );

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&record));

        JobHandle::new(record)
    }

    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Bind the drain to the configured end-of-unit-of-work event
    ///
    /// Only the first call binds; later calls are ignored and return `false`.
    pub fn install(self: &Arc<Self>, hooks: &LifecycleHooks, flusher: Arc<dyn OutputFlusher>) -> bool {
        if self.installed.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                pid = std::process::id(),
                timestamp = %Timestamp::now(),
                event = %self.config.drain_event,
                "Scheduler hook already installed, ignoring"
            );
            return false;
        }

        let scheduler = Arc::clone(self);
        hooks.bind(self.config.drain_event.clone(), move || {
            scheduler.finish(flusher.as_ref());
        });

        tracing::debug!(
            pid = std::process::id(),
            timestamp = %Timestamp::now(),
            event = %self.config.drain_event,
            "Scheduler hook installed"
        );
        true
    }

    /// End-of-unit-of-work callback: flush output, then drain
    ///
    /// Returns `None` without touching the flusher when nothing is pending.
    pub fn finish(&self, flusher: &dyn OutputFlusher) -> Option<DrainSummary> {
        if self.pending_len() == 0 {
            return None;
        }

        if self.config.flush_before_drain {
            if let Err(e) = flusher.flush() {
                tracing::warn!(
                    pid = std::process::id(),
                    timestamp = %Timestamp::now(),
                    error = %e,
                    "Failed to flush output before drain"
                );
            }
        }

        Some(self.drain())
    }

    /// Execute every pending job exactly once, in submission order
    ///
    /// Jobs submitted while the drain runs are picked up after the ones
    /// already queued.
    pub fn drain(&self) -> DrainSummary {
        let mut summary = DrainSummary::default();

        loop {
            let batch = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
            if batch.is_empty() {
                break;
            }

            for record in batch {
                summary.executed += 1;
                match self.driver.execute(&record) {
                    Ok(()) => summary.completed += 1,
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(
                            pid = std::process::id(),
                            timestamp = %Timestamp::now(),
                            job_id = %record.id(),
                            job_type = %record.job_type(),
                            stage = e.stage().map(|s| s.as_str()).unwrap_or("resolve"),
                            error = %e,
                            error_details = ?e,
                            "Job failed to execute"
                        );
                    }
                }
            }
        }

        if summary.executed > 0 {
            tracing::info!(
                pid = std::process::id(),
                timestamp = %Timestamp::now(),
                executed = summary.executed,
                completed = summary.completed,
                failed = summary.failed,
                "Deferred jobs drained"
            );
        }

        summary
    }

    fn next_id(&self) -> String {
        format!("{}{}", self.config.id_prefix, Uuid::new_v4().simple())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("pending", &self.pending_len())
            .field("installed", &self.installed.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::context::JobContext;
    use crate::jobs::error::{JobError, JobResult};
    use crate::jobs::handler::{HandlerResult, JobEnv, JobHandler};
    use crate::jobs::hooks::NoopFlusher;
    use crate::jobs::registry::{HandlerResolver, JobRegistry};
    use proptest::prelude::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Weak;
    use std::sync::atomic::AtomicUsize;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Appends its job type to the journal and fails when asked to
    struct Recorder {
        env: JobEnv,
        journal: Journal,
    }

    impl JobHandler for Recorder {
        fn env(&self) -> &JobEnv {
            &self.env
        }

        fn env_mut(&mut self) -> &mut JobEnv {
            &mut self.env
        }

        fn run(&mut self) -> HandlerResult {
            self.journal
                .lock()
                .unwrap()
                .push(self.env.context().job_type().to_string());
            if self.env.context().get_as::<bool>("fail") == Some(true) {
                anyhow::bail!("asked to fail");
            }
            Ok(())
        }
    }

    fn registry(journal: &Journal, types: &[&str]) -> JobRegistry {
        let mut registry = JobRegistry::new();
        for job_type in types {
            let journal = Arc::clone(journal);
            registry.register_fn(*job_type, move |env| {
                Ok(Box::new(Recorder {
                    env,
                    journal: Arc::clone(&journal),
                }))
            });
        }
        registry
    }

    fn scheduler(journal: &Journal, types: &[&str]) -> Scheduler {
        let driver = JobDriver::new(Arc::new(registry(journal, types)));
        Scheduler::new(driver, QueueConfig::default())
    }

    fn args(value: serde_json::Value) -> JobArgs {
        value.as_object().cloned().unwrap_or_default()
    }

    /// Counts resolution attempts and resolves nothing
    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl HandlerResolver for CountingResolver {
        fn resolve(&self, job_type: &str, _context: JobContext) -> JobResult<Box<dyn JobHandler>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(JobError::UnresolvableType(job_type.to_string()))
        }
    }

    #[test]
    fn test_submit_returns_received_handle() {
        let journal = Journal::default();
        let scheduler = scheduler(&journal, &["a"]);

        let handle = scheduler.submit("a", JobArgs::new());

        assert!(handle.id().starts_with("localjob"));
        assert_eq!(handle.status(), JobStatus::Received);
        assert_eq!(scheduler.pending_len(), 1);
        assert!(journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drain_runs_in_submission_order() {
        let journal = Journal::default();
        let scheduler = scheduler(&journal, &["A", "B", "C"]);

        for job_type in ["A", "B", "C"] {
            scheduler.submit(job_type, JobArgs::new());
        }
        let summary = scheduler.drain();

        assert_eq!(*journal.lock().unwrap(), vec!["A", "B", "C"]);
        assert_eq!(summary, DrainSummary { executed: 3, completed: 3, failed: 0 });
    }

    #[test]
    fn test_failing_job_does_not_stop_batch() {
        let journal = Journal::default();
        let scheduler = scheduler(&journal, &["A", "B"]);

        let failing = scheduler.submit("A", args(json!({"fail": true})));
        let next = scheduler.submit("B", JobArgs::new());
        let summary = scheduler.drain();

        assert_eq!(failing.status(), JobStatus::Error);
        assert_eq!(next.status(), JobStatus::Complete);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed, 1);
    }

    #[test]
    fn test_unresolvable_job_does_not_affect_siblings() {
        let journal = Journal::default();
        let scheduler = scheduler(&journal, &["A", "C"]);

        let first = scheduler.submit("A", JobArgs::new());
        let missing = scheduler.submit("nope", JobArgs::new());
        let last = scheduler.submit("C", JobArgs::new());
        scheduler.drain();

        assert_eq!(first.status(), JobStatus::Complete);
        assert_eq!(missing.status(), JobStatus::Error);
        assert_eq!(last.status(), JobStatus::Complete);
        assert_eq!(*journal.lock().unwrap(), vec!["A", "C"]);
    }

    #[test]
    fn test_empty_drain_resolves_nothing() {
        let resolver = Arc::new(CountingResolver::default());
        let scheduler = Scheduler::new(JobDriver::new(resolver.clone()), QueueConfig::default());

        assert_eq!(scheduler.drain(), DrainSummary::default());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_second_drain_executes_nothing() {
        let journal = Journal::default();
        let scheduler = scheduler(&journal, &["A"]);

        scheduler.submit("A", JobArgs::new());
        assert_eq!(scheduler.drain().executed, 1);
        assert_eq!(scheduler.drain().executed, 0);
        assert_eq!(journal.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handles_observe_terminal_status() {
        let journal = Journal::default();
        let scheduler = scheduler(&journal, &["A"]);

        let handles: Vec<JobHandle> = (0..3)
            .map(|i| scheduler.submit("A", args(json!({"fail": i == 1}))))
            .collect();
        scheduler.drain();

        for handle in &handles {
            assert!(handle.status().is_terminal());
        }
        assert_eq!(handles[1].status(), JobStatus::Error);
    }

    #[test]
    fn test_jobs_submitted_during_drain_run_last() {
        let journal = Journal::default();
        let mut registry = registry(&journal, &["A", "B"]);
        let slot: Arc<Mutex<Weak<Scheduler>>> = Arc::new(Mutex::new(Weak::new()));
        let spawner_slot = Arc::clone(&slot);
        let spawner_journal = Arc::clone(&journal);
        registry.register_fn("spawner", move |env| {
            spawner_journal.lock().unwrap().push("spawner".to_string());
            if let Some(scheduler) = spawner_slot.lock().unwrap().upgrade() {
                scheduler.submit("B", JobArgs::new());
            }
            Ok(Box::new(Recorder {
                env,
                journal: Arc::new(Mutex::new(Vec::new())),
            }))
        });
        let scheduler = Arc::new(Scheduler::new(
            JobDriver::new(Arc::new(registry)),
            QueueConfig::default(),
        ));
        *slot.lock().unwrap() = Arc::downgrade(&scheduler);

        scheduler.submit("spawner", JobArgs::new());
        scheduler.submit("A", JobArgs::new());
        let summary = scheduler.drain();

        assert_eq!(*journal.lock().unwrap(), vec!["spawner", "A", "B"]);
        assert_eq!(summary.executed, 3);
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn test_install_binds_once_and_hook_drains() {
        let journal = Journal::default();
        let scheduler = Arc::new(scheduler(&journal, &["A"]));
        let hooks = LifecycleHooks::new();

        assert!(scheduler.install(&hooks, Arc::new(NoopFlusher)));
        assert!(!scheduler.install(&hooks, Arc::new(NoopFlusher)));

        let handle = scheduler.submit("A", JobArgs::new());
        assert_eq!(hooks.fire(&QueueConfig::default().drain_event), 1);

        assert_eq!(handle.status(), JobStatus::Complete);
        assert_eq!(*journal.lock().unwrap(), vec!["A"]);
    }

    struct CountingFlusher(AtomicUsize);

    impl OutputFlusher for CountingFlusher {
        fn flush(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_finish_skips_flush_when_nothing_pending() {
        let journal = Journal::default();
        let scheduler = scheduler(&journal, &["A"]);
        let flusher = CountingFlusher(AtomicUsize::new(0));

        assert!(scheduler.finish(&flusher).is_none());
        assert_eq!(flusher.0.load(Ordering::SeqCst), 0);

        scheduler.submit("A", JobArgs::new());
        let summary = scheduler.finish(&flusher).unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(flusher.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finish_respects_flush_toggle() {
        let journal = Journal::default();
        let driver = JobDriver::new(Arc::new(registry(&journal, &["A"])));
        let config = QueueConfig {
            flush_before_drain: false,
            ..QueueConfig::default()
        };
        let scheduler = Scheduler::new(driver, config);
        let flusher = CountingFlusher(AtomicUsize::new(0));

        scheduler.submit("A", JobArgs::new());
        scheduler.finish(&flusher);

        assert_eq!(flusher.0.load(Ordering::SeqCst), 0);
        assert_eq!(journal.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_panicking_factory_does_not_stop_batch() {
        let journal = Journal::default();
        let mut registry = registry(&journal, &["A"]);
        registry.register_fn("boom", |_env| panic!("factory panicked"));
        let scheduler = Scheduler::new(JobDriver::new(Arc::new(registry)), QueueConfig::default());

        let bad = scheduler.submit("boom", JobArgs::new());
        let next = scheduler.submit("A", JobArgs::new());
        let summary = scheduler.drain();

        assert_eq!(summary, DrainSummary { executed: 2, completed: 1, failed: 1 });
        assert_eq!(bad.status(), JobStatus::Error);
        assert_eq!(next.status(), JobStatus::Complete);
        assert_eq!(*journal.lock().unwrap(), vec!["A"]);
    }

    /// Field names of every event seen, keyed by target
    #[derive(Clone, Default)]
    struct FieldCapture(Arc<Mutex<Vec<(String, Vec<&'static str>)>>>);

    impl<S: tracing::Subscriber> Layer<S> for FieldCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let fields = event.fields().map(|field| field.name()).collect();
            self.0
                .lock()
                .unwrap()
                .push((event.metadata().target().to_string(), fields));
        }
    }

    #[test]
    fn test_pipeline_events_carry_pid_and_timestamp() {
        let journal = Journal::default();
        let scheduler = Arc::new(scheduler(&journal, &["A"]));
        let capture = FieldCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            let hooks = LifecycleHooks::new();
            scheduler.install(&hooks, Arc::new(NoopFlusher));
            scheduler.submit("A", JobArgs::new());
            scheduler.submit("A", args(json!({"fail": true})));
            scheduler.submit("missing", JobArgs::new());
            hooks.fire(&QueueConfig::default().drain_event);
        });

        let events = capture.0.lock().unwrap();
        let pipeline: Vec<_> = events
            .iter()
            .filter(|(target, _)| target.starts_with("deferred_jobs::jobs"))
            .collect();
        // install, 3 submits, 2 starts, 1 completion, 2 failures, summary
        assert!(pipeline.len() >= 10, "captured {pipeline:?}");
        for (target, fields) in pipeline {
            for required in ["message", "pid", "timestamp"] {
                assert!(fields.contains(&required), "{target} event lacks {required}: {fields:?}");
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_ids_are_unique_and_non_empty(count in 1usize..50) {
            let journal = Journal::default();
            let scheduler = scheduler(&journal, &[]);

            let ids: HashSet<String> = (0..count)
                .map(|_| scheduler.submit("any", JobArgs::new()).id().to_string())
                .collect();

            prop_assert_eq!(ids.len(), count);
            prop_assert!(ids.iter().all(|id| !id.is_empty()));
        }

        #[test]
        fn prop_drain_preserves_submission_order(
            picks in prop::collection::vec(0usize..4, 0..20)
        ) {
            let names = ["A", "B", "C", "D"];
            let journal = Journal::default();
            let scheduler = scheduler(&journal, &names);

            let expected: Vec<String> = picks.iter().map(|i| names[*i].to_string()).collect();
            for job_type in &expected {
                scheduler.submit(job_type.clone(), JobArgs::new());
            }
            let summary = scheduler.drain();

            prop_assert_eq!(&*journal.lock().unwrap(), &expected);
            prop_assert_eq!(summary.executed, expected.len());
        }
    }
}
