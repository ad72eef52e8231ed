use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use jiff::Timestamp;

use crate::jobs::context::JobContext;
use crate::jobs::error::{JobError, JobResult, Stage};
use crate::jobs::handler::{HandlerResult, JobHandler};
use crate::jobs::record::JobRecord;
use crate::jobs::registry::HandlerResolver;
use crate::jobs::types::JobStatus;

/// Executes a single job through the setup/run/teardown protocol
///
/// Resolution failures and handler faults both leave the record in
/// `Error` and are returned to the caller; isolating one job from the rest
/// of a batch is the scheduler's job.
#[derive(Clone)]
pub struct JobDriver {
    resolver: Arc<dyn HandlerResolver>,
}

impl JobDriver {
    pub fn new(resolver: Arc<dyn HandlerResolver>) -> Self {
        Self { resolver }
    }

    pub fn execute(&self, record: &JobRecord) -> JobResult<()> {
        let job_type = record.job_type();
        let context = JobContext::new(record.id(), job_type, record.shared_args());

        // Factories are handler code too; a panic there is a construct fault.
        let resolved = panic::catch_unwind(AssertUnwindSafe(|| {
            self.resolver.resolve(job_type, context)
        }))
        .unwrap_or_else(|payload| Err(panic_fault(job_type, Stage::Construct, payload.as_ref())));

        let mut handler = match resolved {
            Ok(handler) => handler,
            Err(e) => {
                record.set_status(JobStatus::Error);
                return Err(e);
            }
        };

        let args = serde_json::to_string(record.args()).unwrap_or_else(|_| "{}".to_string());
        tracing::info!(
            pid = std::process::id(),
            timestamp = %Timestamp::now(),
            job_id = %record.id(),
            job_type = %job_type,
            args = %args,
            "Job is executing"
        );

        handler.env_mut().context_mut().mark_started();

        match run_lifecycle(handler.as_mut(), record) {
            Ok(()) => {
                tracing::debug!(
                    pid = std::process::id(),
                    timestamp = %Timestamp::now(),
                    job_id = %record.id(),
                    job_type = %job_type,
                    duration_ms = record.duration().map(|d| d.as_millis()).unwrap_or_default(),
                    "Job completed"
                );
                Ok(())
            }
            Err(e) => {
                handler.env_mut().context_mut().set_status(JobStatus::Error);
                record.set_status(JobStatus::Error);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for JobDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDriver").finish_non_exhaustive()
    }
}

fn run_lifecycle(handler: &mut dyn JobHandler, record: &JobRecord) -> JobResult<()> {
    let job_type = record.job_type();

    run_stage(handler, job_type, Stage::Setup, |h| h.setup())?;
    {
        let ctx = handler.env_mut().context_mut();
        if ctx.status() == JobStatus::Received {
            ctx.begin();
        }
        record.set_status(ctx.status());
    }

    run_stage(handler, job_type, Stage::Run, |h| h.run())?;
    run_stage(handler, job_type, Stage::Teardown, |h| h.teardown())?;

    let ctx = handler.env_mut().context_mut();
    if ctx.status() != JobStatus::Complete {
        ctx.complete();
    }
    record.set_duration(ctx.duration().unwrap_or_default());
    record.set_status(ctx.status());

    Ok(())
}

fn run_stage<F>(handler: &mut dyn JobHandler, job_type: &str, stage: Stage, step: F) -> JobResult<()>
where
    F: FnOnce(&mut dyn JobHandler) -> HandlerResult,
{
    match panic::catch_unwind(AssertUnwindSafe(|| step(&mut *handler))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(JobError::fault(job_type, stage, e)),
        Err(payload) => Err(panic_fault(job_type, stage, payload.as_ref())),
    }
}

fn panic_fault(job_type: &str, stage: Stage, payload: &(dyn Any + Send)) -> JobError {
    JobError::fault(
        job_type,
        stage,
        anyhow::anyhow!("handler panicked: {}", panic_message(payload)),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
