use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;

use crate::jobs::types::{JobArgs, JobStatus};

/// Job execution context passed to handlers
///
/// One context is created per handler invocation and dropped when the
/// execution returns. It is the only way a handler sees its arguments.
#[derive(Debug, Clone)]
pub struct JobContext {
    job_id: String,
    job_type: String,
    data: Arc<JobArgs>,
    status: JobStatus,
    started_at: Instant,
    duration: Option<Duration>,
}

impl JobContext {
    pub fn new(job_id: impl Into<String>, job_type: impl Into<String>, data: Arc<JobArgs>) -> Self {
        Self {
            job_id: job_id.into(),
            job_type: job_type.into(),
            data,
            status: JobStatus::Received,
            started_at: Instant::now(),
            duration: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    /// Look up one argument, falling back to `default` when absent
    pub fn get<'a>(&'a self, name: &str, default: &'a JsonValue) -> &'a JsonValue {
        self.data.get(name).unwrap_or(default)
    }

    /// Look up one argument and deserialize it
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.data
            .get(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn data(&self) -> &JobArgs {
        &self.data
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }

    /// Restart the duration clock
    pub fn mark_started(&mut self) {
        self.started_at = Instant::now();
    }

    /// Move to `InProgress`
    pub fn begin(&mut self) {
        self.status = JobStatus::InProgress;
    }

    /// Move to `Complete` and fix the recorded duration
    pub fn complete(&mut self) {
        self.status = JobStatus::Complete;
        self.duration = Some(self.started_at.elapsed());
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}
