use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use jiff::Timestamp;

use crate::jobs::error::{JobError, JobResult};
use crate::jobs::types::{JobArgs, JobStatus};

/// A job scheduled for deferred execution
///
/// Identity, type and arguments never change after construction. Status and
/// the recorded duration are interior-mutable so the scheduler, the driver
/// and any outstanding [`JobHandle`](crate::jobs::JobHandle) observe the same
/// live values.
#[derive(Debug)]
pub struct JobRecord {
    id: OnceLock<String>,
    job_type: String,
    args: Arc<JobArgs>,
    submitted_at: Timestamp,
    state: RwLock<RecordState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct RecordState {
    status: JobStatus,
    duration: Option<Duration>,
}

impl JobRecord {
    pub fn new(job_type: impl Into<String>, args: JobArgs) -> Self {
        Self {
            id: OnceLock::new(),
            job_type: job_type.into(),
            args: Arc::new(args),
            submitted_at: Timestamp::now(),
            state: RwLock::new(RecordState::default()),
        }
    }

    /// Job id, empty until the scheduler assigns one
    pub fn id(&self) -> &str {
        self.id.get().map(String::as_str).unwrap_or_default()
    }

    /// Assign the job id. Only the first assignment is accepted.
    pub fn set_id(&self, id: impl Into<String>) -> JobResult<()> {
        self.id
            .set(id.into())
            .map_err(|_| JobError::IdAlreadyAssigned(self.id().to_string()))
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn args(&self) -> &JobArgs {
        &self.args
    }

    pub(crate) fn shared_args(&self) -> Arc<JobArgs> {
        Arc::clone(&self.args)
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    pub fn status(&self) -> JobStatus {
        self.state.read().unwrap_or_else(PoisonError::into_inner).status
    }

    pub fn set_status(&self, status: JobStatus) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .status = status;
    }

    /// Execution time recorded at teardown
    pub fn duration(&self) -> Option<Duration> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).duration
    }

    pub(crate) fn set_duration(&self, duration: Duration) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .duration = Some(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> JobArgs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_new_record_has_no_id() {
        let record = JobRecord::new("noop", JobArgs::new());
        assert_eq!(record.id(), "");
        assert_eq!(record.job_type(), "noop");
        assert_eq!(record.status(), JobStatus::Received);
        assert!(record.duration().is_none());
    }

    #[test]
    fn test_id_is_write_once() {
        let record = JobRecord::new("noop", JobArgs::new());
        record.set_id("localjob-1").unwrap();

        let err = record.set_id("localjob-2").unwrap_err();
        assert!(matches!(err, JobError::IdAlreadyAssigned(ref id) if id == "localjob-1"));
        assert_eq!(record.id(), "localjob-1");
    }

    #[test]
    fn test_args_keep_insertion_order() {
        let record = JobRecord::new("noop", args(json!({"zeta": 1, "alpha": 2, "mid": 3})));
        let keys: Vec<&str> = record.args().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_status_setter_is_unconstrained() {
        let record = JobRecord::new("noop", JobArgs::new());
        record.set_status(JobStatus::Complete);
        record.set_status(JobStatus::InProgress);
        assert_eq!(record.status(), JobStatus::InProgress);
    }
}
