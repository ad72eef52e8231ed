use std::sync::Arc;

use serde::Serialize;

use crate::jobs::record::JobRecord;
use crate::jobs::types::JobStatus;

/// Read-only view of a submitted job
///
/// Shares the record with the scheduler, so `status()` always reports the
/// current value, including changes made after the drain ran.
#[derive(Debug, Clone)]
pub struct JobHandle {
    record: Arc<JobRecord>,
}

impl JobHandle {
    pub(crate) fn new(record: Arc<JobRecord>) -> Self {
        Self { record }
    }

    pub fn id(&self) -> &str {
        self.record.id()
    }

    pub fn status(&self) -> JobStatus {
        self.record.status()
    }

    /// Point-in-time copy suitable for serialization
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id().to_string(),
            status: self.status(),
        }
    }
}

/// Serializable `{id, status}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
}
