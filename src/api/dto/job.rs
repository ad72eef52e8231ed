//! Job submission DTOs.

use serde::{Deserialize, Serialize};

use crate::jobs::{JobArgs, JobSnapshot, JobStatus};

/// Request body for `POST /jobs`.
#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitJobRequest {
    #[serde(rename = "type")]
    pub job_type: String,

    #[serde(default)]
    pub args: JobArgs,
}

/// The job as it stands when the response is written, always `RECEIVED`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub id: String,
    pub status: JobStatus,
}

impl From<JobSnapshot> for SubmitJobResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            id: snapshot.id,
            status: snapshot.status,
        }
    }
}
