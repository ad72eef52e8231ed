use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::jobs::error::JobError;

/// Named job arguments, kept in insertion order
pub type JobArgs = Map<String, JsonValue>;

/// Job lifecycle status
///
/// `Received` is assigned at submission. `Complete` and `Error` are terminal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    #[default]
    Received,
    InProgress,
    Complete,
    Error,
}

impl JobStatus {
    /// Wire representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Received => "RECEIVED",
            JobStatus::InProgress => "INPROGRESS",
            JobStatus::Complete => "COMPLETE",
            JobStatus::Error => "ERROR",
        }
    }

    /// Whether no further transition may leave this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RECEIVED" => Ok(JobStatus::Received),
            "INPROGRESS" => Ok(JobStatus::InProgress),
            "COMPLETE" => Ok(JobStatus::Complete),
            "ERROR" => Ok(JobStatus::Error),
            _ => Err(JobError::InvalidStatus(s.to_string())),
        }
    }
}
