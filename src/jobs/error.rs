use thiserror::Error;

/// Lifecycle step in which a handler failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Construct,
    Setup,
    Run,
    Teardown,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Construct => "construct",
            Stage::Setup => "setup",
            Stage::Run => "run",
            Stage::Teardown => "teardown",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("The job type '{0}' cannot be found")]
    UnresolvableType(String),

    #[error("The job type '{0}' is not a runnable job handler")]
    NotRunnable(String),

    #[error("Job '{job_type}' failed during {stage}: {source}")]
    HandlerFault {
        job_type: String,
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("Job id already assigned: {0}")]
    IdAlreadyAssigned(String),

    #[error("Invalid job status: {0}")]
    InvalidStatus(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JobError {
    pub fn fault(job_type: impl Into<String>, stage: Stage, source: anyhow::Error) -> Self {
        JobError::HandlerFault {
            job_type: job_type.into(),
            stage,
            source,
        }
    }

    /// Lifecycle stage of a handler fault, if this is one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            JobError::HandlerFault { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the failure happened before any handler code ran
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, JobError::UnresolvableType(_) | JobError::NotRunnable(_))
    }
}

pub type JobResult<T> = Result<T, JobError>;
