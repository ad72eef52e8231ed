//! Structured logger handed to job handlers
//!
//! Every event carries the process id, a timestamp and the job identity in
//! addition to the handler-supplied context.

use std::str::FromStr;

use jiff::Timestamp;
use serde_json::{Map, Value as JsonValue};

use crate::jobs::error::JobError;

/// Severity of a handler log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

impl FromStr for LogLevel {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "notice" => Ok(LogLevel::Notice),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(JobError::InvalidLogLevel(other.to_string())),
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    job_type: String,
}

impl JobLogger {
    pub fn new(job_id: impl Into<String>, job_type: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            job_type: job_type.into(),
        }
    }

    pub fn log(&self, level: LogLevel, message: &str, context: Map<String, JsonValue>) {
        let pid = std::process::id();
        let timestamp = Timestamp::now();
        let context = JsonValue::Object(context).to_string();

        // `notice` has no tracing counterpart; it is emitted at info with the
        // original severity kept in `severity`.
        match level {
            LogLevel::Debug => tracing::debug!(
                pid, %timestamp, job_id = %self.job_id, job_type = %self.job_type,
                severity = level.as_str(), %context, "{message}"
            ),
            LogLevel::Info | LogLevel::Notice => tracing::info!(
                pid, %timestamp, job_id = %self.job_id, job_type = %self.job_type,
                severity = level.as_str(), %context, "{message}"
            ),
            LogLevel::Warning => tracing::warn!(
                pid, %timestamp, job_id = %self.job_id, job_type = %self.job_type,
                severity = level.as_str(), %context, "{message}"
            ),
            LogLevel::Error => tracing::error!(
                pid, %timestamp, job_id = %self.job_id, job_type = %self.job_type,
                severity = level.as_str(), %context, "{message}"
            ),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, Map::new());
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, Map::new());
    }

    pub fn notice(&self, message: &str) {
        self.log(LogLevel::Notice, message, Map::new());
    }

    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message, Map::new());
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, Map::new());
    }
}
