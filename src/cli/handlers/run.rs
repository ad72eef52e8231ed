//! Run command handler
//!
//! Treats one CLI invocation as a unit of work: jobs from `--job` are
//! submitted, their handles printed, and the drain fires once that output
//! has been written.

use std::io::Write;
use std::sync::Arc;

use crate::cli::parser::JobSpec;
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::tasks::builtin_registry;
use crate::jobs::{JobDriver, JobHandle, JobStatus, LifecycleHooks, Scheduler, StdoutFlusher};

pub struct RunCommandHandler {
    config: Settings,
}

impl RunCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Submit `jobs` in order, then fire the drain event
    ///
    /// Writes a tab-separated `id type status` line per job before the drain
    /// and again after it.
    ///
    /// # Errors
    ///
    /// Fails after every job has run if any of them ended in `ERROR`.
    pub fn execute<W: Write>(&self, jobs: &[JobSpec], out: &mut W) -> AppResult<()> {
        let registry = builtin_registry(self.config.host.clone().into_host_context());
        let driver = JobDriver::new(Arc::new(registry));
        let scheduler = Arc::new(Scheduler::new(driver, self.config.queue.clone()));

        let hooks = LifecycleHooks::new();
        scheduler.install(&hooks, Arc::new(StdoutFlusher));

        let handles: Vec<(JobHandle, &str)> = jobs
            .iter()
            .map(|spec| {
                let handle = scheduler.submit(spec.job_type.clone(), spec.args.clone());
                (handle, spec.job_type.as_str())
            })
            .collect();

        for (handle, job_type) in &handles {
            writeln!(out, "{}\t{}\t{}", handle.id(), job_type, handle.status())?;
        }
        out.flush()?;

        hooks.fire(&self.config.queue.drain_event);

        writeln!(out)?;
        for (handle, job_type) in &handles {
            writeln!(out, "{}\t{}\t{}", handle.id(), job_type, handle.status())?;
        }

        let failed = handles
            .iter()
            .filter(|(handle, _)| handle.status() == JobStatus::Error)
            .count();
        if failed > 0 {
            return Err(AppError::from(anyhow::anyhow!(
                "{} of {} jobs failed",
                failed,
                handles.len()
            )));
        }

        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::validation::parse_job_spec;

    fn run(specs: &[&str]) -> (AppResult<()>, Vec<String>) {
        let jobs: Vec<JobSpec> = specs.iter().map(|s| parse_job_spec(s).unwrap()).collect();
        let mut out = Vec::new();
        let result = RunCommandHandler::new(Settings::default()).execute(&jobs, &mut out);
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (result, lines)
    }

    #[test]
    fn test_prints_received_then_final_status() {
        let (result, lines) = run(&["log_message={\"message\":\"hello\"}", "delay={\"millis\":1}"]);

        assert!(result.is_ok());
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("localjob"));
        assert!(lines[0].ends_with("\tlog_message\tRECEIVED"));
        assert!(lines[1].ends_with("\tdelay\tRECEIVED"));
        assert_eq!(lines[2], "");
        assert!(lines[3].ends_with("\tlog_message\tCOMPLETE"));
        assert!(lines[4].ends_with("\tdelay\tCOMPLETE"));

        let first_id = lines[0].split('\t').next().unwrap();
        assert!(lines[3].starts_with(first_id));
    }

    #[test]
    fn test_failure_does_not_stop_later_jobs() {
        let (result, lines) = run(&["unknown", "log_message", "delay"]);

        let err = result.unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("2 of 3 jobs failed"));

        assert!(lines[4].ends_with("\tunknown\tERROR"));
        // log_message without a message fails construction
        assert!(lines[5].ends_with("\tlog_message\tERROR"));
        assert!(lines[6].ends_with("\tdelay\tCOMPLETE"));
    }

    #[test]
    fn test_custom_id_prefix() {
        let mut config = Settings::default();
        config.queue.id_prefix = "cli-".to_string();
        let jobs = vec![parse_job_spec("delay").unwrap()];
        let mut out = Vec::new();

        RunCommandHandler::new(config).execute(&jobs, &mut out).unwrap();

        assert!(String::from_utf8(out).unwrap().starts_with("cli-"));
    }
}
