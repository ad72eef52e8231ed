//! Dispatches a parsed command to its handler

use super::handlers::{RunCommandHandler, ServeCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};

/// Execute the command in `cli` with merged `settings`
///
/// No subcommand means `serve`.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    match cli.command {
        Some(Commands::Serve { dry_run, .. }) => {
            ServeCommandHandler::new(settings).execute(dry_run).await
        }
        None => ServeCommandHandler::new(settings).execute(false).await,
        Some(Commands::Run { ref jobs }) => {
            let jobs = jobs.clone();
            // Handlers block; keep them off the runtime workers.
            tokio::task::spawn_blocking(move || {
                let mut stdout = std::io::stdout().lock();
                RunCommandHandler::new(settings).execute(&jobs, &mut stdout)
            })
            .await
            .map_err(|e| AppError::from(anyhow::Error::new(e).context("Run command panicked")))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_execute_serve_dry_run() {
        let cli = Cli::try_parse_from(["deferred-jobs", "serve", "--dry-run"]).unwrap();
        assert!(execute_command(&cli, Settings::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_serve_dry_run_invalid() {
        let cli = Cli::try_parse_from(["deferred-jobs", "serve", "--dry-run"]).unwrap();
        let mut settings = Settings::default();
        settings.queue.id_prefix = "has space".to_string();

        let err = execute_command(&cli, settings).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration { ref key, .. } if key == "queue.id_prefix"));
    }

    #[tokio::test]
    async fn test_execute_run() {
        let cli = Cli::try_parse_from(["deferred-jobs", "run", "--job", "delay={\"millis\":1}"])
            .unwrap();
        assert!(execute_command(&cli, Settings::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_run_reports_failed_jobs() {
        let cli = Cli::try_parse_from(["deferred-jobs", "run", "-j", "missing"]).unwrap();
        let err = execute_command(&cli, Settings::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Internal { .. }));
    }
}
