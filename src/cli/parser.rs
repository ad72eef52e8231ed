//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::jobs::JobArgs;

#[derive(Parser, Debug)]
#[command(name = "deferred-jobs")]
#[command(about = "Run jobs after the unit of work that queued them has finished")]
#[command(long_about = "
deferred-jobs queues jobs during a unit of work and executes them, one at a
time and in submission order, once the unit of work has ended. Over HTTP each
request is a unit of work; with `run` the whole process is.

EXAMPLES:
    # Start the HTTP host with default configuration
    deferred-jobs serve

    # Start on a custom address
    deferred-jobs serve --host 0.0.0.0 --port 8080

    # Check configuration without starting the server
    deferred-jobs serve --dry-run

    # Queue two jobs, print their handles, then run them
    deferred-jobs run --job 'log_message={\"message\":\"hello\"}' --job 'delay={\"millis\":50}'

    # Use a specific configuration file
    deferred-jobs --config /path/to/config.toml run --job delay
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Single configuration file, instead of the layered config directory
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Selects `{environment}.toml` [env: DEFERRED_APP_ENV]
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP host (the default)
    Serve {
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Treat this process as one unit of work
    ///
    /// Submits every job, prints the handles, flushes stdout, fires the drain
    /// event and prints each job's final status.
    Run {
        #[arg(
            short,
            long = "job",
            value_name = "TYPE[=JSON_ARGS]",
            required = true,
            value_parser = super::validation::parse_job_spec
        )]
        jobs: Vec<JobSpec>,
    },
}

/// One `--job` argument
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub job_type: String,
    pub args: JobArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
        .to_string()
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["deferred-jobs", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_default_behavior() {
        let cli = Cli::try_parse_from(["deferred-jobs"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from([
            "deferred-jobs",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                dry_run,
                ..
            }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
                assert!(dry_run);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn test_run_command_collects_jobs_in_order() {
        let cli = Cli::try_parse_from([
            "deferred-jobs",
            "run",
            "--job",
            r#"log_message={"message":"hi"}"#,
            "-j",
            "delay",
        ])
        .unwrap();

        let Some(Commands::Run { jobs }) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].job_type, "log_message");
        assert_eq!(jobs[0].args.get("message"), Some(&json!("hi")));
        assert_eq!(jobs[1].job_type, "delay");
        assert!(jobs[1].args.is_empty());
    }

    #[test]
    fn test_run_requires_a_job() {
        let err = Cli::try_parse_from(["deferred-jobs", "run"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_run_rejects_non_object_args() {
        assert!(Cli::try_parse_from(["deferred-jobs", "run", "--job", "delay=[1,2]"]).is_err());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        let err = Cli::try_parse_from(["deferred-jobs", "-v", "-q"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_environment_alias() {
        let cli = Cli::try_parse_from(["deferred-jobs", "--env", "prod"]).unwrap();
        let env: crate::config::Environment = cli.env.unwrap().into();
        assert_eq!(env, crate::config::Environment::Production);
    }
}
