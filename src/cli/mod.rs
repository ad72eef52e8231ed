//! Command-line interface
//!
//! `serve` runs the HTTP host, where every request is a unit of work.
//! `run` treats the invocation itself as one.

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, JobSpec, LogLevel};

use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::logger::init_logger;

/// Load configuration files and apply CLI overrides on top
pub fn load_and_merge_config(cli: &Cli) -> AppResult<Settings> {
    let merger = ConfigurationMerger::load(cli)?;
    Ok(merger.merge_cli_args(cli)?)
}

pub fn init_logger_from_settings(settings: &Settings) -> AppResult<()> {
    let logger_config = settings.logger.clone().into_logger_config()?;
    init_logger(logger_config)?;
    Ok(())
}
