//! Applies CLI overrides on top of file-based configuration
//!
//! Precedence, lowest first: config files, `DEFERRED_*` variables, global
//! flags, command flags.

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, settings::Settings};

pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration the way `cli` asks for
    ///
    /// `--config` selects a single file, otherwise the layered loader reads
    /// its directory; `--env` overrides `DEFERRED_APP_ENV`.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let loader = match cli.config {
            Some(ref path) => ConfigLoader::with_file(path),
            None => ConfigLoader::new()?,
        };
        let loader = match cli.env {
            Some(env) => loader.with_environment(env.into()),
            None => loader,
        };

        Ok(Self::new(loader.load()?))
    }

    /// Apply overrides and validate the result
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        match cli.command {
            Some(Commands::Serve {
                ref host,
                port,
                log_level,
                ..
            }) => {
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
                // More specific than --verbose/--quiet.
                if let Some(level) = log_level {
                    config.logger.level = level.into();
                }
            }
            Some(Commands::Run { .. }) => {
                // Job output goes to stdout; keep the console log off it
                // unless explicitly asked for.
                if !cli.verbose {
                    config.logger.level = "warn".to_string();
                }
                // Handles are printed before the drain; make sure they
                // reach the terminal first.
                config.queue.flush_before_drain = true;
            }
            None => {}
        }

        config.validate()?;

        Ok(config)
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}
