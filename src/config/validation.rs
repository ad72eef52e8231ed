//! Configuration validation
//!
//! Each section validates itself; [`Settings::validate`] reports the first
//! failure with the dotted path of the offending field.

use crate::config::error::ConfigError;
use crate::config::settings::{FileSettings, LoggerSettings, QueueConfig, ServerConfig, Settings};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::validation(
                "server.host",
                "Host is required. Please specify an address to bind to.",
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Accepts a bare level or a comma-separated `target=level` directive list
    pub fn validate(&self) -> Result<(), ConfigError> {
        let directives: Vec<&str> = self
            .level
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();

        let all_valid = !directives.is_empty()
            && directives.iter().all(|directive| {
                let level = directive.rsplit('=').next().unwrap_or(directive);
                VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str())
            });

        if !all_valid {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drain_event.trim().is_empty() {
            return Err(ConfigError::validation(
                "queue.drain_event",
                "Drain event name is required; deferred jobs would never run.",
            ));
        }

        if self.id_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(
                "queue.id_prefix",
                "Job id prefix must not contain whitespace.",
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all sections, returning the first error encountered
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.logger.validate()?;
        self.queue.validate()?;
        Ok(())
    }
}
