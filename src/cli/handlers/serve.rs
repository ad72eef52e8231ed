//! Serve command handler

use std::io::Write;

use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};
use crate::server::Server;

pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Start the server, or with `dry_run` only report what it would do
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            let mut stdout = std::io::stdout().lock();
            return self.validate_only(&mut stdout);
        }

        Server::new(self.config).run().await.map_err(AppError::from)
    }

    /// Validate configuration and describe the server without binding
    pub fn validate_only<W: Write>(&self, out: &mut W) -> AppResult<()> {
        self.config.validate()?;

        let registry = Server::new(self.config.clone()).registry();
        let queue = &self.config.queue;

        writeln!(out, "✓ Configuration is valid")?;
        writeln!(out, "✓ Server would bind to: {}", self.config.server.address())?;
        writeln!(out, "✓ Logger level: {}", self.config.logger.level)?;
        writeln!(
            out,
            "✓ Jobs drain on '{}' (flush first: {}), ids prefixed '{}'",
            queue.drain_event, queue.flush_before_drain, queue.id_prefix
        )?;
        writeln!(out, "✓ Job types: {}", registry.job_types().join(", "))?;
        writeln!(out, "Dry run completed successfully")?;

        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
