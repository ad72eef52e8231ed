//! HTTP server lifecycle: startup, serving and graceful shutdown.

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::routes::create_router;
use crate::config::{Environment, settings::Settings};
use crate::jobs::JobRegistry;
use crate::jobs::tasks::builtin_registry;
use crate::state::AppState;

pub struct Server {
    settings: Settings,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Registry with the built-in tasks, wired to the configured host stores
    pub fn registry(&self) -> JobRegistry {
        builtin_registry(self.settings.host.clone().into_host_context())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %Environment::from_env(),
            "Application starting"
        );

        tracing::info!(
            level = %self.settings.logger.level,
            console_enabled = self.settings.logger.console.enabled,
            file_enabled = self.settings.logger.file.enabled,
            "Logger configuration loaded"
        );

        tracing::info!(
            drain_event = %self.settings.queue.drain_event,
            flush_before_drain = self.settings.queue.flush_before_drain,
            id_prefix = %self.settings.queue.id_prefix,
            "Queue configuration loaded"
        );

        let registry = self.registry();
        tracing::info!(job_types = ?registry.job_types(), "Job registry ready");

        let state = AppState::new(
            registry,
            self.settings.queue.clone(),
            self.settings.application.clone(),
        );
        let router = create_router(state.clone());

        let address = self.settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;

        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Jobs already accepted still run before the process exits.
        state.wait_for_drains().await;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// If a signal handler cannot be installed that branch never resolves, so
/// the server keeps running on the remaining one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_builtin_tasks() {
        let mut settings = Settings::default();
        settings
            .host
            .locale
            .insert("Hello".to_string(), serde_json::json!("Bonjour"));

        let registry = Server::new(settings).registry();
        assert_eq!(registry.job_types(), vec!["delay", "log_message"]);
        assert_eq!(registry.host().translate("Hello", "Hello"), "Bonjour");
    }
}
