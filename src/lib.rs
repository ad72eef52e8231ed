//! Deferred jobs
//!
//! Jobs submitted during a unit of work (an HTTP request, a CLI
//! invocation) are queued and executed in order once the host signals that
//! its primary output has been sent.

use shadow_rs::shadow;
shadow!(build);

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod jobs;
pub mod logger;
pub mod server;
pub mod state;

pub use state::AppState;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
