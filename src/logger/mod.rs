//! Logger built on `tracing-subscriber`
//!
//! - Console output, colored only when stdout is a terminal
//! - Optional file output in Full, Compact or JSON format

pub mod config;
pub mod error;
pub(crate) mod writer;


pub use config::*;
pub use error::LoggerError;

use std::io::IsTerminal;

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use writer::LogFileWriter;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber described by `config`
///
/// Fails if a global subscriber is already set.
pub fn init_logger(config: LoggerConfig) -> Result<(), LoggerError> {
    config.validate()?;

    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(build_layers(&config)?)
        .with(filter)
        .try_init()?;

    Ok(())
}

/// File layer first: the first layer's ANSI setting leaks into span field
/// formatting of later ones (tokio-rs/tracing#1817).
fn build_layers(config: &LoggerConfig) -> Result<Vec<BoxedLayer>, LoggerError> {
    let mut layers = Vec::with_capacity(2);
    if config.file.enabled {
        layers.push(file_layer(&config.file)?);
    }
    if config.console.enabled {
        layers.push(console_layer(&config.console));
    }
    Ok(layers)
}

fn console_layer(config: &ConsoleConfig) -> BoxedLayer {
    let use_ansi = config.colored && std::io::stdout().is_terminal();

    fmt::layer()
        .with_ansi(use_ansi)
        .with_target(true)
        .with_level(true)
        .boxed()
}

fn file_layer(config: &FileConfig) -> Result<BoxedLayer, LoggerError> {
    let writer = LogFileWriter::new(config)?;
    let base = fmt::layer().with_ansi(false).with_writer(writer);

    let layer = match config.format {
        LogFormat::Full => base.with_target(true).boxed(),
        LogFormat::Compact => base.with_target(true).compact().boxed(),
        LogFormat::Json => base.json().boxed(),
    };
    Ok(layer)
}
