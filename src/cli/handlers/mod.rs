//! Command handlers, one per subcommand

pub mod run;
pub mod serve;

pub use run::RunCommandHandler;
pub use serve::ServeCommandHandler;
