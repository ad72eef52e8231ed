use clap::Parser;

use deferred_jobs::cli::{Cli, execute_command, init_logger_from_settings, load_and_merge_config};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", anyhow::Error::from(e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> deferred_jobs::error::AppResult<()> {
    let settings = load_and_merge_config(&cli)?;
    init_logger_from_settings(&settings)?;
    execute_command(&cli, settings).await
}
