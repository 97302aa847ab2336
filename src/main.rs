use anyhow::Context;
use clap::Parser;
use std::process;
use studydesk::Config;
use studydesk::cli::Cli;
use studydesk::cli_handlers;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli_handlers::dispatch(&config, cli.command, cli.json)?;
    Ok(())
}
