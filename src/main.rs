mod cli;
mod commands;
mod config;
mod db;
mod model;
mod util;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "movie-lookup failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(&cli.global)?;
    debug!(
        db_path = %config.db_path.display(),
        model = %config.model,
        api_key_set = config.api_key.is_some(),
        "configuration resolved"
    );

    match cli.command {
        Commands::Init => commands::init::run(&config),
        Commands::ImportCsv(args) => commands::import::run_csv(&config, args),
        Commands::ImportImdb(args) => commands::import::run_imdb(&config, args),
        Commands::Search(args) => commands::search::run(&config, args),
        Commands::Status => commands::status::run(&config),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
