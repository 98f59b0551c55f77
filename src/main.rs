//! Medic CLI entry point.

use clap::Parser;

use medic::cli::commands::{self, load_config};
use medic::cli::{Cli, Commands};
use medic::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let loaded = load_config(cli.config.as_deref());

    let mut log_config = loaded
        .as_ref()
        .map(|config| LogConfig::from(&config.logging))
        .unwrap_or_default();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    // Keeps the non-blocking file writer alive until exit.
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("failed to initialize logging: {err:#}");
            None
        }
    };

    let result = match (cli.command, loaded) {
        (Commands::Config(command), loaded) => commands::config::execute(command, loaded, cli.json),
        (_, Err(err)) => Err(err),
        (Commands::Plan(args), Ok(config)) => commands::plan::execute(args, &config, cli.json),
        (Commands::Run(args), Ok(config)) => commands::run::execute(args, &config, cli.json).await,
        (Commands::Heal(args), Ok(config)) => {
            commands::heal::execute(args, &config, cli.json).await
        }
        (Commands::Monitor(args), Ok(config)) => {
            commands::monitor::execute(args, &config, cli.json).await
        }
    };

    if let Err(err) = result {
        medic::cli::handle_error(err, cli.json);
    }
}
