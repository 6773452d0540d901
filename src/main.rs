//! Bisector CLI entry point.

use clap::Parser;

use bisector::cli::{Cli, Commands};
use bisector::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Logging follows the project config when it loads; commands report
    // config errors themselves.
    let log_config = bisector::cli::load_config(config_path)
        .map(|config| LogConfig::from(&config.logging))
        .unwrap_or_default();
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Init(args) => bisector::cli::commands::init::execute(args, cli.json).await,
        Commands::Run(args) => bisector::cli::commands::run::execute(args, config_path, cli.json).await,
        Commands::Step(args) => bisector::cli::commands::step::execute(args, config_path, cli.json).await,
        Commands::Status(args) => {
            bisector::cli::commands::status::execute(args, config_path, cli.json).await
        }
    };

    if let Err(err) = result {
        bisector::cli::handle_error(err, cli.json);
    }
}
