//! Octopoid CLI application entry point.
//!
//! Thin composition layer: parse args, initialize logging, route the
//! command, and report any fatal error.

use clap::Parser;
use tracing::error;

use octopoid::app::{handle_fatal_error, initialize_app, AppConfig};
use octopoid::cli::{execute_command, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let app_config = match AppConfig::new(cli.verbose) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to initialize application configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = initialize_app(app_config).await {
        error!("application initialization failed: {}", e);
    }

    let result = execute_command(cli.command, cli.path, cli.verbose).await;

    if let Err(e) = result {
        handle_fatal_error(e, cli.verbose);
    }
}
