//! Relaymap CLI - serve, execute and check field-mapping templates
//!
//! This is the main entry point for the `relaymap` binary. It loads the
//! configuration and manifest, sets up logging and dispatches subcommands.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;
mod server;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    // Secrets referenced as `env:NAME` may live in a local .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    control::set_override(cli.use_color());

    let config = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    let guard = match init_logging(&cli, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let result = run(cli, config).await;
    // Flush file logs before exiting
    drop(guard);

    match result {
        Ok(()) => process::exit(0),
        Err(e) => exit_with(&e),
    }
}

fn exit_with(e: &error::Error) -> ! {
    eprintln!("{}", error::format_error(e, control::SHOULD_COLORIZE.should_colorize()));
    if e.should_show_help() {
        eprintln!("\nFor more information, try '--help'");
    }
    process::exit(e.exit_code());
}

/// Main application logic
#[instrument(skip_all, fields(command = ?cli.command))]
async fn run(cli: Cli, config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let mut output = OutputWriter::new(cli.output, cli.use_color(), cli.quiet, cli.verbosity_level());

    tracing::debug!(verbosity = cli.verbosity_level(), "Executing command");

    match cli.command {
        Commands::Serve(args) => handlers::handle_serve(args, &config, &mut output).await,
        Commands::Execute(args) => handlers::handle_execute(args, &config, &mut output).await,
        Commands::Check(args) => handlers::handle_check(args, &config, &mut output).await,
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_settings(&config.logging);
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}
