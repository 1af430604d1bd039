//! orchctl binary entrypoint.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use orch_cli::cli::{Cli, Commands};
use orch_cli::commands::{AgentsCommand, ExecutionsCommand};
use orch_cli::config::ClientConfig;
use orch_cli::output::OutputFormat;
use orch_cli::sink::EventSink;
use orch_cli::{CliError, ManagerClient};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_suppressed() => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` turns on debug output.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_cli(&cli);
    let client = Arc::new(ManagerClient::new(&config)?);
    let format = OutputFormat::new(cli.format);

    match cli.command {
        Commands::Agents { command } => {
            let cmd = AgentsCommand::new(client, EventSink::stdout());
            cmd.execute(&command).await?;
        }
        Commands::Executions { command } => {
            let mut stdout = io::stdout().lock();
            let cmd = ExecutionsCommand::new(client.as_ref());
            cmd.execute(&mut stdout, &format, &command).await?;
        }
    }

    Ok(())
}
