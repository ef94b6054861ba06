//! Contractor CLI
//!
//! Manages contract deployments across the chains declared in a project's
//! TOML configuration.
//!
//! ```sh
//! contractor init                 # Generate default contractor.toml
//! contractor chains               # List configured chains and backends
//! contractor contracts -n local   # List compiled contracts
//! contractor deploy Math          # Deploy, verify and register a contract
//! ```

mod cmd;
mod telemetry;

use clap::Parser;
use cmd::{Cli, Commands};
use telemetry::Telemetry;

#[allow(clippy::print_stderr)]
fn main() {
    // Load .env variables before clap reads `env` defaults
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_log_level(cli.log_level.as_str())
        .register();

    let result = match cli.command {
        Commands::Init { output, force } => cmd::init::run(&output, force),
        Commands::Chains { config } => cmd::chains::run(&config),
        Commands::Contracts { config, chain } => cmd::contracts::run(&config, chain),
        Commands::Deploy(args) => cmd::deploy::run(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
