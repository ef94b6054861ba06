//! CLI definitions and command implementations for contractor.

use std::path::PathBuf;

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand};

pub mod chains;
pub mod contracts;
pub mod deploy;
pub mod init;

/// Contractor — chain-aware contract deployment and registry.
#[derive(Debug, Parser)]
#[command(name = "contractor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "CONTRACTOR_LOG", default_value = "warn")]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a default TOML configuration file.
    Init {
        /// Output path for the configuration file.
        #[arg(short, long, default_value = "contractor.toml")]
        output: PathBuf,

        /// Overwrite the file if it already exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// List configured chains and their resolved backends.
    Chains {
        /// Path to the TOML configuration file.
        #[arg(short, long, env = "CONTRACTOR_CONFIG", default_value = "contractor.toml")]
        config: PathBuf,
    },

    /// List the contracts known to a chain's store backends.
    Contracts {
        /// Path to the TOML configuration file.
        #[arg(short, long, env = "CONTRACTOR_CONFIG", default_value = "contractor.toml")]
        config: PathBuf,

        /// Chain to inspect; prompted for when omitted.
        #[arg(short = 'n', long)]
        chain: Option<String>,
    },

    /// Deploy a contract, verify its bytecode and register its address.
    Deploy(DeployArgs),
}

/// Arguments of `contractor deploy`.
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Name of the contract to deploy.
    pub contract: String,

    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CONTRACTOR_CONFIG", default_value = "contractor.toml")]
    pub config: PathBuf,

    /// Chain to deploy to; prompted for when omitted.
    #[arg(short = 'n', long)]
    pub chain: Option<String>,

    /// Sending account; defaults to the chain's `default_account`, or is
    /// prompted for.
    #[arg(short, long)]
    pub account: Option<Address>,

    /// ABI-encoded constructor arguments.
    #[arg(long, default_value = "0x")]
    pub args: String,

    /// Confirmation timeout in seconds, overriding `[deploy]`.
    #[arg(long)]
    pub timeout: Option<u64>,
}
