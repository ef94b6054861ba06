//! Chain-aware contract management for Ethereum projects.
//!
//! A project declares named chains in TOML. Each chain lists contract
//! backends that answer three questions: which compiled contracts exist
//! (store), how to bind them for use (provider) and where they are deployed
//! (registrar). A [`ChainSession`](chain::ChainSession) resolves those
//! backends, builds them on demand and exposes a live JSON-RPC connection
//! while running.
//!
//! ```no_run
//! use contractor::chain::ChainSession;
//! use contractor::config::load_config;
//! use contractor::deploy::DeployOptions;
//!
//! # fn main() -> Result<(), contractor::Error> {
//! let project = load_config("contractor.toml".as_ref())?;
//! let mut session = ChainSession::from_project(&project, "local")?;
//! let mut running = session.enter();
//! let (math, _) = running.get_or_deploy_contract("Math", &DeployOptions::default())?;
//! println!("Math @ {}", math.address());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod chain;
pub mod config;
pub mod contract;
pub mod deploy;
pub mod error;
pub mod select;
pub mod web3;

#[cfg(test)]
mod testing;

pub use self::error::Error;
