//! `contractor contracts` command — list contracts known to a chain.

use std::path::Path;

use contractor::Error;
use contractor::chain::ChainSession;
use contractor::config::load_config;
use contractor::select::{TerminalPrompt, select_chain};

/// Execute the `contracts` command.
///
/// Prompts for the chain when `chain` is `None`.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the chain has no
/// store backend, or a store fails to list its contracts.
#[allow(clippy::print_stdout)]
pub fn run(config_path: &Path, chain: Option<String>) -> Result<(), Error> {
    let project = load_config(config_path)?;
    let chain = match chain {
        Some(chain) => chain,
        None => select_chain(
            project.chains.keys().map(String::as_str),
            &mut TerminalPrompt,
        )?,
    };

    let mut session = ChainSession::from_project(&project, &chain)?;
    for name in session.store()?.contract_names()? {
        println!("{name}");
    }
    Ok(())
}
