//! `contractor deploy` command — deploy, verify and register a contract.
//!
//! The chain and account are taken from the arguments, and asked for
//! interactively otherwise; the account picker offers the chain's
//! `default_account`. A locked account is unlocked with a password prompt
//! before anything is sent.

use std::time::Duration;

use contractor::Error;
use contractor::chain::ChainSession;
use contractor::config::load_config;
use contractor::deploy::{DeployOptions, deploy_contract_and_verify};
use contractor::select::{TerminalPrompt, select_chain, select_sender};

use super::DeployArgs;

/// Execute the `deploy` command.
///
/// # Errors
///
/// Returns an error if selection, unlocking, deployment or verification
/// fails. A chain without a registrar backend still deploys; the address is
/// then only printed.
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn run(args: &DeployArgs) -> Result<(), Error> {
    let project = load_config(&args.config)?;
    let mut prompt = TerminalPrompt;

    let chain = match &args.chain {
        Some(chain) => chain.clone(),
        None => select_chain(project.chains.keys().map(String::as_str), &mut prompt)?,
    };
    let mut session = ChainSession::from_project(&project, &chain)?;
    let mut running = session.enter();

    let web3 = running.web3()?;
    let account = select_sender(
        web3.as_ref(),
        args.account,
        running.config().web3.default_account,
        project.deploy.unlock_duration(),
        &mut prompt,
    )?;

    let factory = running
        .get_contract_factory(&args.contract)?
        .with_sender(account)
        .with_constructor_args(&args.args)?;

    let mut options = DeployOptions::from(&project.deploy);
    if let Some(secs) = args.timeout {
        options.timeout = Duration::from_secs(secs);
    }

    eprintln!("Deploying {} to {chain}", args.contract);
    let deployment = deploy_contract_and_verify(&factory, &options)?;
    println!("\n{}\n", deployment.receipt);
    println!("{}", deployment.verification);

    match running.registrar() {
        Ok(registrar) => {
            registrar.set_contract_address(&args.contract, deployment.contract.address())?;
            eprintln!("Registered {} @ {}", args.contract, deployment.contract.address());
        }
        Err(Error::NoBackend { .. }) => {
            tracing::warn!(chain = %chain, "no registrar backend configured, address not recorded");
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
