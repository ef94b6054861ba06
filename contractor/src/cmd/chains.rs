//! `contractor chains` command — list chains and their resolved backends.

use std::fmt::Write as _;
use std::path::Path;

use contractor::Error;
use contractor::chain::{ChainSession, describe_backend_configs};
use contractor::config::{ProjectConfig, load_config};

/// Execute the `chains` command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or a chain's
/// backends are malformed.
#[allow(clippy::print_stdout)]
pub fn run(config_path: &Path) -> Result<(), Error> {
    let project = load_config(config_path)?;
    print!("{}", render(&project)?);
    Ok(())
}

/// One block per chain: name, endpoint, then backends in priority order.
fn render(project: &ProjectConfig) -> Result<String, Error> {
    let mut out = String::new();
    for name in project.chains.keys() {
        let session = ChainSession::from_project(project, name)?;
        let backends = describe_backend_configs(session.backend_configs());
        let _ = writeln!(out, "{name}");
        let _ = writeln!(out, "  rpc_url : {}", session.config().web3.rpc_url);
        if let Some(account) = session.config().web3.default_account {
            let _ = writeln!(out, "  account : {account}");
        }
        let _ = writeln!(out, "  backends:");
        for line in backends.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    Ok(out)
}
