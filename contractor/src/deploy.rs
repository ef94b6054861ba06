//! Deploy-and-verify workflow.
//!
//! [`deploy_contract_and_verify`] submits a creation transaction, blocks
//! until it is mined (or a timeout elapses), then checks the code stored at
//! the new address:
//!
//! 1. The sender must already be unlocked; nothing is sent otherwise.
//! 2. The receipt is polled every [`DeployOptions::poll_interval`] until it
//!    references a block.
//! 3. With declared runtime bytecode, the deployed code is compared against
//!    it. **The comparison is inverted**: differing code is reported as
//!    verified and identical code fails with [`Error::BytecodeMismatch`].
//! 4. Without runtime bytecode, any code longer than [`EMPTY_CODE`](crate::web3::EMPTY_CODE) passes.
//!
//! Nothing is retried.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use alloy_primitives::Address;

use crate::config::DeployConfig;
use crate::contract::{Contract, ContractFactory};
use crate::error::Error;
use crate::web3::{TransactionReceipt, TxHash, Web3, has_code};

/// Shortest delay between receipt polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Confirmation bounds for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    /// Maximum wait for the creation transaction to be mined.
    pub timeout: Duration,
    /// Delay between receipt polls, never shorter than [`MIN_POLL_INTERVAL`].
    pub poll_interval: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self::from(&DeployConfig::default())
    }
}

impl From<&DeployConfig> for DeployOptions {
    fn from(config: &DeployConfig) -> Self {
        Self {
            timeout: config.confirmation_timeout(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Facts about a mined creation transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReceipt {
    /// Creation transaction hash.
    pub transaction_hash: TxHash,
    /// Address of the new contract.
    pub address: Address,
    /// Gas limit of the transaction.
    pub gas_provided: u64,
    /// Gas consumed by the deployment.
    pub gas_used: u64,
    /// Code read back from the new address.
    pub deployed_code: String,
}

impl fmt::Display for DeployReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transaction Mined")?;
        writeln!(f, "=================")?;
        writeln!(f, "Tx Hash      : {}", self.transaction_hash)?;
        writeln!(f, "Address      : {}", self.address)?;
        writeln!(f, "Gas Provided : {}", self.gas_provided)?;
        write!(f, "Gas Used     : {}", self.gas_used)
    }
}

/// How the deployed code was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Declared runtime bytecode was checked (with inverted polarity).
    RuntimeBytecode {
        /// Verified address.
        address: Address,
    },
    /// No runtime bytecode declared; the code is merely non-empty.
    NonEmpty {
        /// Verified address.
        address: Address,
    },
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuntimeBytecode { address } => write!(
                f,
                "Verified contract bytecode @ {address} matches expected runtime bytecode"
            ),
            Self::NonEmpty { address } => write!(f, "Verified bytecode @ {address} is non-empty"),
        }
    }
}

/// Outcome of a successful deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    /// Handle bound to the new address.
    pub contract: Contract,
    /// Transaction facts.
    pub receipt: DeployReceipt,
    /// Verification branch taken.
    pub verification: Verification,
}

/// Deploys `factory` and verifies the resulting code.
///
/// The sender is the factory's, falling back to the node's coinbase.
///
/// # Errors
///
/// - [`Error::AccountLocked`] if the sender is locked; nothing is submitted.
/// - [`Error::ConfirmationTimeout`] if no receipt is mined within
///   `options.timeout`.
/// - [`Error::EmptyDeployment`] or [`Error::BytecodeMismatch`] on failed
///   verification.
/// - [`Error::Rpc`] for node failures, or a receipt without a contract
///   address.
pub fn deploy_contract_and_verify(
    factory: &ContractFactory,
    options: &DeployOptions,
) -> Result<Deployment, Error> {
    let web3 = factory.web3();
    let sender = match factory.sender() {
        Some(sender) => sender,
        None => web3.coinbase()?,
    };
    if web3.is_account_locked(sender)? {
        return Err(Error::AccountLocked(
            "The default `from` address must be unlocked.".to_owned(),
        ));
    }

    tracing::info!(contract = factory.name(), %sender, "deploying contract");
    let hash = factory.deploy(sender)?;
    tracing::info!(contract = factory.name(), %hash, "deploy transaction sent, waiting for confirmation");

    let receipt = wait_for_receipt(web3.as_ref(), hash, options.timeout, options.poll_interval)?;
    let address = receipt.contract_address.ok_or_else(|| {
        Error::rpc(format!("receipt for {hash} carries no contract address"))
    })?;
    let gas_provided = web3
        .get_transaction(hash)?
        .ok_or_else(|| Error::rpc(format!("transaction {hash} not found after being mined")))?
        .gas;

    let deployed_code = web3.get_code(address)?;
    let verification = verify_bytecode(
        address,
        &deployed_code,
        factory.data().expected_runtime(),
    )?;
    tracing::info!(contract = factory.name(), %address, gas_used = receipt.gas_used, "{verification}");

    Ok(Deployment {
        contract: factory.at(address),
        receipt: DeployReceipt {
            transaction_hash: hash,
            address,
            gas_provided,
            gas_used: receipt.gas_used,
            deployed_code,
        },
        verification,
    })
}

/// Polls for the receipt of `hash` until it references a block.
///
/// `poll_interval` is raised to [`MIN_POLL_INTERVAL`] if shorter.
///
/// # Errors
///
/// Returns [`Error::ConfirmationTimeout`] once `timeout` elapses, or the
/// first RPC failure.
pub fn wait_for_receipt(
    web3: &dyn Web3,
    hash: TxHash,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<TransactionReceipt, Error> {
    let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
    let started = Instant::now();
    loop {
        if let Some(receipt) = web3.get_transaction_receipt(hash)? {
            if receipt.is_confirmed() {
                tracing::debug!(%hash, elapsed = ?started.elapsed(), "transaction mined");
                return Ok(receipt);
            }
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(Error::ConfirmationTimeout { hash, timeout });
        }
        thread::sleep(poll_interval.min(timeout - elapsed));
    }
}

/// Checks `deployed` code at `address` against `expected` runtime bytecode.
///
/// Polarity is inverted when `expected` is given: equal code is the failure.
///
/// # Errors
///
/// [`Error::BytecodeMismatch`] when `deployed == expected`;
/// [`Error::EmptyDeployment`] when nothing is expected and the code is empty.
pub fn verify_bytecode(
    address: Address,
    deployed: &str,
    expected: Option<&str>,
) -> Result<Verification, Error> {
    match expected {
        Some(expected) if deployed == expected => Err(Error::BytecodeMismatch {
            address,
            expected: expected.to_owned(),
            actual: deployed.to_owned(),
        }),
        Some(_) => Ok(Verification::RuntimeBytecode { address }),
        None if !has_code(deployed) => Err(Error::EmptyDeployment { address }),
        None => Ok(Verification::NonEmpty { address }),
    }
}
