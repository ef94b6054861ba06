//! Live network connection interface.
//!
//! - [`Web3`] — the blocking RPC surface consumed by chain sessions, backends
//!   and the deploy workflow.
//! - [`HttpWeb3`] — a JSON-RPC over HTTP implementation.
//!
//! Code is carried as the node returns it: a `0x`-prefixed hex string, with
//! [`EMPTY_CODE`] standing for "no code at this address".

mod http;

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

pub use self::http::HttpWeb3;
use crate::config::Web3Config;
use crate::error::Error;

/// Transaction hash.
pub type TxHash = B256;

/// Code returned for an address that holds no contract.
pub const EMPTY_CODE: &str = "0x";

/// Whether `code` returned by the node is more than [`EMPTY_CODE`].
#[must_use]
pub const fn has_code(code: &str) -> bool {
    code.len() > EMPTY_CODE.len()
}

/// Blocking view of an Ethereum JSON-RPC node.
///
/// Implementations never retry; every failure is reported to the caller.
pub trait Web3: fmt::Debug {
    /// Accounts managed by the node (`eth_accounts`).
    fn accounts(&self) -> Result<Vec<Address>, Error>;

    /// The node's coinbase account (`eth_coinbase`).
    fn coinbase(&self) -> Result<Address, Error>;

    /// Whether the node refuses to sign for `account` until it is unlocked.
    fn is_account_locked(&self, account: Address) -> Result<bool, Error>;

    /// Requests the node to unlock `account` for `duration`.
    fn unlock_account(
        &self,
        account: Address,
        password: &str,
        duration: Duration,
    ) -> Result<bool, Error>;

    /// Submits a transaction signed by the node; returns immediately.
    fn send_transaction(&self, transaction: &TransactionRequest) -> Result<TxHash, Error>;

    /// Looks up a transaction by hash.
    fn get_transaction(&self, hash: TxHash) -> Result<Option<Transaction>, Error>;

    /// Looks up a receipt by hash; `None` until the transaction is mined.
    fn get_transaction_receipt(&self, hash: TxHash) -> Result<Option<TransactionReceipt>, Error>;

    /// Code stored at `address` in the latest block.
    fn get_code(&self, address: Address) -> Result<String, Error>;
}

/// Opens a live connection from chain web3 settings.
pub type Connector = Box<dyn Fn(&Web3Config) -> Result<Rc<dyn Web3>, Error>>;

/// The default [`Connector`]: a JSON-RPC over HTTP client.
#[must_use]
pub fn http_connector() -> Connector {
    Box::new(|config: &Web3Config| {
        let web3 = HttpWeb3::from_config(config)?;
        Ok(Rc::new(web3) as Rc<dyn Web3>)
    })
}

/// Parameters of `eth_sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Sending account; must be unlocked on the node.
    pub from: Address,
    /// Recipient; `None` for contract creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// `0x`-prefixed call data or init code.
    pub data: String,
    /// Gas limit; estimated by the node when absent.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "alloy_serde::quantity::opt"
    )]
    pub gas: Option<u64>,
}

impl TransactionRequest {
    /// A contract-creation request carrying `data` as init code.
    #[must_use]
    pub const fn create(from: Address, data: String) -> Self {
        Self {
            from,
            to: None,
            data,
            gas: None,
        }
    }
}

/// Subset of `eth_getTransactionByHash` used here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction hash.
    pub hash: TxHash,
    /// Sender.
    pub from: Address,
    /// Gas provided by the sender.
    #[serde(with = "alloy_serde::quantity")]
    pub gas: u64,
    /// Block the transaction was included in, if any.
    #[serde(default, with = "alloy_serde::quantity::opt")]
    pub block_number: Option<u64>,
}

/// Subset of `eth_getTransactionReceipt` used here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub transaction_hash: TxHash,
    /// Including block; a receipt without one is not confirmed.
    #[serde(default, with = "alloy_serde::quantity::opt")]
    pub block_number: Option<u64>,
    /// Gas consumed by execution.
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    /// Created contract, for creation transactions.
    #[serde(default)]
    pub contract_address: Option<Address>,
}

impl TransactionReceipt {
    /// Whether the receipt references a block.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.block_number.is_some()
    }
}
