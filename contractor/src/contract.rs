//! Compiled contract data, factories and deployed contract handles.

use std::fmt;
use std::rc::Rc;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::web3::{TransactionRequest, TxHash, Web3};

/// Compiled artifacts of one contract, as stored in `contracts.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractData {
    /// `0x`-prefixed init code.
    pub bytecode: String,
    /// `0x`-prefixed runtime code, when the compiler emitted it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode_runtime: Option<String>,
    /// Interface description, kept opaque.
    #[serde(default)]
    pub abi: serde_json::Value,
}

impl ContractData {
    /// Declared runtime bytecode; an empty string counts as undeclared.
    #[must_use]
    pub fn expected_runtime(&self) -> Option<&str> {
        self.bytecode_runtime.as_deref().filter(|code| !code.is_empty())
    }
}

/// A contract ready to be deployed through a bound connection.
#[derive(Clone)]
pub struct ContractFactory {
    name: String,
    data: ContractData,
    web3: Rc<dyn Web3>,
    sender: Option<Address>,
    constructor_args: String,
}

impl fmt::Debug for ContractFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractFactory")
            .field("name", &self.name)
            .field("sender", &self.sender)
            .field("constructor_args", &self.constructor_args)
            .finish_non_exhaustive()
    }
}

impl ContractFactory {
    /// Binds `data` to `web3`.
    #[must_use]
    pub fn new(name: impl Into<String>, data: ContractData, web3: Rc<dyn Web3>) -> Self {
        Self {
            name: name.into(),
            data,
            web3,
            sender: None,
            constructor_args: String::new(),
        }
    }

    /// Uses `sender` as the `from` address of the creation transaction.
    #[must_use]
    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Appends ABI-encoded constructor arguments to the init code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `encoded` is not valid hex.
    pub fn with_constructor_args(mut self, encoded: &str) -> Result<Self, Error> {
        let stripped = encoded.strip_prefix("0x").unwrap_or(encoded);
        hex::decode(stripped)
            .map_err(|e| Error::config_with("constructor arguments must be hex", e))?;
        self.constructor_args = stripped.to_owned();
        Ok(self)
    }

    /// Contract name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiled artifacts.
    #[must_use]
    pub const fn data(&self) -> &ContractData {
        &self.data
    }

    /// Bound connection.
    #[must_use]
    pub const fn web3(&self) -> &Rc<dyn Web3> {
        &self.web3
    }

    /// Explicit sender, if any.
    #[must_use]
    pub const fn sender(&self) -> Option<Address> {
        self.sender
    }

    /// Init code followed by the constructor arguments.
    #[must_use]
    pub fn deploy_data(&self) -> String {
        let bytecode = &self.data.bytecode;
        let prefixed = if bytecode.starts_with("0x") {
            bytecode.clone()
        } else {
            format!("0x{bytecode}")
        };
        prefixed + &self.constructor_args
    }

    /// Submits the creation transaction from `from` and returns its hash
    /// without waiting for it to be mined.
    ///
    /// # Errors
    ///
    /// Propagates the node's refusal to accept the transaction.
    pub fn deploy(&self, from: Address) -> Result<TxHash, Error> {
        let request = TransactionRequest::create(from, self.deploy_data());
        self.web3.send_transaction(&request)
    }

    /// A handle to this contract at `address`.
    #[must_use]
    pub fn at(&self, address: Address) -> Contract {
        Contract {
            name: self.name.clone(),
            address,
            abi: self.data.abi.clone(),
            web3: Rc::clone(&self.web3),
        }
    }
}

/// A contract bound to a deployed address.
#[derive(Clone)]
pub struct Contract {
    name: String,
    address: Address,
    abi: serde_json::Value,
    web3: Rc<dyn Web3>,
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Contract {
    /// Contract name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deployed address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Interface description.
    #[must_use]
    pub const fn abi(&self) -> &serde_json::Value {
        &self.abi
    }

    /// Code currently stored at the contract address.
    ///
    /// # Errors
    ///
    /// Propagates RPC failures.
    pub fn code(&self) -> Result<String, Error> {
        self.web3.get_code(self.address)
    }
}
