//! Unified error types for contractor.

use std::fmt::Display;
use std::time::Duration;

use alloy_primitives::Address;
use thiserror::Error;

use crate::backend::Role;
use crate::web3::TxHash;

/// Top-level error type shared by the library and the CLI.
///
/// None of these are retried internally; every variant propagates to the
/// immediate caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing configuration.
    #[error("configuration: {0}")]
    Configuration(String),

    /// A backend names an implementation class that is not registered.
    #[error("unknown backend class '{class}' for backend '{backend}'")]
    UnknownBackend {
        /// Configured backend name.
        backend: String,
        /// Implementation identifier that failed to resolve.
        class: String,
    },

    /// A role façade was requested but no backend declares that role.
    #[error("must have at least one {role} backend configured\n{configured}")]
    NoBackend {
        /// Requested role.
        role: Role,
        /// Rendering of the backend configuration that was attempted.
        configured: String,
    },

    /// Live network access attempted outside a running chain session.
    #[error("chain must be running prior to accessing web3")]
    NotRunning,

    /// Locked sender, already-unlocked account, or a refused unlock.
    #[error("{0}")]
    AccountLocked(String),

    /// No confirmed receipt within the configured bound.
    #[error("transaction {hash} was not confirmed within {timeout:?}")]
    ConfirmationTimeout {
        /// Hash of the submitted transaction; its fate is unknown.
        hash: TxHash,
        /// Bound that elapsed.
        timeout: Duration,
    },

    /// No code found at the deployed address.
    #[error("bytecode @ {address} is unexpectedly empty")]
    EmptyDeployment {
        /// Deployed address.
        address: Address,
    },

    /// Deployed code failed the runtime bytecode check.
    #[error(
        "bytecode @ {address} does not match expected contract bytecode.\n\n\
         expected : '{expected}'\n\
         actual   : '{actual}'"
    )]
    BytecodeMismatch {
        /// Deployed address.
        address: Address,
        /// Runtime bytecode declared by the contract factory.
        expected: String,
        /// Code read back from the chain.
        actual: String,
    },

    /// Invalid interactive choice.
    #[error("{0}")]
    Selection(String),

    /// The backend does not implement the requested operation.
    #[error("{operation} is not supported by this backend")]
    Unsupported {
        /// Name of the operation.
        operation: &'static str,
    },

    /// No backend knows the requested contract.
    #[error("contract '{0}' not found")]
    ContractNotFound(String),

    /// Transport or JSON-RPC level failure.
    #[error("rpc: {0}")]
    Rpc(String),

    /// Filesystem or terminal I/O failure.
    #[error("io: {0}")]
    Io(String),
}

impl Error {
    /// Builds a [`Error::Configuration`] from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Builds a [`Error::Configuration`] from a context and its cause.
    pub fn config_with(context: impl Display, source: impl Display) -> Self {
        Self::Configuration(format!("{context}: {source}"))
    }

    pub(crate) fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc(message.into())
    }

    pub(crate) fn rpc_with(context: impl Display, source: impl Display) -> Self {
        Self::Rpc(format!("{context}: {source}"))
    }

    /// Builds a [`Error::Io`] from a context and its cause.
    pub fn io_with(context: impl Display, source: impl Display) -> Self {
        Self::Io(format!("{context}: {source}"))
    }

    pub(crate) fn selection(choice: &str) -> Self {
        Self::Selection(format!(
            "Invalid choice: {choice}.  Please choose from one of the provided options."
        ))
    }

    pub(crate) const fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }
}
