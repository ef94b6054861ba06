//! Contract backends.
//!
//! A backend answers some subset of contract metadata questions for a chain:
//! where a contract lives (registrar), what its compiled artifacts are
//! (store), and which contracts can be bound for use (provider). The roles
//! a backend plays are declared statically through [`Capabilities`].
//!
//! - [`BackendRegistry`] maps class identifiers to constructors.
//! - [`memory`], [`jsonfile`], [`project`] — built-in implementations.

pub mod jsonfile;
pub mod memory;
pub mod project;
mod registry;

use std::fmt;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use bitflags::bitflags;

pub use self::registry::{BackendConstructor, BackendRegistry};
use crate::contract::ContractData;
use crate::error::Error;

bitflags! {
    /// Roles a backend declares at construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Supplies bindable contract data.
        const PROVIDER = 1 << 0;
        /// Records and looks up deployed addresses.
        const REGISTRAR = 1 << 1;
        /// Serves compiled contract artifacts.
        const STORE = 1 << 2;
    }
}

impl Capabilities {
    /// Whether the provider role is declared.
    #[must_use]
    pub const fn is_provider(self) -> bool {
        self.contains(Self::PROVIDER)
    }

    /// Whether the registrar role is declared.
    #[must_use]
    pub const fn is_registrar(self) -> bool {
        self.contains(Self::REGISTRAR)
    }

    /// Whether the store role is declared.
    #[must_use]
    pub const fn is_store(self) -> bool {
        self.contains(Self::STORE)
    }
}

/// A role aggregated by a façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// See [`Capabilities::PROVIDER`].
    Provider,
    /// See [`Capabilities::REGISTRAR`].
    Registrar,
    /// See [`Capabilities::STORE`].
    Store,
}

impl Role {
    /// Capability flag backing this role.
    #[must_use]
    pub const fn capability(self) -> Capabilities {
        match self {
            Self::Provider => Capabilities::PROVIDER,
            Self::Registrar => Capabilities::REGISTRAR,
            Self::Store => Capabilities::STORE,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Provider => "provider",
            Self::Registrar => "registrar",
            Self::Store => "store",
        })
    }
}

/// What a backend constructor learns about the chain it is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendContext {
    /// Name of the chain session.
    pub chain_name: String,
    /// Directory relative settings paths resolve against.
    pub base_dir: PathBuf,
}

impl BackendContext {
    /// Creates a context for `chain_name` rooted at `base_dir`.
    #[must_use]
    pub fn new(chain_name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            chain_name: chain_name.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Resolves a settings path against [`Self::base_dir`].
    #[must_use]
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(path)
    }
}

/// A contract backend.
///
/// Operations a backend does not support return [`Error::Unsupported`].
/// Backends are shared by reference within a session and use interior
/// mutability for writes.
pub trait Backend: fmt::Debug {
    /// Roles this backend plays. Must not change after construction.
    fn capabilities(&self) -> Capabilities;

    /// Address a contract was registered at.
    fn get_contract_address(&self, name: &str) -> Result<Address, Error> {
        let _ = name;
        Err(Error::unsupported("get_contract_address"))
    }

    /// Records the address a contract was deployed at.
    fn set_contract_address(&self, name: &str, address: Address) -> Result<(), Error> {
        let _ = (name, address);
        Err(Error::unsupported("set_contract_address"))
    }

    /// Compiled artifacts of a contract.
    fn get_contract_data(&self, name: &str) -> Result<ContractData, Error> {
        let _ = name;
        Err(Error::unsupported("get_contract_data"))
    }

    /// Names of every contract the backend can serve.
    fn contract_names(&self) -> Result<Vec<String>, Error> {
        Err(Error::unsupported("contract_names"))
    }
}

/// Reads an optional string setting.
pub(crate) fn string_setting<'a>(
    settings: &'a toml::Table,
    key: &str,
) -> Result<Option<&'a str>, Error> {
    match settings.get(key) {
        None => Ok(None),
        Some(toml::Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(Error::config(format!(
            "setting '{key}' must be a string, got {}",
            other.type_str()
        ))),
    }
}
