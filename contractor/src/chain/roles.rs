//! Role façades over the backends of a chain.
//!
//! Each façade holds the backends declaring its role, in priority order.
//! Reads return the first backend that answers; if every backend fails the
//! last error is surfaced.

use std::rc::Rc;

use alloy_primitives::Address;
use indexmap::IndexMap;

use crate::backend::{Backend, Role};
use crate::contract::{ContractData, ContractFactory};
use crate::error::Error;
use crate::web3::Web3;

#[derive(Debug, Clone)]
struct Backends {
    role: Role,
    entries: Vec<(String, Rc<dyn Backend>)>,
}

impl Backends {
    fn new(
        role: Role,
        backends: IndexMap<String, Rc<dyn Backend>>,
        configured: &str,
    ) -> Result<Self, Error> {
        if backends.is_empty() {
            return Err(Error::NoBackend {
                role,
                configured: configured.to_owned(),
            });
        }
        Ok(Self {
            role,
            entries: backends.into_iter().collect(),
        })
    }

    fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn first_success<T>(
        &self,
        mut read: impl FnMut(&dyn Backend) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut last_error = None;
        for (name, backend) in &self.entries {
            match read(backend.as_ref()) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!(role = %self.role, backend = %name, error = %e, "backend lookup failed");
                    last_error = Some(e);
                }
            }
        }
        // `new` guarantees at least one entry.
        Err(last_error.unwrap_or(Error::NoBackend {
            role: self.role,
            configured: String::new(),
        }))
    }
}

/// Supplies contract data bound to a live connection.
#[derive(Debug, Clone)]
pub struct Provider {
    backends: Backends,
}

impl Provider {
    /// Builds the façade from provider backends in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBackend`] when `backends` is empty; `configured`
    /// describes what was attempted.
    pub fn new(
        backends: IndexMap<String, Rc<dyn Backend>>,
        configured: &str,
    ) -> Result<Self, Error> {
        Backends::new(Role::Provider, backends, configured).map(|backends| Self { backends })
    }

    /// Backend names in the order they are consulted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.backends.names()
    }

    /// Compiled artifacts from the first backend that has them.
    ///
    /// # Errors
    ///
    /// Returns the last backend's error if none has the contract.
    pub fn get_contract_data(&self, name: &str) -> Result<ContractData, Error> {
        self.backends
            .first_success(|backend| backend.get_contract_data(name))
    }

    /// A factory for `name` bound to `web3`.
    ///
    /// # Errors
    ///
    /// See [`Self::get_contract_data`].
    pub fn get_contract_factory(
        &self,
        name: &str,
        web3: Rc<dyn Web3>,
    ) -> Result<ContractFactory, Error> {
        let data = self.get_contract_data(name)?;
        Ok(ContractFactory::new(name, data, web3))
    }
}

/// Records and looks up deployed addresses.
#[derive(Debug, Clone)]
pub struct Registrar {
    backends: Backends,
}

impl Registrar {
    /// Builds the façade from registrar backends in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBackend`] when `backends` is empty.
    pub fn new(
        backends: IndexMap<String, Rc<dyn Backend>>,
        configured: &str,
    ) -> Result<Self, Error> {
        Backends::new(Role::Registrar, backends, configured).map(|backends| Self { backends })
    }

    /// Backend names in the order they are consulted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.backends.names()
    }

    /// Address from the first backend that knows `name`.
    ///
    /// # Errors
    ///
    /// Returns the last backend's error if none knows the contract.
    pub fn get_contract_address(&self, name: &str) -> Result<Address, Error> {
        self.backends
            .first_success(|backend| backend.get_contract_address(name))
    }

    /// Writes `address` to every registrar backend.
    ///
    /// # Errors
    ///
    /// Stops at the first backend that fails to record it.
    pub fn set_contract_address(&self, name: &str, address: Address) -> Result<(), Error> {
        for (backend_name, backend) in &self.backends.entries {
            backend.set_contract_address(name, address)?;
            tracing::debug!(backend = %backend_name, contract = name, %address, "address recorded");
        }
        Ok(())
    }
}

/// Serves compiled artifacts.
#[derive(Debug, Clone)]
pub struct Store {
    backends: Backends,
}

impl Store {
    /// Builds the façade from store backends in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBackend`] when `backends` is empty.
    pub fn new(
        backends: IndexMap<String, Rc<dyn Backend>>,
        configured: &str,
    ) -> Result<Self, Error> {
        Backends::new(Role::Store, backends, configured).map(|backends| Self { backends })
    }

    /// Backend names in the order they are consulted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.backends.names()
    }

    /// Compiled artifacts from the first backend that has them.
    ///
    /// # Errors
    ///
    /// Returns the last backend's error if none has the contract.
    pub fn get_contract_data(&self, name: &str) -> Result<ContractData, Error> {
        self.backends
            .first_success(|backend| backend.get_contract_data(name))
    }

    /// Every contract name known to any store, first occurrence first.
    ///
    /// # Errors
    ///
    /// Propagates the first backend failure.
    pub fn contract_names(&self) -> Result<Vec<String>, Error> {
        let mut names: Vec<String> = Vec::new();
        for (_, backend) in &self.backends.entries {
            for name in backend.contract_names()? {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}
