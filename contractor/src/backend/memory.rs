//! In-memory registrar backend.
//!
//! Addresses live for the lifetime of the chain session. An optional
//! `addresses` settings table preloads known deployments:
//!
//! ```toml
//! [chains.local.contracts.backends.Memory]
//! class = "memory"
//! settings = { addresses = { Math = "0x82a978b3f5962a5b0957d9ee9eef472ee55b42f1" } }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use alloy_primitives::Address;

use super::{Backend, BackendContext, Capabilities};
use crate::error::Error;

/// Class identifier of [`MemoryBackend`].
pub const CLASS: &str = "memory";

/// Registrar that keeps addresses in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    addresses: RefCell<HashMap<String, Address>>,
}

impl MemoryBackend {
    /// An empty registrar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// [`BackendConstructor`](super::BackendConstructor) for this class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `addresses` is not a table of
    /// address strings.
    pub fn construct(
        _context: &BackendContext,
        settings: &toml::Table,
    ) -> Result<Rc<dyn Backend>, Error> {
        let backend = Self::new();
        match settings.get("addresses") {
            None => {}
            Some(toml::Value::Table(preloaded)) => {
                let mut addresses = backend.addresses.borrow_mut();
                for (name, value) in preloaded {
                    let address = value
                        .as_str()
                        .ok_or_else(|| {
                            Error::config(format!("address for '{name}' must be a string"))
                        })?
                        .parse::<Address>()
                        .map_err(|e| Error::config_with(format!("invalid address for '{name}'"), e))?;
                    addresses.insert(name.clone(), address);
                }
            }
            Some(other) => {
                return Err(Error::config(format!(
                    "setting 'addresses' must be a table, got {}",
                    other.type_str()
                )));
            }
        }
        Ok(Rc::new(backend))
    }
}

impl Backend for MemoryBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::REGISTRAR
    }

    fn get_contract_address(&self, name: &str) -> Result<Address, Error> {
        self.addresses
            .borrow()
            .get(name)
            .copied()
            .ok_or_else(|| Error::ContractNotFound(name.to_owned()))
    }

    fn set_contract_address(&self, name: &str, address: Address) -> Result<(), Error> {
        self.addresses.borrow_mut().insert(name.to_owned(), address);
        Ok(())
    }
}
