//! JSON file registrar backend.
//!
//! Keeps a `name → address` object in `settings.file_path`, relative to the
//! project directory. The file is read on every lookup and rewritten on
//! every registration, so several sessions can share it.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use alloy_primitives::Address;
use indexmap::IndexMap;

use super::{Backend, BackendContext, Capabilities, string_setting};
use crate::error::Error;

/// Class identifier of [`JsonFileBackend`].
pub const CLASS: &str = "jsonfile";

type Registry = IndexMap<String, Address>;

/// Registrar persisted to a JSON file.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// A registrar backed by the file at `path`. The file need not exist.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// [`BackendConstructor`](super::BackendConstructor) for this class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `file_path` is missing.
    pub fn construct(
        context: &BackendContext,
        settings: &toml::Table,
    ) -> Result<Rc<dyn Backend>, Error> {
        let file_path = string_setting(settings, "file_path")?.ok_or_else(|| {
            Error::config(format!(
                "jsonfile backend on chain '{}' requires settings.file_path",
                context.chain_name
            ))
        })?;
        Ok(Rc::new(Self::new(context.resolve_path(file_path))))
    }

    /// File the registry is persisted to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Registry, Error> {
        if !self.path.exists() {
            return Ok(Registry::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::io_with(format!("failed to read '{}'", self.path.display()), e)
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::config_with(format!("malformed registrar file '{}'", self.path.display()), e)
        })
    }

    fn store(&self, registry: &Registry) -> Result<(), Error> {
        let content = serde_json::to_string_pretty(registry).map_err(|e| {
            Error::io_with(format!("failed to encode '{}'", self.path.display()), e)
        })?;
        std::fs::write(&self.path, content).map_err(|e| {
            Error::io_with(format!("failed to write '{}'", self.path.display()), e)
        })
    }
}

impl Backend for JsonFileBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::REGISTRAR
    }

    fn get_contract_address(&self, name: &str) -> Result<Address, Error> {
        self.load()?
            .get(name)
            .copied()
            .ok_or_else(|| Error::ContractNotFound(name.to_owned()))
    }

    fn set_contract_address(&self, name: &str, address: Address) -> Result<(), Error> {
        let mut registry = self.load()?;
        registry.insert(name.to_owned(), address);
        self.store(&registry)?;
        tracing::debug!(
            contract = name,
            %address,
            path = %self.path.display(),
            "address registered"
        );
        Ok(())
    }
}
