//! Project contracts backend: serves compiled artifacts from the project's
//! build output.
//!
//! The artifacts file (`settings.artifacts_path`, default
//! `build/contracts.json`) maps contract names to
//! `{ "bytecode", "bytecode_runtime", "abi" }`. It is read once, on first
//! use, and cached for the rest of the session.

use std::cell::OnceCell;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{Backend, BackendContext, Capabilities, string_setting};
use crate::contract::ContractData;
use crate::error::Error;

/// Class identifier of [`ProjectContractsBackend`].
pub const CLASS: &str = "project";

/// Default location of the compiled artifacts.
pub const DEFAULT_ARTIFACTS_PATH: &str = "build/contracts.json";

type Artifacts = IndexMap<String, ContractData>;

/// Provider and store over a compiled artifacts file.
#[derive(Debug)]
pub struct ProjectContractsBackend {
    path: PathBuf,
    artifacts: OnceCell<Artifacts>,
}

impl ProjectContractsBackend {
    /// A backend reading artifacts from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            artifacts: OnceCell::new(),
        }
    }

    /// [`BackendConstructor`](super::BackendConstructor) for this class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `artifacts_path` is not a string.
    pub fn construct(
        context: &BackendContext,
        settings: &toml::Table,
    ) -> Result<Rc<dyn Backend>, Error> {
        let path = string_setting(settings, "artifacts_path")?.unwrap_or(DEFAULT_ARTIFACTS_PATH);
        Ok(Rc::new(Self::new(context.resolve_path(path))))
    }

    fn artifacts(&self) -> Result<&Artifacts, Error> {
        if let Some(artifacts) = self.artifacts.get() {
            return Ok(artifacts);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::io_with(
                format!("failed to read compiled contracts '{}'", self.path.display()),
                e,
            )
        })?;
        let artifacts: Artifacts = serde_json::from_str(&content).map_err(|e| {
            Error::config_with(
                format!("malformed compiled contracts '{}'", self.path.display()),
                e,
            )
        })?;
        tracing::debug!(
            path = %self.path.display(),
            contracts = artifacts.len(),
            "compiled contracts loaded"
        );
        Ok(self.artifacts.get_or_init(|| artifacts))
    }
}

impl Backend for ProjectContractsBackend {
    fn capabilities(&self) -> Capabilities {
        Capabilities::PROVIDER | Capabilities::STORE
    }

    fn get_contract_data(&self, name: &str) -> Result<ContractData, Error> {
        self.artifacts()?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ContractNotFound(name.to_owned()))
    }

    fn contract_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.artifacts()?.keys().cloned().collect())
    }
}
