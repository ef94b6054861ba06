//! Class identifier → constructor mapping for contract backends.

use std::collections::HashMap;
use std::rc::Rc;

use super::{Backend, BackendContext, jsonfile, memory, project};
use crate::chain::BackendConfig;
use crate::error::Error;

/// Builds a backend from its chain context and `settings` table.
///
/// Constructors must not touch the network.
pub type BackendConstructor = fn(&BackendContext, &toml::Table) -> Result<Rc<dyn Backend>, Error>;

/// Explicit registry of backend implementations.
///
/// [`BackendRegistry::default`] knows the built-in classes:
///
/// | Class | Roles |
/// |-------|-------|
/// | `memory` | registrar |
/// | `jsonfile` | registrar |
/// | `project` | provider, store |
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    constructors: HashMap<String, BackendConstructor>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(memory::CLASS, memory::MemoryBackend::construct)
            .register(jsonfile::CLASS, jsonfile::JsonFileBackend::construct)
            .register(project::CLASS, project::ProjectContractsBackend::construct);
        registry
    }
}

impl BackendRegistry {
    /// A registry with no classes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers `constructor` under `class`, replacing any previous entry.
    pub fn register(
        &mut self,
        class: impl Into<String>,
        constructor: BackendConstructor,
    ) -> &mut Self {
        self.constructors.insert(class.into(), constructor);
        self
    }

    /// Whether `class` is registered.
    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }

    /// Instantiates the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBackend`] if the class is not registered, or
    /// whatever the constructor reports for invalid settings.
    pub fn build(
        &self,
        config: &BackendConfig,
        context: &BackendContext,
    ) -> Result<Rc<dyn Backend>, Error> {
        let constructor =
            self.constructors
                .get(&config.class)
                .ok_or_else(|| Error::UnknownBackend {
                    backend: config.name.clone(),
                    class: config.class.clone(),
                })?;
        let backend = constructor(context, &config.settings)?;
        tracing::debug!(
            chain = %context.chain_name,
            backend = %config.name,
            class = %config.class,
            capabilities = ?backend.capabilities(),
            "backend constructed"
        );
        Ok(backend)
    }
}
