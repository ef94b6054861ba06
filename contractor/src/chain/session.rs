//! Chain session: resolved backends, role façades and the live connection
//! for one named chain.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::rc::Rc;

use alloy_primitives::Address;
use indexmap::IndexMap;

use super::config::{BackendConfig, describe_backend_configs};
use super::resolver::resolve;
use super::roles::{Provider, Registrar, Store};
use crate::backend::{Backend, BackendContext, BackendRegistry, Role};
use crate::config::{ChainConfig, ProjectConfig, RawBackends};
use crate::contract::{Contract, ContractFactory};
use crate::deploy::{DeployOptions, Deployment, deploy_contract_and_verify};
use crate::error::Error;
use crate::web3::{Connector, Web3, has_code, http_connector};

/// State for one configured chain.
///
/// Backends and façades are built on first use and cached for the life of
/// the session. The live connection is only available while the session is
/// running (see [`ChainSession::enter`]) and is dropped on exit.
///
/// Sessions are single-threaded.
pub struct ChainSession {
    name: String,
    config: ChainConfig,
    backend_configs: IndexMap<String, BackendConfig>,
    context: BackendContext,
    registry: BackendRegistry,
    connector: Connector,
    backends: IndexMap<String, Rc<dyn Backend>>,
    provider: Option<Provider>,
    registrar: Option<Registrar>,
    store: Option<Store>,
    web3: Option<Rc<dyn Web3>>,
    running: bool,
}

impl fmt::Debug for ChainSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainSession")
            .field("name", &self.name)
            .field("backends", &self.backend_configs.keys().collect::<Vec<_>>())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl ChainSession {
    /// Resolves `config`'s backends against project-level `overrides`.
    ///
    /// Relative paths in backend settings resolve against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a merged backend entry is
    /// malformed.
    pub fn new(
        name: impl Into<String>,
        config: ChainConfig,
        overrides: &RawBackends,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let name = name.into();
        let backend_configs = resolve(&config.contracts.backends, overrides)?;
        tracing::debug!(
            chain = %name,
            backends = ?backend_configs.keys().collect::<Vec<_>>(),
            "chain backends resolved"
        );
        Ok(Self {
            context: BackendContext::new(name.clone(), base_dir),
            name,
            config,
            backend_configs,
            registry: BackendRegistry::default(),
            connector: http_connector(),
            backends: IndexMap::new(),
            provider: None,
            registrar: None,
            store: None,
            web3: None,
            running: false,
        })
    }

    /// Session for the chain `name` of a loaded project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the chain is not configured or
    /// its backends are malformed.
    pub fn from_project(project: &ProjectConfig, name: &str) -> Result<Self, Error> {
        let config = project.chain(name)?.clone();
        Self::new(
            name,
            config,
            &project.contracts.backends,
            project.base_dir.clone(),
        )
    }

    /// Uses `registry` to instantiate backends.
    #[must_use]
    pub fn with_registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Uses `connector` to open the live connection.
    #[must_use]
    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    /// Chain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chain configuration.
    #[must_use]
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Resolved backend configuration, in priority order.
    #[must_use]
    pub const fn backend_configs(&self) -> &IndexMap<String, BackendConfig> {
        &self.backend_configs
    }

    /// Marks the session running until the returned guard is dropped.
    pub fn enter(&mut self) -> RunningChain<'_> {
        self.running = true;
        tracing::debug!(chain = %self.name, "chain session entered");
        RunningChain { session: self }
    }

    /// Stops the session and drops the live connection.
    pub fn exit(&mut self) {
        self.running = false;
        self.web3 = None;
        tracing::debug!(chain = %self.name, "chain session exited");
    }

    /// Whether the session is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// The live connection, opened on first use within a running period.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] outside a running period, or whatever
    /// the connector reports.
    pub fn web3(&mut self) -> Result<Rc<dyn Web3>, Error> {
        if !self.running {
            return Err(Error::NotRunning);
        }
        if let Some(web3) = &self.web3 {
            return Ok(Rc::clone(web3));
        }
        let web3 = (self.connector)(&self.config.web3)?;
        tracing::debug!(chain = %self.name, "web3 connected");
        self.web3 = Some(Rc::clone(&web3));
        Ok(web3)
    }

    /// The backend configured under `name`, constructed on first access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown name and
    /// [`Error::UnknownBackend`] for an unregistered class.
    pub fn get_backend(&mut self, name: &str) -> Result<Rc<dyn Backend>, Error> {
        if let Some(backend) = self.backends.get(name) {
            return Ok(Rc::clone(backend));
        }
        let config = self.backend_configs.get(name).ok_or_else(|| {
            Error::config(format!(
                "chain '{}' has no backend named '{name}'",
                self.name
            ))
        })?;
        let backend = self.registry.build(config, &self.context)?;
        self.backends.insert(name.to_owned(), Rc::clone(&backend));
        Ok(backend)
    }

    /// Every configured backend, in priority order.
    ///
    /// # Errors
    ///
    /// See [`Self::get_backend`].
    pub fn get_backends(&mut self) -> Result<IndexMap<String, Rc<dyn Backend>>, Error> {
        let names: Vec<String> = self.backend_configs.keys().cloned().collect();
        names
            .into_iter()
            .map(|name| self.get_backend(&name).map(|backend| (name, backend)))
            .collect()
    }

    fn backends_for(&mut self, role: Role) -> Result<IndexMap<String, Rc<dyn Backend>>, Error> {
        let mut backends = self.get_backends()?;
        backends.retain(|_, backend| backend.capabilities().contains(role.capability()));
        Ok(backends)
    }

    /// Provider façade over every provider backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBackend`] if no backend declares the role.
    pub fn provider(&mut self) -> Result<&Provider, Error> {
        let provider = match self.provider.take() {
            Some(provider) => provider,
            None => {
                let backends = self.backends_for(Role::Provider)?;
                Provider::new(backends, &describe_backend_configs(&self.backend_configs))?
            }
        };
        Ok(self.provider.insert(provider))
    }

    /// Registrar façade over every registrar backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBackend`] if no backend declares the role.
    pub fn registrar(&mut self) -> Result<&Registrar, Error> {
        let registrar = match self.registrar.take() {
            Some(registrar) => registrar,
            None => {
                let backends = self.backends_for(Role::Registrar)?;
                Registrar::new(backends, &describe_backend_configs(&self.backend_configs))?
            }
        };
        Ok(self.registrar.insert(registrar))
    }

    /// Store façade over every store backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoBackend`] if no backend declares the role.
    pub fn store(&mut self) -> Result<&Store, Error> {
        let store = match self.store.take() {
            Some(store) => store,
            None => {
                let backends = self.backends_for(Role::Store)?;
                Store::new(backends, &describe_backend_configs(&self.backend_configs))?
            }
        };
        Ok(self.store.insert(store))
    }

    /// A factory for `name` bound to the live connection.
    ///
    /// The configured default account, if any, becomes the sender.
    ///
    /// # Errors
    ///
    /// Requires a running session and a provider that knows `name`.
    pub fn get_contract_factory(&mut self, name: &str) -> Result<ContractFactory, Error> {
        let web3 = self.web3()?;
        let factory = self.provider()?.get_contract_factory(name, web3)?;
        Ok(match self.config.web3.default_account {
            Some(sender) => factory.with_sender(sender),
            None => factory,
        })
    }

    /// Registered address of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractNotFound`] if no registrar knows it.
    pub fn get_contract_address(&mut self, name: &str) -> Result<Address, Error> {
        self.registrar()?.get_contract_address(name)
    }

    /// Whether `name` is registered and code exists at its address.
    ///
    /// # Errors
    ///
    /// Requires a running session; propagates registrar and RPC failures
    /// other than "not found".
    pub fn is_contract_available(&mut self, name: &str) -> Result<bool, Error> {
        let address = match self.get_contract_address(name) {
            Ok(address) => address,
            Err(Error::ContractNotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let code = self.web3()?.get_code(address)?;
        Ok(has_code(&code))
    }

    /// Handle to the registered deployment of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractNotFound`] unless the contract is available.
    pub fn get_contract(&mut self, name: &str) -> Result<Contract, Error> {
        if !self.is_contract_available(name)? {
            return Err(Error::ContractNotFound(name.to_owned()));
        }
        let address = self.get_contract_address(name)?;
        Ok(self.get_contract_factory(name)?.at(address))
    }

    /// The registered deployment of `name`, deploying and registering it
    /// first if it is not available. The [`Deployment`] is returned only
    /// when a deployment happened.
    ///
    /// # Errors
    ///
    /// See [`deploy_contract_and_verify`].
    pub fn get_or_deploy_contract(
        &mut self,
        name: &str,
        options: &DeployOptions,
    ) -> Result<(Contract, Option<Deployment>), Error> {
        if self.is_contract_available(name)? {
            return Ok((self.get_contract(name)?, None));
        }
        let factory = self.get_contract_factory(name)?;
        let deployment = deploy_contract_and_verify(&factory, options)?;
        let address = deployment.contract.address();
        self.registrar()?.set_contract_address(name, address)?;
        tracing::info!(chain = %self.name, contract = name, %address, "contract deployed and registered");
        Ok((deployment.contract.clone(), Some(deployment)))
    }
}

/// Guard over a running [`ChainSession`]; exits the session when dropped.
#[derive(Debug)]
pub struct RunningChain<'a> {
    session: &'a mut ChainSession,
}

impl Deref for RunningChain<'_> {
    type Target = ChainSession;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl DerefMut for RunningChain<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl Drop for RunningChain<'_> {
    fn drop(&mut self) {
        self.session.exit();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::testing::{ACCOUNT, DEPLOYED_ADDRESS, MockWeb3, counting_connector};

    const CHAIN: &str = r#"
[web3]
rpc_url = "http://127.0.0.1:8545"

[contracts.backends.Slow]
class = "memory"
priority = 10

[contracts.backends.Project]
class = "project"
priority = 1

[contracts.backends.Fast]
class = "memory"
priority = 5
"#;

    const ARTIFACTS: &str = r#"{ "Math": { "bytecode": "0x6060604052" } }"#;

    struct Fixture {
        _dir: tempfile::TempDir,
        session: ChainSession,
        web3: Rc<MockWeb3>,
        connects: Rc<Cell<usize>>,
    }

    fn fixture_with(chain: &str, web3: MockWeb3) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("build")).expect("build dir");
        std::fs::write(dir.path().join("build/contracts.json"), ARTIFACTS).expect("artifacts");
        let config: ChainConfig = toml::from_str(chain).expect("chain config");
        let web3 = Rc::new(web3);
        let (connector, connects) = counting_connector(Rc::clone(&web3));
        let session = ChainSession::new("local", config, &RawBackends::new(), dir.path())
            .expect("session")
            .with_connector(connector);
        Fixture {
            _dir: dir,
            session,
            web3,
            connects,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(CHAIN, MockWeb3::default())
    }

    #[test]
    fn web3_requires_a_running_session() {
        let mut fx = fixture();
        assert!(matches!(fx.session.web3(), Err(Error::NotRunning)));
        {
            let mut running = fx.session.enter();
            assert!(running.is_running());
            let first = running.web3().expect("first");
            let second = running.web3().expect("second");
            assert!(Rc::ptr_eq(&first, &second));
        }
        assert_eq!(fx.connects.get(), 1);
        assert!(!fx.session.is_running());
        assert!(matches!(fx.session.web3(), Err(Error::NotRunning)));
    }

    #[test]
    fn explicit_exit_stops_the_session() {
        let mut fx = fixture();
        let mut running = fx.session.enter();
        running.web3().expect("connected");
        running.exit();
        assert!(matches!(running.web3(), Err(Error::NotRunning)));
    }

    #[test]
    fn early_return_through_the_guard_stops_the_session() {
        fn fails_midway(session: &mut ChainSession) -> Result<(), Error> {
            let mut running = session.enter();
            running.web3()?;
            running.get_contract_address("Math")?;
            Ok(())
        }

        let mut fx = fixture();
        let err = fails_midway(&mut fx.session).unwrap_err();
        assert!(matches!(err, Error::ContractNotFound(_)));
        assert!(!fx.session.is_running());
        assert!(matches!(fx.session.web3(), Err(Error::NotRunning)));
    }

    #[test]
    fn connection_is_reopened_per_running_period() {
        let mut fx = fixture();
        for _ in 0..2 {
            let mut running = fx.session.enter();
            running.web3().expect("connected");
        }
        assert_eq!(fx.connects.get(), 2);
    }

    #[test]
    fn backend_cache_survives_exit() {
        let mut fx = fixture();
        let before = {
            let mut running = fx.session.enter();
            running.get_backend("Fast").expect("fast")
        };
        let after = fx.session.get_backend("Fast").expect("fast again");
        assert!(Rc::ptr_eq(&before, &after));
    }

    #[test]
    fn backends_are_listed_in_priority_order() {
        let mut fx = fixture();
        fx.session.get_backend("Slow").expect("slow first");
        let backends = fx.session.get_backends().expect("backends");
        assert_eq!(
            backends.keys().collect::<Vec<_>>(),
            vec!["Project", "Fast", "Slow"]
        );
    }

    #[test]
    fn unknown_backend_name_is_a_configuration_error() {
        let mut fx = fixture();
        assert!(matches!(
            fx.session.get_backend("Ghost"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn unknown_class_fails_at_construction() {
        let chain = r#"
[web3]
rpc_url = "http://127.0.0.1:8545"

[contracts.backends.Odd]
class = "does.not.Exist"
"#;
        let mut fx = fixture_with(chain, MockWeb3::default());
        assert!(matches!(
            fx.session.get_backends(),
            Err(Error::UnknownBackend { .. })
        ));
    }

    #[test]
    fn facades_hold_role_backends_in_priority_order() {
        let mut fx = fixture();
        assert_eq!(fx.session.registrar().expect("registrar").names(), vec!["Fast", "Slow"]);
        assert_eq!(fx.session.provider().expect("provider").names(), vec!["Project"]);
        assert_eq!(fx.session.store().expect("store").names(), vec!["Project"]);
    }

    #[test]
    fn missing_role_reports_configuration() {
        let chain = r#"
[web3]
rpc_url = "http://127.0.0.1:8545"

[contracts.backends.Memory]
class = "memory"
"#;
        let mut fx = fixture_with(chain, MockWeb3::default());
        let err = fx.session.provider().unwrap_err();
        assert!(matches!(err, Error::NoBackend { role: Role::Provider, .. }));
        assert!(err.to_string().contains("Memory: class=memory, priority=0"));
    }

    #[test]
    fn project_overrides_are_applied() {
        let config: ChainConfig = toml::from_str(CHAIN).expect("chain config");
        let overrides: RawBackends = toml::from_str("[Slow]\npriority = 0").expect("overrides");
        let mut session =
            ChainSession::new("local", config, &overrides, ".").expect("session");
        assert_eq!(
            session.registrar().expect("registrar").names(),
            vec!["Slow", "Fast"]
        );
    }

    #[test]
    fn unregistered_contract_is_unavailable() {
        let mut fx = fixture();
        let mut running = fx.session.enter();
        assert!(!running.is_contract_available("Math").expect("checked"));
        assert!(matches!(
            running.get_contract("Math"),
            Err(Error::ContractNotFound(_))
        ));
    }

    #[test]
    fn registered_address_without_code_is_unavailable() {
        let mut fx = fixture();
        let registered = fx.session.get_backend("Fast").expect("fast");
        registered
            .set_contract_address("Math", Address::repeat_byte(0x99))
            .expect("registered");
        let mut running = fx.session.enter();
        assert!(!running.is_contract_available("Math").expect("checked"));
    }

    #[test]
    fn registered_address_with_code_is_available() {
        let address = Address::repeat_byte(0x77);
        let mut fx = fixture_with(CHAIN, MockWeb3::default().with_code(address, "0x6001"));
        fx.session
            .get_backend("Slow")
            .expect("slow")
            .set_contract_address("Math", address)
            .expect("registered");
        let mut running = fx.session.enter();
        assert!(running.is_contract_available("Math").expect("checked"));
        assert_eq!(running.get_contract("Math").expect("contract").address(), address);
    }

    #[test]
    fn get_or_deploy_deploys_once() {
        let mut fx = fixture();
        let mut running = fx.session.enter();
        let options = DeployOptions {
            timeout: std::time::Duration::from_millis(50),
            poll_interval: std::time::Duration::from_millis(1),
        };

        let (contract, deployment) = running
            .get_or_deploy_contract("Math", &options)
            .expect("deployed");
        assert_eq!(contract.address(), DEPLOYED_ADDRESS);
        assert!(deployment.is_some());
        assert_eq!(
            running.get_contract_address("Math").expect("registered"),
            DEPLOYED_ADDRESS
        );

        let (again, deployment) = running
            .get_or_deploy_contract("Math", &options)
            .expect("reused");
        assert_eq!(again.address(), DEPLOYED_ADDRESS);
        assert!(deployment.is_none());
        drop(running);
        assert_eq!(fx.web3.sent_transactions().len(), 1);
    }

    #[test]
    fn default_account_becomes_factory_sender() {
        let config = CHAIN.replace(
            "rpc_url = \"http://127.0.0.1:8545\"",
            &format!("rpc_url = \"http://127.0.0.1:8545\"\ndefault_account = \"{ACCOUNT}\""),
        );
        let mut fx = fixture_with(&config, MockWeb3::default());
        let mut running = fx.session.enter();
        let factory = running.get_contract_factory("Math").expect("factory");
        assert_eq!(factory.sender(), Some(ACCOUNT));
    }

    #[test]
    fn custom_registry_classes_are_used() {
        let mut registry = BackendRegistry::empty();
        registry.register("memory", MemoryBackend::construct);
        let config: ChainConfig = toml::from_str(CHAIN).expect("chain config");
        let mut session = ChainSession::new("local", config, &RawBackends::new(), ".")
            .expect("session")
            .with_registry(registry);
        assert!(matches!(
            session.get_backend("Project"),
            Err(Error::UnknownBackend { ref class, .. }) if class == "project"
        ));
        assert!(session.get_backend("Fast").is_ok());
    }
}
