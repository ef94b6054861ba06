//! Configuration loading and default template generation.
//!
//! This module provides:
//!
//! - [`ProjectConfig`] — the parsed project file: chains, project-level
//!   backend overrides and deploy defaults.
//! - [`load_config`] — reads and parses a TOML configuration file.
//! - [`generate_default_config`] — produces a commented TOML template.
//!
//! # Configuration File Format
//!
//! ```toml
//! [contracts.backends.Memory]
//! priority = 5
//!
//! [chains.local.web3]
//! rpc_url = "$RPC_URL"
//!
//! [chains.local.contracts.backends.Memory]
//! class = "memory"
//! priority = 10
//!
//! [deploy]
//! confirmation_timeout_secs = 180
//! ```
//!
//! Table order is preserved, so backends declared without a priority keep
//! their declaration order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::Address;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Raw, unmerged backend entries keyed by backend name.
pub type RawBackends = IndexMap<String, toml::Table>;

/// Top-level project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Chains keyed by name.
    #[serde(default)]
    pub chains: IndexMap<String, ChainConfig>,
    /// Project-level overrides applied on top of every chain's backends.
    #[serde(default)]
    pub contracts: ContractsConfig,
    /// Deploy workflow defaults.
    #[serde(default)]
    pub deploy: DeployConfig,
    /// Directory relative paths in backend settings are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ProjectConfig {
    /// Looks up a chain by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the chain is not configured.
    pub fn chain(&self, name: &str) -> Result<&ChainConfig, Error> {
        self.chains.get(name).ok_or_else(|| {
            Error::config(format!(
                "chain '{name}' is not configured (available: {})",
                self.chains.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

/// Contract backend section, at chain or project level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Backend entries keyed by backend name.
    #[serde(default)]
    pub backends: RawBackends,
}

/// Configuration bundle for one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Network connection settings.
    pub web3: Web3Config,
    /// Chain-level contract backends.
    #[serde(default)]
    pub contracts: ContractsConfig,
}

/// Network connection settings for one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Web3Config {
    /// JSON-RPC endpoint. Supports `$VAR` / `${VAR}` references.
    pub rpc_url: String,
    /// Per-request HTTP timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Account offered by default as transaction sender.
    #[serde(default)]
    pub default_account: Option<Address>,
}

const fn default_request_timeout() -> u64 {
    30
}

impl Web3Config {
    /// Settings for `rpc_url` with default timeouts.
    #[must_use]
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            request_timeout_secs: default_request_timeout(),
            default_account: None,
        }
    }

    /// Resolves environment references and parses the RPC URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a referenced variable is unset or
    /// the URL does not parse.
    pub fn endpoint(&self) -> Result<Url, Error> {
        let raw = resolve_env(&self.rpc_url)?;
        Url::parse(&raw).map_err(|e| Error::config_with(format!("invalid rpc_url '{raw}'"), e))
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Deploy workflow defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// How long to wait for the creation transaction to be mined (default: 180).
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    /// Receipt polling interval in milliseconds (default: 1000). Must be
    /// positive.
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_positive"
    )]
    pub poll_interval_ms: u64,
    /// How long an interactively unlocked account stays unlocked (default: 60).
    #[serde(default = "default_unlock_duration")]
    pub unlock_duration_secs: u64,
}

const fn default_confirmation_timeout() -> u64 {
    180
}

const fn default_poll_interval() -> u64 {
    1000
}

const fn default_unlock_duration() -> u64 {
    60
}

fn deserialize_positive<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match u64::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("must be greater than 0")),
        value => Ok(value),
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: default_confirmation_timeout(),
            poll_interval_ms: default_poll_interval(),
            unlock_duration_secs: default_unlock_duration(),
        }
    }
}

impl DeployConfig {
    /// Confirmation bound.
    #[must_use]
    pub const fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Receipt polling interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Unlock duration requested from the node.
    #[must_use]
    pub const fn unlock_duration(&self) -> Duration {
        Duration::from_secs(self.unlock_duration_secs)
    }
}

/// Resolve an environment-variable reference (`$VAR` or `${VAR}`), returning
/// the literal string unchanged if it does not match either pattern.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the referenced variable is unset.
pub fn resolve_env(value: &str) -> Result<String, Error> {
    let var_name = if let Some(inner) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        Some(inner)
    } else {
        value
            .strip_prefix('$')
            .filter(|name| !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'))
    };

    match var_name {
        Some(name) => std::env::var(name).map_err(|_| {
            Error::config(format!("env var '{name}' not found (referenced as '{value}')"))
        }),
        None => Ok(value.to_owned()),
    }
}

/// Parse configuration from TOML text. `base_dir` is left empty.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the text is not a valid configuration.
pub fn parse_config(content: &str) -> Result<ProjectConfig, Error> {
    toml::from_str(content).map_err(|e| Error::config_with("failed to parse TOML config", e))
}

/// Load configuration from a TOML file at the given path.
///
/// Relative paths in backend settings resolve against the file's directory.
///
/// # Errors
///
/// Returns an error if the file cannot be resolved, read, or parsed.
pub fn load_config(path: &Path) -> Result<ProjectConfig, Error> {
    let config_path = path.canonicalize().map_err(|e| {
        Error::config_with(format!("failed to resolve config path '{}'", path.display()), e)
    })?;
    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        Error::config_with(format!("failed to read config file '{}'", config_path.display()), e)
    })?;
    let mut config: ProjectConfig = toml::from_str(&content).map_err(|e| {
        Error::config_with(format!("failed to parse TOML config '{}'", config_path.display()), e)
    })?;
    config.base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    tracing::debug!(
        path = %config_path.display(),
        chains = config.chains.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Generate a default TOML configuration template.
#[must_use]
pub fn generate_default_config() -> String {
    String::from(
        r#"# contractor configuration

# ── Project-level backend overrides ─────────────────────────────────
# Entries here are merged field by field into the chain-level backend
# of the same name. Override keys win; `settings` tables merge per key.

[contracts.backends.Registrar]
settings = { file_path = "./registrar.json" }

# ── Chains ──────────────────────────────────────────────────────────
# Values support environment variable references: "$VAR" or "${VAR}"

[chains.local.web3]
rpc_url = "http://127.0.0.1:8545"
# default_account = "0x0000000000000000000000000000000000000000"

# Backends are tried in ascending priority. Entries without a priority
# are ordered by declaration.

[chains.local.contracts.backends.Registrar]
class = "jsonfile"
priority = 1

[chains.local.contracts.backends.ProjectContracts]
class = "project"
priority = 2
settings = { artifacts_path = "./build/contracts.json" }

[chains.local.contracts.backends.Memory]
class = "memory"
priority = 50

[chains.mainnet.web3]
rpc_url = "$MAINNET_RPC_URL"

[chains.mainnet.contracts.backends.Registrar]
class = "jsonfile"
priority = 1

[chains.mainnet.contracts.backends.ProjectContracts]
class = "project"
priority = 2

# ── Deployment ──────────────────────────────────────────────────────

[deploy]
confirmation_timeout_secs = 180
poll_interval_ms = 1000
unlock_duration_secs = 60
"#,
    )
}
