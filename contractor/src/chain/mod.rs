//! Chain sessions and the backend plumbing behind them.
//!
//! - [`resolve`] merges chain-level backend entries with project overrides
//!   and orders them by priority.
//! - [`Provider`], [`Registrar`], [`Store`] aggregate the backends playing
//!   each role.
//! - [`ChainSession`] owns the backend cache, the façades and the live
//!   connection for one named chain.

mod config;
mod resolver;
mod roles;
mod session;

pub use self::config::{BackendConfig, describe_backend_configs};
pub use self::resolver::resolve;
pub use self::roles::{Provider, Registrar, Store};
pub use self::session::{ChainSession, RunningChain};
