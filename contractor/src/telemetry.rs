//! Console logging setup.
//!
//! Provides [`Telemetry`], a small builder around `tracing-subscriber`.
//! Events go to stderr so command output on stdout stays clean.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration for the CLI.
#[derive(Debug, Default)]
pub struct Telemetry {
    name: Option<String>,
    log_level: Option<String>,
}

impl Telemetry {
    /// Creates a new, empty [`Telemetry`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name reported at startup.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the filter used when `RUST_LOG` is not set.
    ///
    /// Accepts any valid [`EnvFilter`] directive string (e.g. `"debug"`,
    /// `"contractor=debug,reqwest=warn"`).
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Installs the global subscriber.
    pub fn register(self) {
        let fallback = self.log_level.as_deref().unwrap_or("warn");
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();

        tracing::debug!(
            service = self.name.as_deref().unwrap_or(env!("CARGO_PKG_NAME")),
            version = env!("CARGO_PKG_VERSION"),
            "console logging registered"
        );
    }
}
