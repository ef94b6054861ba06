//! Merged, validated backend configuration.

use std::fmt;

use indexmap::IndexMap;

use crate::error::Error;

/// Configuration of one backend after project overrides are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Backend name, unique within a chain.
    pub name: String,
    /// Implementation identifier looked up in the
    /// [`BackendRegistry`](crate::backend::BackendRegistry).
    pub class: String,
    /// Ordering key; lower is tried first.
    pub priority: i64,
    /// Implementation specific settings.
    pub settings: toml::Table,
}

impl BackendConfig {
    /// Validates a merged raw entry. `declaration_index` becomes the
    /// priority when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `class` is missing or not a
    /// string, `priority` is not an integer, or `settings` is not a table.
    pub fn from_table(
        name: &str,
        table: &toml::Table,
        declaration_index: usize,
    ) -> Result<Self, Error> {
        let class = match table.get("class") {
            Some(toml::Value::String(class)) if !class.is_empty() => class.clone(),
            Some(other) => {
                return Err(Error::config(format!(
                    "backend '{name}': 'class' must be a non-empty string, got {other}"
                )));
            }
            None => {
                return Err(Error::config(format!(
                    "backend '{name}': missing 'class'"
                )));
            }
        };
        let priority = match table.get("priority") {
            Some(toml::Value::Integer(priority)) => *priority,
            Some(other) => {
                return Err(Error::config(format!(
                    "backend '{name}': 'priority' must be an integer, got {}",
                    other.type_str()
                )));
            }
            None => i64::try_from(declaration_index).unwrap_or(i64::MAX),
        };
        let settings = match table.get("settings") {
            Some(toml::Value::Table(settings)) => settings.clone(),
            Some(other) => {
                return Err(Error::config(format!(
                    "backend '{name}': 'settings' must be a table, got {}",
                    other.type_str()
                )));
            }
            None => toml::Table::new(),
        };
        Ok(Self {
            name: name.to_owned(),
            class,
            priority,
            settings,
        })
    }
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: class={}, priority={}",
            self.name, self.class, self.priority
        )?;
        if !self.settings.is_empty() {
            let keys: Vec<&str> = self.settings.keys().map(String::as_str).collect();
            write!(f, ", settings=[{}]", keys.join(", "))?;
        }
        Ok(())
    }
}

/// Renders resolved configurations one per line, for diagnostics.
#[must_use]
pub fn describe_backend_configs(configs: &IndexMap<String, BackendConfig>) -> String {
    if configs.is_empty() {
        return "(no backends configured)".to_owned();
    }
    configs
        .values()
        .map(|config| format!("  {config}"))
        .collect::<Vec<_>>()
        .join("\n")
}
