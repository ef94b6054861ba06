//! Merges chain-level backend entries with project overrides into the
//! priority-ordered backend list a chain session instantiates.
//!
//! Override keys win at the field level: an override for `Registrar` that
//! only sets `settings.file_path` keeps the chain's `class` and `priority`.
//! Output is sorted by ascending priority; equal priorities keep declaration
//! order. Class identifiers are not looked up here.

use indexmap::IndexMap;

use super::config::BackendConfig;
use crate::config::RawBackends;
use crate::error::Error;

/// Resolves `raw` chain backends against project `overrides`.
///
/// Overrides naming a backend the chain does not declare are ignored.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if a merged entry is malformed.
pub fn resolve(
    raw: &RawBackends,
    overrides: &RawBackends,
) -> Result<IndexMap<String, BackendConfig>, Error> {
    let mut merged = Vec::with_capacity(raw.len());
    for (index, (name, chain_entry)) in raw.iter().enumerate() {
        let mut entry = chain_entry.clone();
        if let Some(project_entry) = overrides.get(name) {
            merge_tables(&mut entry, project_entry);
        }
        merged.push(BackendConfig::from_table(name, &entry, index)?);
    }

    for name in overrides.keys().filter(|name| !raw.contains_key(*name)) {
        tracing::debug!(backend = %name, "ignoring override for undeclared backend");
    }

    // `sort_by_key` is stable, so equal priorities keep declaration order.
    merged.sort_by_key(|config| config.priority);
    Ok(merged
        .into_iter()
        .map(|config| (config.name.clone(), config))
        .collect())
}

/// Recursively overlays `overlay` onto `base`; overlay values win.
fn merge_tables(base: &mut toml::Table, overlay: &toml::Table) {
    for (key, value) in overlay {
        let both_tables = value.is_table() && base.get(key).is_some_and(toml::Value::is_table);
        if both_tables {
            if let (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) =
                (base.get_mut(key), value)
            {
                merge_tables(base_table, overlay_table);
            }
        } else {
            base.insert(key.clone(), value.clone());
        }
    }
}
