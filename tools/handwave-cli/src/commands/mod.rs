pub mod config;
pub mod mappings;
pub mod replay;
pub mod synth;

use std::path::Path;

use anyhow::Context;
use handwave_common::config::{mappings_file_path, AppConfig};
use handwave_model::mapping::{MappingConfig, MappingPatchConfig, MappingTable};

/// Explicit config file, or the user config with defaults as fallback.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AppConfig::load()),
    }
}

/// An explicit mapping document replaces the defaults. The user mapping
/// file, if present, overrides them field by field.
pub fn load_table(path: Option<&Path>) -> anyhow::Result<MappingTable> {
    if let Some(path) = path {
        let doc = MappingConfig::load_from(path)
            .with_context(|| format!("Failed to load mappings {}", path.display()))?;
        return Ok(MappingTable::from_config(&doc)?);
    }

    let mut table = MappingTable::with_defaults();
    let user = mappings_file_path();
    if user.exists() {
        let doc = MappingPatchConfig::load_from(&user)
            .with_context(|| format!("Failed to load mappings {}", user.display()))?;
        table.patch(&doc)?;
        tracing::info!(path = %user.display(), "Applied user mapping overrides");
    }
    Ok(table)
}
