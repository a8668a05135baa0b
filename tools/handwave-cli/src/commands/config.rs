//! Show, validate, and initialize the configuration file.

use std::path::PathBuf;

use anyhow::Context;

use handwave_common::config::{config_file_path, AppConfig};
use handwave_model::mapping::MappingTable;

pub fn show(path: Option<PathBuf>) -> anyhow::Result<()> {
    let source = path.clone().unwrap_or_else(config_file_path);
    let config = super::load_config(path.as_deref())?;

    if source.exists() {
        println!("# from {}", source.display());
    } else {
        println!("# defaults ({} not found)", source.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub fn validate(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config_file_path);
    println!("Validating config at: {}", path.display());

    let config = AppConfig::load_from(&path)?;
    let g = &config.gesture;
    println!(
        "  Classifier: smoothing {:.2}, threshold {:.2}, hold {} ms, mirrored {}",
        g.classifier.smoothing_factor,
        g.classifier.confidence_threshold,
        g.classifier.hold_ms,
        g.classifier.mirrored
    );
    println!(
        "  Mapper: default threshold {:.2}, rate limit {} ms",
        g.mapper.default_confidence_threshold, g.mapper.rate_limit_ms
    );
    println!("  Session: inactivity {} ms", g.session.inactivity_ms);
    println!("  Logging: level {}", config.logging.level);
    println!("\nConfig is valid.");
    Ok(())
}

pub fn init(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config_file_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    AppConfig::default()
        .save_to(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());

    // a mapping document next to it, as a starting point for overrides
    let mappings = path.with_file_name("mappings.json");
    if !mappings.exists() {
        let doc = MappingTable::with_defaults().to_config();
        std::fs::write(&mappings, serde_json::to_string_pretty(&doc)?)
            .with_context(|| format!("Failed to write {}", mappings.display()))?;
        println!("Wrote default mappings to {}", mappings.display());
    }
    Ok(())
}
