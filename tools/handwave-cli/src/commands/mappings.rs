//! Print the mapping table and the policy chain.

use std::path::PathBuf;

use handwave_mapper::ActionMapper;
use handwave_model::mapping::GestureMapping;

pub fn run(file: Option<PathBuf>, config: Option<PathBuf>) -> anyhow::Result<()> {
    let config = super::load_config(config.as_deref())?;
    let table = super::load_table(file.as_deref())?;
    let mapper = ActionMapper::with_table(table, &config.gesture.mapper);

    println!("{:<18} {:<16} flags", "gesture", "action");
    for mapping in mapper.table().iter() {
        println!(
            "{:<18} {:<16} {}",
            mapping.gesture_type.as_str(),
            mapping.action,
            flags(mapping, config.gesture.classifier.hold_ms)
        );
    }

    println!();
    println!("Policies (in order):");
    for (i, description) in mapper.policies().descriptions().iter().enumerate() {
        println!("  {}. {description}", i + 1);
    }
    Ok(())
}

fn flags(mapping: &GestureMapping, default_hold_ms: u64) -> String {
    let mut flags = Vec::new();
    if mapping.global {
        flags.push("global".to_string());
    }
    if mapping.require_focus {
        flags.push("require-focus".to_string());
    }
    if mapping.continuous {
        flags.push("continuous".to_string());
    }
    flags.push(format!("hold {} ms", mapping.hold_ms.unwrap_or(default_hold_ms)));
    if let Some(threshold) = mapping.confidence_threshold {
        flags.push(format!("threshold {threshold:.2}"));
    }
    flags.join(", ")
}
