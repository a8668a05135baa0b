//! Gesture-to-action mappings.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use handwave_common::error::{HandwaveError, HandwaveResult};

use crate::gesture::GestureType;

/// Well-known action names.
pub mod actions {
    pub const OPEN_LAUNCHER: &str = "open-launcher";
    pub const MINIMIZE_WINDOW: &str = "minimize-window";
    pub const MAXIMIZE_WINDOW: &str = "maximize-window";
    pub const RESTORE_WINDOW: &str = "restore-window";
    pub const CONFIRM: &str = "confirm";
    pub const DRAG: &str = "drag";
    pub const CLICK: &str = "click";
    pub const PREVIOUS_WINDOW: &str = "previous-window";
    pub const NEXT_WINDOW: &str = "next-window";
}

/// Binding of one gesture type to a named action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureMapping {
    #[serde(rename = "gesture")]
    pub gesture_type: GestureType,

    pub action: String,

    /// Only dispatch while some window has focus.
    #[serde(default)]
    pub require_focus: bool,

    /// Dispatch regardless of focus.
    #[serde(default)]
    pub global: bool,

    /// Per-gesture hold time, overriding the classifier default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_ms: Option<u64>,

    /// Per-gesture confidence threshold, overriding the mapper default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,

    /// The action is a continuous manipulation fed by repeated events.
    #[serde(default)]
    pub continuous: bool,
}

impl GestureMapping {
    pub fn new(gesture_type: GestureType, action: impl Into<String>) -> Self {
        Self {
            gesture_type,
            action: action.into(),
            require_focus: false,
            global: false,
            hold_ms: None,
            confidence_threshold: None,
            continuous: false,
        }
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn require_focus(mut self) -> Self {
        self.require_focus = true;
        self
    }

    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    pub fn with_hold_ms(mut self, hold_ms: u64) -> Self {
        self.hold_ms = Some(hold_ms);
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = Some(threshold);
        self
    }

    fn validate(&self) -> HandwaveResult<()> {
        if self.action.trim().is_empty() {
            return Err(HandwaveError::mapping(format!(
                "mapping for {} has an empty action",
                self.gesture_type
            )));
        }
        if let Some(threshold) = self.confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(HandwaveError::mapping(format!(
                    "mapping for {} has confidence_threshold {threshold} outside [0, 1]",
                    self.gesture_type
                )));
            }
        }
        Ok(())
    }
}

/// Serializable mapping document, used for bulk replacement and overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub mappings: Vec<GestureMapping>,
}

impl MappingConfig {
    /// Parse and validate a JSON mapping document.
    pub fn parse(json: &str) -> HandwaveResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a mapping document from disk.
    pub fn load_from(path: &Path) -> HandwaveResult<Self> {
        if !path.exists() {
            return Err(HandwaveError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Each gesture may appear once, every mapping must be well-formed.
    pub fn validate(&self) -> HandwaveResult<()> {
        let mut seen = HashSet::new();
        for mapping in &self.mappings {
            mapping.validate()?;
            if !seen.insert(mapping.gesture_type) {
                return Err(HandwaveError::mapping(format!(
                    "gesture {} is mapped more than once",
                    mapping.gesture_type
                )));
            }
        }
        Ok(())
    }
}

/// Partial override of one mapping. Absent fields keep their current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingPatch {
    #[serde(rename = "gesture")]
    pub gesture_type: GestureType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_focus: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuous: Option<bool>,
}

impl MappingPatch {
    pub fn new(gesture_type: GestureType) -> Self {
        Self {
            gesture_type,
            action: None,
            require_focus: None,
            global: None,
            hold_ms: None,
            confidence_threshold: None,
            continuous: None,
        }
    }

    fn apply_to(&self, mapping: &mut GestureMapping) {
        if let Some(action) = &self.action {
            mapping.action = action.clone();
        }
        if let Some(require_focus) = self.require_focus {
            mapping.require_focus = require_focus;
        }
        if let Some(global) = self.global {
            mapping.global = global;
        }
        if let Some(hold_ms) = self.hold_ms {
            mapping.hold_ms = Some(hold_ms);
        }
        if let Some(threshold) = self.confidence_threshold {
            mapping.confidence_threshold = Some(threshold);
        }
        if let Some(continuous) = self.continuous {
            mapping.continuous = continuous;
        }
    }

    /// A mapping for a gesture the table does not have yet.
    fn to_mapping(&self) -> HandwaveResult<GestureMapping> {
        let action = self.action.as_ref().ok_or_else(|| {
            HandwaveError::mapping(format!(
                "gesture {} is unmapped, its override must name an action",
                self.gesture_type
            ))
        })?;
        let mut mapping = GestureMapping::new(self.gesture_type, action.clone());
        self.apply_to(&mut mapping);
        Ok(mapping)
    }
}

impl From<GestureMapping> for MappingPatch {
    fn from(mapping: GestureMapping) -> Self {
        Self {
            gesture_type: mapping.gesture_type,
            action: Some(mapping.action),
            require_focus: Some(mapping.require_focus),
            global: Some(mapping.global),
            hold_ms: mapping.hold_ms,
            confidence_threshold: mapping.confidence_threshold,
            continuous: Some(mapping.continuous),
        }
    }
}

/// Override document merged into the live table per gesture type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingPatchConfig {
    pub mappings: Vec<MappingPatch>,
}

impl MappingPatchConfig {
    pub fn parse(json: &str) -> HandwaveResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> HandwaveResult<Self> {
        if !path.exists() {
            return Err(HandwaveError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Each gesture may appear once.
    pub fn validate(&self) -> HandwaveResult<()> {
        let mut seen = HashSet::new();
        for patch in &self.mappings {
            if !seen.insert(patch.gesture_type) {
                return Err(HandwaveError::mapping(format!(
                    "gesture {} is overridden more than once",
                    patch.gesture_type
                )));
            }
        }
        Ok(())
    }
}

impl From<MappingConfig> for MappingPatchConfig {
    fn from(config: MappingConfig) -> Self {
        Self {
            mappings: config.mappings.into_iter().map(MappingPatch::from).collect(),
        }
    }
}

/// The live mapping table, keyed by gesture type.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingTable {
    entries: BTreeMap<GestureType, GestureMapping>,
}

impl MappingTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The table seeded at construction.
    pub fn with_defaults() -> Self {
        use actions::*;

        let mut table = Self::empty();
        for mapping in [
            GestureMapping::new(GestureType::OpenPalm, OPEN_LAUNCHER).global(),
            GestureMapping::new(GestureType::ClosedFist, MINIMIZE_WINDOW).require_focus(),
            GestureMapping::new(GestureType::ThumbsUp, CONFIRM).global(),
            GestureMapping::new(GestureType::Pinch, DRAG)
                .require_focus()
                .continuous()
                .with_hold_ms(80)
                .with_confidence_threshold(0.8),
            GestureMapping::new(GestureType::PushForward, CLICK),
            GestureMapping::new(GestureType::SwipeLeft, PREVIOUS_WINDOW).global(),
            GestureMapping::new(GestureType::SwipeRight, NEXT_WINDOW).global(),
            GestureMapping::new(GestureType::TwoFingerSpread, MAXIMIZE_WINDOW).require_focus(),
            GestureMapping::new(GestureType::TwoFingerPinch, RESTORE_WINDOW).require_focus(),
        ] {
            table.insert(mapping);
        }
        table
    }

    /// Build a table holding exactly the mappings of a document.
    pub fn from_config(config: &MappingConfig) -> HandwaveResult<Self> {
        config.validate()?;
        let mut table = Self::empty();
        for mapping in &config.mappings {
            table.insert(mapping.clone());
        }
        Ok(table)
    }

    pub fn get(&self, gesture_type: GestureType) -> Option<&GestureMapping> {
        self.entries.get(&gesture_type)
    }

    /// Add or replace the mapping for its gesture type.
    pub fn insert(&mut self, mapping: GestureMapping) -> Option<GestureMapping> {
        self.entries.insert(mapping.gesture_type, mapping)
    }

    /// Modify an existing mapping in place. Returns `false` if unmapped.
    pub fn update(
        &mut self,
        gesture_type: GestureType,
        f: impl FnOnce(&mut GestureMapping),
    ) -> bool {
        match self.entries.get_mut(&gesture_type) {
            Some(mapping) => {
                f(mapping);
                // the key is authoritative
                mapping.gesture_type = gesture_type;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, gesture_type: GestureType) -> Option<GestureMapping> {
        self.entries.remove(&gesture_type)
    }

    /// Replace the whole table with a document's mappings.
    pub fn replace(&mut self, config: &MappingConfig) -> HandwaveResult<()> {
        *self = Self::from_config(config)?;
        Ok(())
    }

    /// Merge overrides into the table field by field. Nothing changes
    /// unless every patched mapping is valid.
    pub fn patch(&mut self, config: &MappingPatchConfig) -> HandwaveResult<()> {
        config.validate()?;
        let mut entries = self.entries.clone();
        for patch in &config.mappings {
            match entries.get_mut(&patch.gesture_type) {
                Some(mapping) => patch.apply_to(mapping),
                None => {
                    entries.insert(patch.gesture_type, patch.to_mapping()?);
                }
            }
        }
        for patch in &config.mappings {
            if let Some(mapping) = entries.get(&patch.gesture_type) {
                mapping.validate()?;
            }
        }
        self.entries = entries;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GestureMapping> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Per-gesture hold times set by mappings.
    pub fn hold_overrides(&self) -> BTreeMap<GestureType, u64> {
        self.entries
            .values()
            .filter_map(|m| m.hold_ms.map(|hold| (m.gesture_type, hold)))
            .collect()
    }

    /// Snapshot as a serializable document.
    pub fn to_config(&self) -> MappingConfig {
        MappingConfig {
            mappings: self.entries.values().cloned().collect(),
        }
    }
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
