//! Application configuration.
//!
//! Everything under [`GestureConfig`] can be changed at runtime; the
//! pipeline picks new values up on the next tick.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HandwaveError, HandwaveResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Gesture pipeline tuning.
    pub gesture: GestureConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Tuning for the whole gesture pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub classifier: ClassifierConfig,
    pub tracking: TrackingConfig,
    pub mapper: MapperConfig,
    pub session: SessionConfig,
}

/// Gesture classifier thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Weight of the previous smoothed position, in [0.0, 1.0].
    /// Larger values mean more smoothing.
    pub smoothing_factor: f64,

    /// Minimum running confidence for an event to be emitted.
    pub confidence_threshold: f64,

    /// Minimum time a gesture must be held before it is emitted.
    pub hold_ms: u64,

    /// Whether the camera image is mirrored (selfie view).
    /// Flips the thumb extension test.
    pub mirrored: bool,

    /// Maximum thumb–index tip distance for a pinch (normalized).
    pub pinch_distance: f64,

    /// Index-base depth below which an extended index reads as a push.
    pub push_depth: f64,

    /// Minimum per-frame horizontal palm velocity for a swipe.
    pub swipe_velocity: f64,

    /// Index–middle tip distance separating spread from pinch.
    pub spread_distance: f64,

    /// Weight of the running confidence when a gesture continues.
    pub confidence_decay: f64,
}

/// Physical hand association across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Maximum palm-centre distance for a detection to continue a track.
    pub max_association_distance: f64,

    /// A track unseen for longer than this is dropped.
    pub track_ttl_ms: u64,
}

/// Action mapper defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Confidence threshold for mappings that do not set their own.
    pub default_confidence_threshold: f64,

    /// Minimum gap between two accepted events of the same gesture type.
    pub rate_limit_ms: u64,
}

/// Continuous session (drag) behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// A session with no continuation for this long ends.
    pub inactivity_ms: u64,

    /// Height of the window strip that must stay on screen (px).
    pub title_bar_height: f64,

    /// Width of the window strip that must stay on screen (px).
    pub min_visible_width: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "handwave=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.6,
            confidence_threshold: 0.8,
            hold_ms: 150,
            mirrored: true,
            pinch_distance: 0.05,
            push_depth: -0.1,
            swipe_velocity: 0.02,
            spread_distance: 0.08,
            confidence_decay: 0.8,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_association_distance: 0.25,
            track_ttl_ms: 1_000,
        }
    }
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            default_confidence_threshold: 0.8,
            rate_limit_ms: 200,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_ms: 200,
            title_bar_height: 32.0,
            min_visible_width: 64.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl GestureConfig {
    /// Reject values outside their meaningful ranges.
    pub fn validate(&self) -> HandwaveResult<()> {
        let c = &self.classifier;
        check_unit("classifier.smoothing_factor", c.smoothing_factor)?;
        check_unit("classifier.confidence_threshold", c.confidence_threshold)?;
        check_unit("classifier.confidence_decay", c.confidence_decay)?;
        check_non_negative("classifier.pinch_distance", c.pinch_distance)?;
        check_non_negative("classifier.swipe_velocity", c.swipe_velocity)?;
        check_non_negative("classifier.spread_distance", c.spread_distance)?;
        if !c.push_depth.is_finite() {
            return Err(HandwaveError::config("classifier.push_depth must be finite"));
        }

        check_non_negative(
            "tracking.max_association_distance",
            self.tracking.max_association_distance,
        )?;
        if self.tracking.track_ttl_ms == 0 {
            return Err(HandwaveError::config("tracking.track_ttl_ms must be > 0"));
        }

        check_unit(
            "mapper.default_confidence_threshold",
            self.mapper.default_confidence_threshold,
        )?;
        if self.mapper.rate_limit_ms == 0 {
            return Err(HandwaveError::config("mapper.rate_limit_ms must be > 0"));
        }

        if self.session.inactivity_ms == 0 {
            return Err(HandwaveError::config("session.inactivity_ms must be > 0"));
        }
        check_non_negative("session.title_bar_height", self.session.title_bar_height)?;
        check_non_negative("session.min_visible_width", self.session.min_visible_width)?;
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> HandwaveResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(HandwaveError::config(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn check_non_negative(name: &str, value: f64) -> HandwaveResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(HandwaveError::config(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> HandwaveResult<Self> {
        if !path.exists() {
            return Err(HandwaveError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.gesture.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> HandwaveResult<PathBuf> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> HandwaveResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Directory holding Handwave configuration files.
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("handwave")
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Standard location of the mapping override document.
pub fn mappings_file_path() -> PathBuf {
    config_dir().join("mappings.json")
}
