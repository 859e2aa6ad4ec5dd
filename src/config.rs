//! Tunable gesture and transform constants, optionally read from a JSON file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lower bound of pinch zoom, in screen pixels per image pixel
pub const MIN_SCALE: f64 = 0.25;

/// Upper bound of pinch zoom, in screen pixels per image pixel
pub const MAX_SCALE: f64 = 0.75;

/// How long a finger must rest before a long-press places a marker
pub const LONG_PRESS_MIN_DURATION_MS: u64 = 400;

/// Movement (px) after which a touch becomes a pan instead of a press
pub const TOUCH_SLOP: f64 = 10.0;

pub const DOUBLE_TAP_TIMEOUT_MS: u64 = 300;

/// Max distance (px) between the two taps of a double-tap
pub const DOUBLE_TAP_SLOP: f64 = 40.0;

/// Duration of the animated reset after a double-tap
pub const RESET_DURATION_MS: u64 = 300;

/// Gesture and zoom settings for an annotator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub long_press_min_duration_ms: u64,
    pub touch_slop: f64,
    pub double_tap_timeout_ms: u64,
    pub double_tap_slop: f64,
    pub reset_duration_ms: u64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            long_press_min_duration_ms: LONG_PRESS_MIN_DURATION_MS,
            touch_slop: TOUCH_SLOP,
            double_tap_timeout_ms: DOUBLE_TAP_TIMEOUT_MS,
            double_tap_slop: DOUBLE_TAP_SLOP,
            reset_duration_ms: RESET_DURATION_MS,
        }
    }
}

impl AnnotatorConfig {
    /// Where the config file lives by default
    /// (e.g. `~/.config/photo-pins/config.json` on Linux)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("photo-pins").join("config.json"))
    }

    /// Read the config at `path`, falling back to defaults when the file is
    /// missing, unreadable, corrupt or inconsistent
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            return Self::default();
        }

        let config: Self = match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config file");
                    return Self::default();
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config file");
                return Self::default();
            }
        };

        match config.validate() {
            Ok(()) => {
                tracing::info!(path = %path.display(), "loaded config");
                config
            }
            Err(reason) => {
                tracing::warn!(path = %path.display(), reason, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// This config if it passes [`Self::validate`], the defaults otherwise
    pub fn validated(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(reason) => {
                tracing::warn!(reason, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Check that the values can drive the transform engine
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err("min_scale must be positive");
        }
        if !(self.max_scale.is_finite() && self.max_scale >= self.min_scale) {
            return Err("max_scale must not be below min_scale");
        }
        if !(self.touch_slop >= 0.0 && self.double_tap_slop >= 0.0) {
            return Err("slop distances must not be negative");
        }
        Ok(())
    }

    /// Never panics, even on bounds that fail validation
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.max(self.min_scale).min(self.max_scale)
    }

    pub fn long_press_min_duration(&self) -> Duration {
        Duration::from_millis(self.long_press_min_duration_ms)
    }

    pub fn double_tap_timeout(&self) -> Duration {
        Duration::from_millis(self.double_tap_timeout_ms)
    }

    pub fn reset_duration(&self) -> Duration {
        Duration::from_millis(self.reset_duration_ms)
    }
}
