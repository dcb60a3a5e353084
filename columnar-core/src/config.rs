//! Layout tuning knobs.
//!
//! Every field has a default matching the reference behaviour, so an empty
//! JSON object (or no file at all) yields a working engine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Minimum column width in pixels.
pub const DEFAULT_MIN_COLUMN_WIDTH: f64 = 200.0;

/// Spacing between columns and between stacked items.
pub const DEFAULT_GAP: f64 = 16.0;

/// Height assumed for an item the host could not measure.
pub const DEFAULT_FALLBACK_HEIGHT: f64 = 200.0;

/// Upper bound on the content readiness wait.
pub const DEFAULT_BARRIER_TIMEOUT_MS: u64 = 5000;

/// Width changes smaller than this are treated as resize noise.
pub const DEFAULT_RESIZE_HYSTERESIS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub min_column_width: f64,
    pub gap: f64,
    pub fallback_height: f64,
    pub barrier_timeout_ms: u64,
    pub resize_hysteresis: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_column_width: DEFAULT_MIN_COLUMN_WIDTH,
            gap: DEFAULT_GAP,
            fallback_height: DEFAULT_FALLBACK_HEIGHT,
            barrier_timeout_ms: DEFAULT_BARRIER_TIMEOUT_MS,
            resize_hysteresis: DEFAULT_RESIZE_HYSTERESIS,
        }
    }
}

impl LayoutConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_column_width.is_finite() && self.min_column_width > 0.0) {
            return Err(ConfigError::MinColumnWidth(self.min_column_width));
        }
        if !(self.gap.is_finite() && self.gap >= 0.0) {
            return Err(ConfigError::Gap(self.gap));
        }
        if !(self.fallback_height.is_finite() && self.fallback_height >= 0.0) {
            return Err(ConfigError::FallbackHeight(self.fallback_height));
        }
        if self.barrier_timeout_ms == 0 {
            return Err(ConfigError::BarrierTimeout);
        }
        if !(self.resize_hysteresis.is_finite() && self.resize_hysteresis >= 0.0) {
            return Err(ConfigError::Hysteresis(self.resize_hysteresis));
        }
        Ok(())
    }

    pub fn barrier_timeout(&self) -> Duration {
        Duration::from_millis(self.barrier_timeout_ms)
    }
}
