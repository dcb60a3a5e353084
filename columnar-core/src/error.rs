//! Error types for the input and configuration boundaries.
//!
//! Layout itself never fails: degenerate widths, missing measurements,
//! broken media and stale runs are all absorbed by the engine. The only
//! caller-visible errors are malformed inputs.

use std::path::PathBuf;

use thiserror::Error;

use crate::item::ItemKey;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// Two items in one collection share a key.
    #[error("duplicate item key {key} at index {index}")]
    DuplicateKey { key: ItemKey, index: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min_column_width must be positive and finite, got {0}")]
    MinColumnWidth(f64),

    #[error("gap must be non-negative and finite, got {0}")]
    Gap(f64),

    #[error("fallback_height must be non-negative and finite, got {0}")]
    FallbackHeight(f64),

    #[error("barrier_timeout_ms must be greater than zero")]
    BarrierTimeout,

    #[error("resize_hysteresis must be non-negative and finite, got {0}")]
    Hysteresis(f64),

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse layout config")]
    Parse(#[from] serde_json::Error),
}
