//! # Columnar Core
//!
//! A column-balanced masonry layout engine.
//!
//! Items are first dealt round-robin into columns so something shows up
//! immediately. Once the render layer reports that every image has loaded
//! (or failed, or the wait timed out), the engine measures what actually got
//! rendered and redistributes the items greedily so column heights even out.
//! Overlapping layout requests are arbitrated by a version token: only the
//! newest run is ever allowed to publish.

pub mod assign;
pub mod barrier;
pub mod columns;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod item;
pub mod state;
pub mod watcher;

// Re-export the main struct so users can just use `columnar_core::LayoutEngine`
pub use engine::{Checkpoint, LayoutEngine, RunOutcome};

pub use assign::{BalanceParams, BalanceReport, Measurements, assign, reassign};
pub use barrier::{BarrierReport, MediaElement, MediaOutcome, wait_for_ready};
pub use columns::{MAX_COLUMNS, WidthTracker, resolve};
pub use config::LayoutConfig;
pub use error::{ConfigError, LayoutError};
pub use host::RenderHost;
pub use item::{Assignment, Columns, Item, ItemKey};
pub use state::{FramePhase, LayoutFrame, LayoutPhase};
