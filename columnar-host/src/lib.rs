//! Columnar Host library target.
//!
//! A headless stand-in for the UI layer the layout engine normally talks to.
//! The demo binary in `main.rs` and the integration tests both drive the
//! engine through `HeadlessHost`.

pub mod gallery;
pub mod headless;
pub mod media;
pub mod util;

pub use headless::HeadlessHost;
pub use media::{HostMedia, LoadBehavior, LoadState, MediaSpec, RenderSpec};
