//! The boundary to whatever actually renders the grid.
//!
//! The engine never touches rendered geometry directly. It commits frames,
//! waits for them to become visible, enumerates media, and reads heights back,
//! all through `RenderHost`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::assign::Measurements;
use crate::barrier::MediaElement;
use crate::state::LayoutFrame;

#[async_trait]
pub trait RenderHost<T>: Send + Sync {
    type Media: MediaElement;

    /// Hand a frame to the render layer. Frames are committed in version
    /// order and the host must apply them in that order. Called while the
    /// engine holds its state lock, so it must not call back into the engine.
    fn commit(&self, frame: &Arc<LayoutFrame<T>>);

    /// Resolves once the most recently committed frame has taken visible effect.
    async fn rendered(&self);

    /// Media elements currently rendered under the grid root.
    fn media(&self) -> Vec<Self::Media>;

    /// Rendered height of the item with this original index, if it is on screen.
    fn measure_item(&self, index: usize) -> Option<f64>;

    /// Rendered height of a column container.
    fn measure_column(&self, column: usize) -> Option<f64>;

    /// Container width at mount and on every resize. Hosts without a resize
    /// source return `None` and feed widths through `LayoutEngine::observe_width`.
    fn width_stream(&self) -> Option<watch::Receiver<f64>> {
        None
    }
}

/// Read the current geometry of a rendered frame. Nothing is cached between calls.
pub fn measure<T, H>(host: &H, column_count: usize, item_count: usize) -> Measurements
where
    H: RenderHost<T> + ?Sized,
{
    Measurements {
        column_heights: (0..column_count).map(|c| host.measure_column(c)).collect(),
        item_heights: (0..item_count).map(|i| host.measure_item(i)).collect(),
    }
}
