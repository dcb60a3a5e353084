//! Headless render host.
//!
//! Stands in for a real UI toolkit: it "renders" committed frames into an
//! in-memory tree, loads simulated images on a timer, and answers geometry
//! queries from per-item render specs. Reading geometry flushes any pending
//! frame first, the same forced-layout behaviour a browser has.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use columnar_core::{ItemKey, LayoutFrame, RenderHost};
use tokio::sync::watch;

use crate::media::{HostMedia, LoadState, MediaSlot, RenderSpec};

/// Gap the host draws between stacked items inside a column.
pub const DEFAULT_ROW_GAP: f64 = 16.0;

pub struct HeadlessHost<T> {
    row_gap: f64,
    widths: watch::Sender<f64>,
    inner: Mutex<HostState<T>>,
}

struct HostState<T> {
    specs: HashMap<ItemKey, RenderSpec>,
    media: HashMap<ItemKey, MediaSlot>,
    pending: Option<Arc<LayoutFrame<T>>>,
    applied: Option<Arc<LayoutFrame<T>>>,
    // Original index -> key for the applied frame.
    placed: HashMap<usize, ItemKey>,
    history: Vec<Arc<LayoutFrame<T>>>,
    renders: usize,
}

impl<T> std::fmt::Debug for HeadlessHost<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("HeadlessHost")
            .field("width", &*self.widths.borrow())
            .field("specs", &inner.specs.len())
            .field("commits", &inner.history.len())
            .field("renders", &inner.renders)
            .finish()
    }
}

impl<T: Clone> HeadlessHost<T> {
    pub fn new(width: f64) -> Self {
        Self::with_row_gap(width, DEFAULT_ROW_GAP)
    }

    pub fn with_row_gap(width: f64, row_gap: f64) -> Self {
        let (widths, _) = watch::channel(width);
        Self {
            row_gap,
            widths,
            inner: Mutex::new(HostState {
                specs: HashMap::new(),
                media: HashMap::new(),
                pending: None,
                applied: None,
                placed: HashMap::new(),
                history: Vec::new(),
                renders: 0,
            }),
        }
    }

    /// Register how the item with `key` renders. Replaces any earlier spec
    /// and forgets that item's image load state.
    pub fn insert_spec(&self, key: impl Into<ItemKey>, spec: RenderSpec) {
        let key = key.into();
        let mut inner = self.lock();
        inner.media.remove(&key);
        inner.specs.insert(key, spec);
    }

    pub fn extend_specs<I>(&self, specs: I)
    where
        I: IntoIterator<Item = (ItemKey, RenderSpec)>,
    {
        for (key, spec) in specs {
            self.insert_spec(key, spec);
        }
    }

    /// Simulate a container resize.
    pub fn set_width(&self, width: f64) {
        self.widths.send_replace(width);
    }

    pub fn width(&self) -> f64 {
        *self.widths.borrow()
    }

    /// The frame currently on screen, after applying anything pending.
    pub fn frame(&self) -> Option<Arc<LayoutFrame<T>>> {
        let mut inner = self.lock();
        inner.flush();
        inner.applied.clone()
    }

    /// Every frame ever committed, oldest first.
    pub fn history(&self) -> Vec<Arc<LayoutFrame<T>>> {
        self.lock().history.clone()
    }

    pub fn commits(&self) -> usize {
        self.lock().history.len()
    }

    /// Number of render passes that applied a new frame.
    pub fn renders(&self) -> usize {
        self.lock().renders
    }

    /// Load state of the image belonging to `key`, once it has been rendered.
    pub fn load_state(&self, key: &ItemKey) -> Option<LoadState> {
        let mut inner = self.lock();
        inner.flush();
        inner.media.get(key).map(MediaSlot::current)
    }

    fn lock(&self) -> MutexGuard<'_, HostState<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> HostState<T> {
    /// Apply the pending frame and start loading images that just appeared.
    fn flush(&mut self) {
        let Some(frame) = self.pending.take() else {
            return;
        };

        for assignment in frame.columns.iter().flatten() {
            if self.media.contains_key(&assignment.key) {
                continue;
            }
            if let Some(media) = self.specs.get(&assignment.key).and_then(|s| s.media) {
                self.media
                    .insert(assignment.key.clone(), MediaSlot::start(media.behavior));
            }
        }

        self.placed = frame
            .columns
            .iter()
            .flatten()
            .map(|a| (a.index, a.key.clone()))
            .collect();
        self.applied = Some(frame);
        self.renders += 1;
    }

    fn item_height(&self, key: &ItemKey) -> Option<f64> {
        let spec = self.specs.get(key)?;
        let state = self.media.get(key).map(MediaSlot::current);
        Some(spec.height(state))
    }
}

#[async_trait]
impl<T> RenderHost<T> for HeadlessHost<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Media = HostMedia;

    fn commit(&self, frame: &Arc<LayoutFrame<T>>) {
        let mut inner = self.lock();
        inner.history.push(Arc::clone(frame));
        inner.pending = Some(Arc::clone(frame));
    }

    async fn rendered(&self) {
        tokio::task::yield_now().await;
        self.lock().flush();
    }

    fn media(&self) -> Vec<HostMedia> {
        let mut inner = self.lock();
        inner.flush();
        let Some(frame) = inner.applied.clone() else {
            return Vec::new();
        };

        frame
            .columns
            .iter()
            .flatten()
            .filter_map(|a| inner.media.get(&a.key).map(MediaSlot::handle))
            .collect()
    }

    fn measure_item(&self, index: usize) -> Option<f64> {
        let mut inner = self.lock();
        inner.flush();
        let key = inner.placed.get(&index)?;
        inner.item_height(key)
    }

    fn measure_column(&self, column: usize) -> Option<f64> {
        let mut inner = self.lock();
        inner.flush();
        let frame = inner.applied.clone()?;
        let items = frame.columns.get(column)?;

        let content: f64 = items
            .iter()
            .map(|a| inner.item_height(&a.key).unwrap_or(0.0))
            .sum();
        let gaps = items.len().saturating_sub(1) as f64 * self.row_gap;
        Some(content + gaps)
    }

    fn width_stream(&self) -> Option<watch::Receiver<f64>> {
        Some(self.widths.subscribe())
    }
}
