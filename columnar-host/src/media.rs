//! Simulated media elements.
//!
//! Each item with an image gets one load channel, created the first time the
//! item is rendered. A timer task resolves it according to the item's
//! `LoadBehavior`. The state sticks across re-renders, the way a browser keeps
//! a decoded image in cache when a keyed element moves between columns.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use columnar_core::{MediaElement, MediaOutcome};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    Failed,
}

/// How a simulated image behaves once rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Already in cache: complete the moment it is rendered.
    Cached,
    /// Finishes loading after the delay.
    Loads(Duration),
    /// Errors after the delay.
    Fails(Duration),
    /// Neither load nor error ever fires.
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaSpec {
    /// Height once the image has loaded.
    pub intrinsic_height: f64,
    /// Height while loading, and after a failure.
    pub placeholder_height: f64,
    pub behavior: LoadBehavior,
}

/// Everything the host needs to know to "render" one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSpec {
    /// Caption, padding, borders: the part that does not depend on media.
    pub base_height: f64,
    pub media: Option<MediaSpec>,
}

impl RenderSpec {
    pub fn text(height: f64) -> Self {
        Self {
            base_height: height,
            media: None,
        }
    }

    pub fn image(base_height: f64, intrinsic_height: f64, behavior: LoadBehavior) -> Self {
        Self {
            base_height,
            media: Some(MediaSpec {
                intrinsic_height,
                placeholder_height: 0.0,
                behavior,
            }),
        }
    }

    /// Rendered height given the current media state.
    pub fn height(&self, state: Option<LoadState>) -> f64 {
        let media = match (&self.media, state) {
            (Some(m), Some(LoadState::Loaded)) => m.intrinsic_height,
            (Some(m), _) => m.placeholder_height,
            (None, _) => 0.0,
        };
        self.base_height + media
    }
}

/// Load channel for one image. Owned by the host for as long as the image
/// exists, so observers never see a closed channel.
#[derive(Debug)]
pub(crate) struct MediaSlot {
    state: Arc<watch::Sender<LoadState>>,
}

impl MediaSlot {
    /// Create the slot and start the simulated load. Must run inside a tokio runtime.
    pub(crate) fn start(behavior: LoadBehavior) -> Self {
        let initial = match behavior {
            LoadBehavior::Cached => LoadState::Loaded,
            _ => LoadState::Pending,
        };
        let state = Arc::new(watch::Sender::new(initial));

        let terminal = match behavior {
            LoadBehavior::Loads(delay) => Some((delay, LoadState::Loaded)),
            LoadBehavior::Fails(delay) => Some((delay, LoadState::Failed)),
            LoadBehavior::Cached | LoadBehavior::Never => None,
        };

        if let Some((delay, outcome)) = terminal {
            let tx = Arc::clone(&state);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tx.send_replace(outcome);
            });
        }

        Self { state }
    }

    pub(crate) fn current(&self) -> LoadState {
        *self.state.borrow()
    }

    pub(crate) fn handle(&self) -> HostMedia {
        HostMedia {
            state: self.state.subscribe(),
        }
    }
}

/// What the engine's barrier sees for one rendered image.
#[derive(Debug, Clone)]
pub struct HostMedia {
    state: watch::Receiver<LoadState>,
}

#[async_trait]
impl MediaElement for HostMedia {
    fn is_complete(&self) -> bool {
        *self.state.borrow() != LoadState::Pending
    }

    async fn settled(&self) -> MediaOutcome {
        let mut state = self.state.clone();
        let outcome = state
            .wait_for(|s| *s != LoadState::Pending)
            .await
            .map(|s| *s);

        match outcome {
            Ok(LoadState::Failed) => MediaOutcome::Failed,
            Ok(_) => MediaOutcome::Loaded,
            // Image node went away without an event; only the barrier timeout ends this.
            Err(_) => std::future::pending().await,
        }
    }
}
