use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::assign::{BalanceParams, assign, reassign_with_report};
use crate::barrier::{BarrierReport, wait_for_ready};
use crate::columns::{WidthTracker, resolve};
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::host::{RenderHost, measure};
use crate::item::{Columns, Item, ensure_unique_keys};
use crate::state::{FramePhase, LayoutFrame, LayoutPhase};
use crate::watcher::ResizeWatcher;

/// Where a superseded run noticed it was stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// A newer run (or deactivation) got there first and the frame was dropped.
    Publish,
    /// After the speculative frame was rendered.
    AfterRender,
    /// After the content barrier released.
    AfterBarrier,
    /// After the post-barrier render, right before measuring.
    BeforeMeasure,
}

/// How one `redistribute` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The engine was not active; nothing ran.
    Inactive,
    /// Empty collection; a cleared frame was published.
    Cleared { version: u64 },
    /// The balanced frame was published.
    Settled { version: u64, barrier: BarrierReport },
    /// A newer run took over; this one published nothing further.
    Superseded { version: u64, checkpoint: Checkpoint },
}

/// The layout orchestrator.
///
/// Cheap to clone; clones share one engine. Every trigger (new items, a
/// column count change, activation) starts a fresh `redistribute` run and
/// bumps the version token. Runs compare their captured version at each
/// suspension point and quietly abandon themselves once a newer run exists,
/// so only the latest run can ever publish.
///
/// Triggers claim their version and publish the first frame on the calling
/// thread, then spawn the remainder onto the ambient tokio runtime.
pub struct LayoutEngine<T, H> {
    shared: Arc<Shared<T, H>>,
}

struct Shared<T, H> {
    host: H,
    config: LayoutConfig,
    state: Mutex<EngineState<T>>,
    frames: watch::Sender<Arc<LayoutFrame<T>>>,
    // Dropped with the engine, which stops the watcher task.
    resize: Mutex<Option<ResizeWatcher>>,
}

/// A run that has published its speculative frame and still has to settle.
struct Run<T> {
    version: u64,
    items: Arc<Vec<Item<T>>>,
    column_count: usize,
}

enum Started<T> {
    Finished(RunOutcome),
    Speculative(Run<T>),
}

struct EngineState<T> {
    version: u64,
    active: bool,
    phase: LayoutPhase,
    items: Arc<Vec<Item<T>>>,
    column_count: usize,
    widths: WidthTracker,
}

impl<T, H> Clone for LayoutEngine<T, H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, H> std::fmt::Debug for LayoutEngine<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LayoutEngine")
            .field("version", &state.version)
            .field("active", &state.active)
            .field("phase", &state.phase)
            .field("items", &state.items.len())
            .field("column_count", &state.column_count)
            .finish()
    }
}

impl<T, H> LayoutEngine<T, H>
where
    T: Clone + Send + Sync + 'static,
    H: RenderHost<T> + 'static,
{
    /// Build an inactive engine. Nothing is laid out until `activate`.
    pub fn new(host: H, config: LayoutConfig) -> Result<Self, LayoutError> {
        config.validate()?;

        let (frames, _) = watch::channel(Arc::new(LayoutFrame::empty()));
        let state = EngineState {
            version: 0,
            active: false,
            phase: LayoutPhase::Inactive,
            items: Arc::new(Vec::new()),
            column_count: 1,
            widths: WidthTracker::new(config.resize_hysteresis),
        };

        Ok(Self {
            shared: Arc::new(Shared {
                host,
                config,
                state: Mutex::new(state),
                frames,
                resize: Mutex::new(None),
            }),
        })
    }

    pub fn host(&self) -> &H {
        &self.shared.host
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.shared.config
    }

    pub fn version(&self) -> u64 {
        self.state().version
    }

    pub fn phase(&self) -> LayoutPhase {
        self.state().phase
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    pub fn column_count(&self) -> usize {
        self.state().column_count
    }

    pub fn items(&self) -> Arc<Vec<Item<T>>> {
        Arc::clone(&self.state().items)
    }

    /// The most recently published frame.
    pub fn snapshot(&self) -> Arc<LayoutFrame<T>> {
        self.shared.frames.borrow().clone()
    }

    /// Stream of published frames, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<LayoutFrame<T>>> {
        self.shared.frames.subscribe()
    }

    pub fn balance_params(&self) -> BalanceParams {
        BalanceParams {
            gap: self.shared.config.gap,
            fallback_height: self.shared.config.fallback_height,
        }
    }

    /// Mount: start watching the container width and run the first layout.
    pub fn activate(&self) -> JoinHandle<RunOutcome> {
        if let Some(widths) = self.shared.host.width_stream() {
            // Still inactive here, so this only seeds the column count.
            let initial = *widths.borrow();
            let _ = self.observe_width(initial);

            let weak = Arc::downgrade(&self.shared);
            let watcher = ResizeWatcher::spawn(widths, move |width| match weak.upgrade() {
                Some(shared) => {
                    let _ = LayoutEngine { shared }.observe_width(width);
                    true
                }
                None => false,
            });
            *self.resize() = Some(watcher);
        }

        {
            let mut state = self.state();
            state.active = true;
            state.phase = LayoutPhase::Idle;
        }
        tracing::info!(columns = self.column_count(), "layout engine activated");

        self.schedule()
    }

    /// Unmount: stop watching the container and invalidate any in-flight run.
    /// No frame is published after this returns, until the next `activate`.
    pub fn deactivate(&self) {
        {
            let mut state = self.state();
            state.active = false;
            state.version += 1;
            state.phase = LayoutPhase::Inactive;
        }

        let watcher = self.resize().take();
        drop(watcher);

        tracing::info!("layout engine deactivated");
    }

    /// Replace the item collection. A layout is triggered only when the new
    /// collection differs structurally from the current one and the engine
    /// is active; the returned handle resolves when that run ends.
    pub fn set_items(
        &self,
        items: Vec<Item<T>>,
    ) -> Result<Option<JoinHandle<RunOutcome>>, LayoutError>
    where
        T: PartialEq,
    {
        ensure_unique_keys(&items)?;

        let active = {
            let mut state = self.state();
            if *state.items == items {
                return Ok(None);
            }
            state.items = Arc::new(items);
            state.active
        };

        tracing::debug!(active, "item collection changed");
        Ok(active.then(|| self.schedule()))
    }

    /// Force a fresh layout without changing any input.
    pub fn invalidate(&self) -> Option<JoinHandle<RunOutcome>> {
        self.is_active().then(|| self.schedule())
    }

    /// Feed one container width observation. Jitter under the hysteresis
    /// threshold is ignored. A layout is triggered only when the column count
    /// changes while the engine is active.
    pub fn observe_width(&self, width: f64) -> Option<JoinHandle<RunOutcome>> {
        let triggered = {
            let mut state = self.state();
            let accepted = state.widths.observe(width)?;

            let count = resolve(
                accepted,
                self.shared.config.min_column_width,
                self.shared.config.gap,
            );
            if count == state.column_count {
                return None;
            }

            tracing::debug!(
                width = accepted,
                from = state.column_count,
                to = count,
                "column count changed"
            );
            state.column_count = count;
            state.active
        };

        triggered.then(|| self.schedule())
    }

    /// Start a layout run. The version bump and the first frame happen before
    /// this returns, so an older run can no longer publish once it has been
    /// called. The rest of the sequence runs as its own task.
    pub fn schedule(&self) -> JoinHandle<RunOutcome> {
        let started = self.begin();
        let engine = self.clone();
        tokio::spawn(async move {
            match started {
                Started::Finished(outcome) => outcome,
                Started::Speculative(run) => engine.settle(run).await,
            }
        })
    }

    /// One full layout sequence: speculative frame, content barrier,
    /// measurement, balanced frame.
    pub async fn redistribute(&self) -> RunOutcome {
        match self.begin() {
            Started::Finished(outcome) => outcome,
            Started::Speculative(run) => self.settle(run).await,
        }
    }

    /// Synchronous prologue: claim a version, snapshot the inputs, and publish
    /// either the cleared frame or the round-robin frame.
    fn begin(&self) -> Started<T> {
        let (version, items, column_count) = {
            let mut state = self.state();
            if !state.active {
                return Started::Finished(RunOutcome::Inactive);
            }
            state.version += 1;
            state.phase = LayoutPhase::Idle;
            (state.version, Arc::clone(&state.items), state.column_count)
        };

        tracing::debug!(version, items = items.len(), columns = column_count, "redistribute");

        if items.is_empty() {
            let cleared: Columns<T> = vec![Vec::new(); column_count];
            if !self.publish(version, FramePhase::Cleared, column_count, cleared) {
                return Started::Finished(self.superseded(version, Checkpoint::Publish));
            }
            return Started::Finished(RunOutcome::Cleared { version });
        }

        let speculative = assign(&items, column_count);
        if !self.publish(version, FramePhase::Speculative, column_count, speculative) {
            return Started::Finished(self.superseded(version, Checkpoint::Publish));
        }

        Started::Speculative(Run {
            version,
            items,
            column_count,
        })
    }

    async fn settle(&self, run: Run<T>) -> RunOutcome {
        let Run {
            version,
            items,
            column_count,
        } = run;

        self.shared.host.rendered().await;
        if !self.advance(version, LayoutPhase::AwaitingContent) {
            return self.superseded(version, Checkpoint::AfterRender);
        }

        let media = self.shared.host.media();
        let barrier = wait_for_ready(&media, self.shared.config.barrier_timeout()).await;
        drop(media);
        if !self.is_current(version) {
            return self.superseded(version, Checkpoint::AfterBarrier);
        }

        // Let the render layer catch up with whatever the barrier's
        // completion changed before geometry is read.
        self.shared.host.rendered().await;
        if !self.is_current(version) {
            return self.superseded(version, Checkpoint::BeforeMeasure);
        }

        let measurements = measure::<T, H>(&self.shared.host, column_count, items.len());
        let (columns, report) =
            reassign_with_report(&items, column_count, &measurements, self.balance_params());

        tracing::debug!(
            version,
            measured_spread = report.measured_spread,
            projected_spread = report.projected_spread,
            fallbacks = report.fallbacks,
            "rebalanced"
        );

        if !self.publish(version, FramePhase::Settled, column_count, columns) {
            return self.superseded(version, Checkpoint::Publish);
        }
        RunOutcome::Settled { version, barrier }
    }

    // ---- internals ----

    fn state(&self) -> MutexGuard<'_, EngineState<T>> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resize(&self) -> MutexGuard<'_, Option<ResizeWatcher>> {
        self.shared.resize.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, version: u64) -> bool {
        let state = self.state();
        state.active && state.version == version
    }

    fn advance(&self, version: u64, phase: LayoutPhase) -> bool {
        let mut state = self.state();
        if !state.active || state.version != version {
            return false;
        }
        state.phase = phase;
        true
    }

    /// Version check and publication happen under one lock, so a stale run
    /// can never overwrite a newer frame.
    fn publish(
        &self,
        version: u64,
        phase: FramePhase,
        column_count: usize,
        columns: Columns<T>,
    ) -> bool {
        let mut state = self.state();
        if !state.active || state.version != version {
            return false;
        }

        let frame = Arc::new(LayoutFrame {
            version,
            phase,
            column_count,
            columns,
        });
        self.shared.host.commit(&frame);
        self.shared.frames.send_replace(frame);

        state.phase = match phase {
            FramePhase::Speculative => LayoutPhase::SpeculativeRendered,
            FramePhase::Cleared | FramePhase::Settled => LayoutPhase::Settled,
        };
        true
    }

    fn superseded(&self, version: u64, checkpoint: Checkpoint) -> RunOutcome {
        tracing::trace!(version, ?checkpoint, "stale layout run abandoned");
        RunOutcome::Superseded {
            version,
            checkpoint,
        }
    }
}
