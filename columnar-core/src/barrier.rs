//! Content readiness barrier.
//!
//! Media (images, mostly) decides how tall an item really is, and it loads
//! after the item has been rendered. Before measuring, the engine waits here
//! until every media element in the rendered grid has either loaded or
//! failed. A timeout bounds the wait so a resource that never reports back
//! cannot stall layout.
//!
//! The barrier never fails. Broken media counts as done.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::FuturesUnordered;

/// Terminal state of one media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    Loaded,
    Failed,
}

/// A size-affecting embedded resource inside the rendered grid.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// True when the element already loaded or failed at the time it is observed.
    fn is_complete(&self) -> bool;

    /// Resolves on the element's load or error event.
    async fn settled(&self) -> MediaOutcome;
}

/// What happened during one barrier wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarrierReport {
    pub tracked: usize,
    pub already_complete: usize,
    pub loaded: usize,
    pub failed: usize,
    pub timed_out: bool,
}

impl BarrierReport {
    /// Elements still outstanding when the barrier released.
    pub fn outstanding(&self) -> usize {
        self.tracked - self.already_complete - self.loaded - self.failed
    }
}

/// Wait until every element in `media` is loaded or failed, or `timeout` elapses.
pub async fn wait_for_ready<M: MediaElement>(media: &[M], timeout: Duration) -> BarrierReport {
    let mut report = BarrierReport {
        tracked: media.len(),
        ..BarrierReport::default()
    };

    let mut waits: FuturesUnordered<_> = media
        .iter()
        .filter(|m| {
            let complete = m.is_complete();
            if complete {
                report.already_complete += 1;
            }
            !complete
        })
        .map(|m| m.settled())
        .collect();

    if waits.is_empty() {
        tracing::debug!(tracked = report.tracked, "barrier: nothing to wait for");
        return report;
    }

    let mut loaded = 0;
    let mut failed = 0;
    let drain = async {
        while let Some(outcome) = waits.next().await {
            match outcome {
                MediaOutcome::Loaded => loaded += 1,
                MediaOutcome::Failed => failed += 1,
            }
        }
    };

    if tokio::time::timeout(timeout, drain).await.is_err() {
        report.timed_out = true;
    }
    report.loaded = loaded;
    report.failed = failed;

    if report.timed_out {
        tracing::warn!(
            outstanding = report.outstanding(),
            timeout_ms = timeout.as_millis() as u64,
            "barrier: media did not settle in time, continuing"
        );
    } else {
        tracing::debug!(
            loaded = report.loaded,
            failed = report.failed,
            "barrier: all media settled"
        );
    }

    report
}
