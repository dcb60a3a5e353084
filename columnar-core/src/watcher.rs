use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Watches the container width while the engine is active.
///
/// The background task lives exactly as long as this guard: dropping it
/// (on deactivate, or when the engine itself goes away) aborts the task.
#[derive(Debug)]
pub struct ResizeWatcher {
    task: JoinHandle<()>,
}

impl ResizeWatcher {
    /// Forward every width change to `on_width`. The callback returns `false`
    /// once the receiver side is gone and the watcher should stop.
    pub fn spawn<F>(mut widths: watch::Receiver<f64>, mut on_width: F) -> Self
    where
        F: FnMut(f64) -> bool + Send + 'static,
    {
        let task = tokio::spawn(async move {
            while widths.changed().await.is_ok() {
                let width = *widths.borrow_and_update();
                if !on_width(width) {
                    break;
                }
            }
            tracing::debug!("resize watcher stopped");
        });

        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ResizeWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
