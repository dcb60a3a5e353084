use columnar_core::{LayoutFrame, RenderHost};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `columnar_core=debug`.
pub const LOG_ENV: &str = "COLUMNAR_LOG";

pub fn init_tracing() {
    // COLUMNAR_LOG=columnar_core=trace,columnar_host=debug
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}

/// Log panics through tracing. Layout runs and the resize watcher execute on
/// runtime worker threads, so the thread name says which side went down.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<opaque payload>");

        let at = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default();

        let current = std::thread::current();
        let thread = current.name().unwrap_or("<unnamed>");

        tracing::error!(thread, %at, message, "columnar panicked");
    }));
}

/// Rendered column heights of the frame currently on screen.
pub fn column_heights<T, H: RenderHost<T>>(host: &H, frame: &LayoutFrame<T>) -> Vec<f64> {
    (0..frame.column_count)
        .map(|c| host.measure_column(c).unwrap_or(0.0))
        .collect()
}

/// One-line description of a frame, e.g. `v3 Settled 4 cols [0,4,8|1,5|2,6|3,7]`.
pub fn describe_frame<T>(frame: &LayoutFrame<T>) -> String {
    let columns: Vec<String> = frame
        .indices()
        .iter()
        .map(|column| {
            column
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();

    format!(
        "v{} {:?} {} cols [{}]",
        frame.version,
        frame.phase,
        frame.column_count,
        columns.join("|")
    )
}

/// Max minus min of a set of column heights.
pub fn spread(heights: &[f64]) -> f64 {
    let max = heights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = heights.iter().copied().fold(f64::INFINITY, f64::min);
    if heights.is_empty() { 0.0 } else { max - min }
}
