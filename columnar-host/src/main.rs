use std::sync::Arc;

use anyhow::{Context, Result, bail};
use columnar_core::{FramePhase, LayoutConfig, LayoutEngine, LayoutFrame, RunOutcome};
use columnar_host::HeadlessHost;
use columnar_host::gallery::{Card, demo_gallery};
use columnar_host::util::{column_heights, describe_frame, init_tracing, install_panic_hook, spread};

const INITIAL_WIDTH: f64 = 1100.0;
const RESIZED_WIDTH: f64 = 700.0;
const GALLERY_SIZE: usize = 24;

type Demo = LayoutEngine<Card, HeadlessHost<Card>>;

/// columnar-demo [--stuck] [config.json]
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    install_panic_hook();

    let mut stuck = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--stuck" => stuck = true,
            _ => config_path = Some(arg),
        }
    }

    let config = match &config_path {
        Some(path) => LayoutConfig::load(path)
            .with_context(|| format!("failed to load layout config from {}", path))?,
        None => LayoutConfig::default(),
    };
    tracing::info!(?config, "starting columnar demo");

    let (items, specs) = demo_gallery(GALLERY_SIZE, stuck);
    let host = HeadlessHost::new(INITIAL_WIDTH);
    host.extend_specs(specs);

    let engine = LayoutEngine::new(host, config).context("invalid layout config")?;
    engine.set_items(items.clone())?;

    // 1. Mount.
    let outcome = engine.activate().await.context("layout task panicked")?;
    report(&engine, "mount", outcome);

    // 2. Shrink the container; the resize watcher picks it up.
    let mut frames = engine.subscribe();
    engine.host().set_width(RESIZED_WIDTH);
    let expected = columnar_core::resolve(
        RESIZED_WIDTH,
        engine.config().min_column_width,
        engine.config().gap,
    );
    frames
        .wait_for(|f| f.phase == FramePhase::Settled && f.column_count == expected)
        .await
        .context("engine dropped while waiting for the resize layout")?;
    report_frame(&engine, "resize", &engine.snapshot());

    // 3. Drop a few cards and reverse the rest.
    let mut trimmed: Vec<_> = items.into_iter().take(GALLERY_SIZE - 6).collect();
    trimmed.reverse();
    match engine.set_items(trimmed)? {
        Some(run) => {
            let outcome = run.await.context("layout task panicked")?;
            report(&engine, "update", outcome);
        }
        None => bail!("changed item list did not trigger a layout"),
    }

    let json = serde_json::to_string_pretty(&*engine.snapshot())?;
    println!("{}", json);

    engine.deactivate();
    tracing::info!(commits = engine.host().commits(), "demo finished");
    Ok(())
}

fn report(engine: &Demo, label: &str, outcome: RunOutcome) {
    match outcome {
        RunOutcome::Settled { version, barrier } => {
            tracing::info!(
                label,
                version,
                tracked = barrier.tracked,
                loaded = barrier.loaded,
                failed = barrier.failed,
                timed_out = barrier.timed_out,
                "layout settled"
            );
        }
        other => tracing::warn!(label, ?other, "layout did not settle"),
    }
    report_frame(engine, label, &engine.snapshot());
}

fn report_frame(engine: &Demo, label: &str, frame: &Arc<LayoutFrame<Card>>) {
    let heights = column_heights(engine.host(), frame);
    tracing::info!(
        label,
        frame = %describe_frame(frame),
        ?heights,
        spread = spread(&heights),
        "frame on screen"
    );
}
