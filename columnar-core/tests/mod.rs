use std::time::Duration;

use async_trait::async_trait;
use columnar_core::assign::{reassign_with_report, shortest_column};
use columnar_core::item::{ensure_unique_keys, placed_indices};
use columnar_core::{
    BalanceParams, ConfigError, FramePhase, Item, ItemKey, LayoutConfig, LayoutError,
    LayoutFrame, MAX_COLUMNS, MediaElement, MediaOutcome, Measurements, WidthTracker, assign,
    reassign, resolve, wait_for_ready,
};
use columnar_core::watcher::ResizeWatcher;

fn items(n: usize) -> Vec<Item<String>> {
    (0..n)
        .map(|i| Item::new(i as i64, format!("card-{}", i)))
        .collect()
}

fn params() -> BalanceParams {
    BalanceParams {
        gap: 16.0,
        fallback_height: 200.0,
    }
}

fn measured(heights: &[f64]) -> Measurements {
    Measurements {
        column_heights: Vec::new(),
        item_heights: heights.iter().map(|h| Some(*h)).collect(),
    }
}

fn assert_each_index_once<T>(columns: &columnar_core::Columns<T>, n: usize) {
    let mut indices = placed_indices(columns);
    indices.sort_unstable();
    assert_eq!(indices, (0..n).collect::<Vec<_>>());
}

// ============================================================================
// Column Count Resolver Tests
// ============================================================================

#[test]
fn test_resolve_zero_width() {
    assert_eq!(resolve(0.0, 200.0, 16.0), 1);
}

#[test]
fn test_resolve_negative_width() {
    assert_eq!(resolve(-5.0, 200.0, 16.0), 1);
}

#[test]
fn test_resolve_exact_fit() {
    // (632 + 16) / (200 + 16) = 3.0
    assert_eq!(resolve(632.0, 200.0, 16.0), 3);
}

#[test]
fn test_resolve_rounds_down() {
    assert_eq!(resolve(1000.0, 200.0, 16.0), 4);
}

#[test]
fn test_resolve_just_under_fit() {
    assert_eq!(resolve(631.0, 200.0, 16.0), 2);
}

#[test]
fn test_resolve_narrower_than_one_column() {
    assert_eq!(resolve(120.0, 200.0, 16.0), 1);
}

#[test]
fn test_resolve_nan_width() {
    assert_eq!(resolve(f64::NAN, 200.0, 16.0), 1);
}

#[test]
fn test_resolve_degenerate_column_width() {
    assert_eq!(resolve(800.0, 0.0, 0.0), 1);
    assert_eq!(resolve(800.0, -50.0, 16.0), 1);
}

#[test]
fn test_resolve_caps_column_count() {
    assert_eq!(resolve(1.0e12, 200.0, 16.0), MAX_COLUMNS);
    assert_eq!(resolve(800.0, 1.0e-9, 0.0), MAX_COLUMNS);
    assert_eq!(assign(&items(3), resolve(1.0e12, 200.0, 16.0)).len(), MAX_COLUMNS);
}

// ============================================================================
// WidthTracker Tests
// ============================================================================

#[test]
fn test_width_tracker_accepts_first_observation() {
    let mut tracker = WidthTracker::new(5.0);
    assert_eq!(tracker.width(), None);
    assert_eq!(tracker.observe(800.0), Some(800.0));
    assert_eq!(tracker.width(), Some(800.0));
}

#[test]
fn test_width_tracker_ignores_subthreshold_jitter() {
    let mut tracker = WidthTracker::new(5.0);
    tracker.observe(800.0);
    assert_eq!(tracker.observe(804.9), None);
    assert_eq!(tracker.observe(795.5), None);
    assert_eq!(tracker.width(), Some(800.0));
}

#[test]
fn test_width_tracker_accepts_threshold_change() {
    let mut tracker = WidthTracker::new(5.0);
    tracker.observe(800.0);
    assert_eq!(tracker.observe(805.0), Some(805.0));
    assert_eq!(tracker.observe(700.0), Some(700.0));
}

#[test]
fn test_width_tracker_jitter_does_not_accumulate() {
    // Slow drift is measured against the last accepted width, not the last observation.
    let mut tracker = WidthTracker::new(5.0);
    tracker.observe(800.0);
    assert_eq!(tracker.observe(803.0), None);
    assert_eq!(tracker.observe(806.0), Some(806.0));
}

// ============================================================================
// Speculative Assigner Tests
// ============================================================================

#[test]
fn test_assign_round_robin() {
    let columns = assign(&items(7), 3);
    let indices: Vec<Vec<usize>> = columns
        .iter()
        .map(|c| c.iter().map(|a| a.index).collect())
        .collect();
    assert_eq!(indices, vec![vec![0, 3, 6], vec![1, 4], vec![2, 5]]);
}

#[test]
fn test_assign_keeps_values_and_keys() {
    let columns = assign(&items(2), 2);
    assert_eq!(columns[1][0].item, "card-1");
    assert_eq!(columns[1][0].key, ItemKey::Num(1));
}

#[test]
fn test_assign_produces_requested_column_count() {
    assert_eq!(assign(&items(2), 5).len(), 5);
    assert_eq!(assign::<String>(&[], 4).len(), 4);
}

#[test]
fn test_assign_zero_columns_treated_as_one() {
    let columns = assign(&items(3), 0);
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].len(), 3);
}

#[test]
fn test_assign_every_index_once_and_balanced_counts() {
    for n in [0, 1, 2, 5, 13, 64] {
        for c in 1..=6 {
            let columns = assign(&items(n), c);
            assert_eq!(columns.len(), c);
            assert_each_index_once(&columns, n);

            let counts: Vec<usize> = columns.iter().map(Vec::len).collect();
            let max = counts.iter().max().copied().unwrap_or(0);
            let min = counts.iter().min().copied().unwrap_or(0);
            assert!(max - min <= 1, "n={} c={} counts={:?}", n, c, counts);
        }
    }
}

// ============================================================================
// Height-Balanced Reassigner Tests
// ============================================================================

#[test]
fn test_shortest_column_strict_minimum() {
    assert_eq!(shortest_column(&[100.0, 100.0, 50.0]), 2);
}

#[test]
fn test_shortest_column_tie_goes_to_lowest_index() {
    assert_eq!(shortest_column(&[50.0, 50.0, 100.0]), 0);
    assert_eq!(shortest_column(&[0.0, 0.0, 0.0]), 0);
}

#[test]
fn test_reassign_places_into_shortest_column() {
    // After items 0..3 the running heights are [100, 100, 50] (+gap each);
    // item 3 must land in column 2.
    let heights = measured(&[100.0, 100.0, 50.0, 10.0]);
    let columns = reassign(&items(4), 3, &heights, params());
    assert_eq!(columns[2].iter().map(|a| a.index).collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn test_reassign_tie_break_lowest_index() {
    // Running heights [50, 50, 100]: item 3 goes to column 0.
    let heights = measured(&[50.0, 50.0, 100.0, 10.0]);
    let columns = reassign(&items(4), 3, &heights, params());
    assert_eq!(columns[0].iter().map(|a| a.index).collect::<Vec<_>>(), vec![0, 3]);
}

#[test]
fn test_reassign_processes_items_in_index_order() {
    // A tall item first does not get sorted behind shorter ones.
    let heights = measured(&[500.0, 10.0, 10.0, 10.0]);
    let columns = reassign(&items(4), 2, &heights, params());
    assert_eq!(columns[0].iter().map(|a| a.index).collect::<Vec<_>>(), vec![0]);
    assert_eq!(columns[1].iter().map(|a| a.index).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn test_reassign_fallback_height_for_unmeasured_items() {
    let heights = Measurements {
        column_heights: Vec::new(),
        item_heights: vec![None, Some(100.0)],
    };
    let (columns, report) = reassign_with_report(&items(2), 2, &heights, params());
    assert_eq!(columns[0][0].index, 0);
    assert_eq!(report.fallbacks, 1);
    // Accumulator grew by fallback + gap; the projection drops the trailing gap.
    assert_eq!(report.projected_heights, vec![200.0, 100.0]);
}

#[test]
fn test_reassign_fallback_contributes_exactly_fallback_plus_gap() {
    // Column 0 gets item 0 (unmeasured: 200 + 16 = 216).
    // Column 1 gets item 1 (215 + 16 = 231). Item 2 must go to column 0.
    let heights = Measurements {
        column_heights: Vec::new(),
        item_heights: vec![None, Some(215.0), Some(10.0)],
    };
    let columns = reassign(&items(3), 2, &heights, params());
    assert_eq!(columns[0].iter().map(|a| a.index).collect::<Vec<_>>(), vec![0, 2]);
}

#[test]
fn test_reassign_missing_measurement_vector_entries() {
    // Shorter measurement vectors than the item list fall back too.
    let (_, report) = reassign_with_report(&items(3), 2, &Measurements::default(), params());
    assert_eq!(report.fallbacks, 3);
}

#[test]
fn test_reassign_non_finite_height_falls_back() {
    let heights = Measurements {
        column_heights: Vec::new(),
        item_heights: vec![Some(f64::NAN)],
    };
    let (_, report) = reassign_with_report(&items(1), 1, &heights, params());
    assert_eq!(report.fallbacks, 1);
    assert_eq!(report.projected_heights, vec![200.0]);
}

#[test]
fn test_reassign_every_index_once() {
    let raw: Vec<f64> = (0..37).map(|i| ((i * 73) % 400) as f64 + 40.0).collect();
    let heights = measured(&raw);
    for c in 1..=5 {
        let columns = reassign(&items(37), c, &heights, params());
        assert_eq!(columns.len(), c);
        assert_each_index_once(&columns, 37);
    }
}

#[test]
fn test_reassign_is_deterministic() {
    let raw: Vec<f64> = (0..20).map(|i| ((i * 37) % 300) as f64).collect();
    let heights = measured(&raw);
    let first = reassign(&items(20), 4, &heights, params());
    let second = reassign(&items(20), 4, &heights, params());
    assert_eq!(first, second);
}

#[test]
fn test_reassign_ignores_measured_column_heights() {
    // The pass starts from zero; the speculative column heights only feed the report.
    let mut heights = measured(&[100.0, 100.0]);
    let baseline = reassign(&items(2), 2, &heights, params());
    heights.column_heights = vec![Some(5000.0), Some(0.0)];
    let (columns, report) = reassign_with_report(&items(2), 2, &heights, params());
    assert_eq!(baseline, columns);
    assert_eq!(report.measured_spread, 5000.0);
}

#[test]
fn test_reassign_balances_better_than_round_robin() {
    // Round robin would stack every tall item in column 0.
    let raw = [400.0, 50.0, 400.0, 50.0, 400.0, 50.0];
    let heights = measured(&raw);
    let (_, report) = reassign_with_report(&items(6), 2, &heights, params());
    assert!(report.projected_spread < 1200.0 - 150.0);
}

#[test]
fn test_reassign_empty_columns_project_zero() {
    let (columns, report) = reassign_with_report(&items(1), 3, &measured(&[80.0]), params());
    assert_eq!(columns.len(), 3);
    assert_eq!(report.projected_heights, vec![80.0, 0.0, 0.0]);
    assert_eq!(report.projected_spread, 80.0);
}

// ============================================================================
// Item Tests
// ============================================================================

#[test]
fn test_unique_keys_accepted() {
    assert!(ensure_unique_keys(&items(10)).is_ok());
}

#[test]
fn test_duplicate_keys_rejected() {
    let list = vec![
        Item::new("a", 1),
        Item::new("b", 2),
        Item::new("a", 3),
    ];
    match ensure_unique_keys(&list) {
        Err(LayoutError::DuplicateKey { key, index }) => {
            assert_eq!(key, ItemKey::from("a"));
            assert_eq!(index, 2);
        }
        other => panic!("Expected DuplicateKey, got {:?}", other),
    }
}

#[test]
fn test_string_and_number_keys_are_distinct() {
    let list = vec![Item::new(1_i64, "x"), Item::new("1", "y")];
    assert!(ensure_unique_keys(&list).is_ok());
}

#[test]
fn test_item_key_serde_untagged() {
    let keys: Vec<ItemKey> = serde_json::from_str(r#"[7, "seven"]"#).unwrap();
    assert_eq!(keys, vec![ItemKey::Num(7), ItemKey::Str("seven".to_string())]);
    assert_eq!(serde_json::to_string(&keys).unwrap(), r#"[7,"seven"]"#);
}

#[test]
fn test_item_key_display() {
    assert_eq!(ItemKey::Num(42).to_string(), "42");
    assert_eq!(ItemKey::from("hero").to_string(), "\"hero\"");
}

// ============================================================================
// LayoutFrame Tests
// ============================================================================

#[test]
fn test_empty_frame() {
    let frame: LayoutFrame<String> = LayoutFrame::empty();
    assert_eq!(frame.version, 0);
    assert_eq!(frame.phase, FramePhase::Cleared);
    assert_eq!(frame.column_count, 1);
    assert_eq!(frame.item_count(), 0);
}

#[test]
fn test_frame_indices() {
    let frame = LayoutFrame {
        version: 3,
        phase: FramePhase::Speculative,
        column_count: 2,
        columns: assign(&items(5), 2),
    };
    assert_eq!(frame.indices(), vec![vec![0, 2, 4], vec![1, 3]]);
    assert_eq!(frame.item_count(), 5);
}

// ============================================================================
// LayoutConfig Tests
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = LayoutConfig::default();
    assert_eq!(config.min_column_width, 200.0);
    assert_eq!(config.gap, 16.0);
    assert_eq!(config.fallback_height, 200.0);
    assert_eq!(config.barrier_timeout_ms, 5000);
    assert_eq!(config.resize_hysteresis, 5.0);
    assert_eq!(config.barrier_timeout(), Duration::from_secs(5));
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_empty_json_is_default() {
    let config = LayoutConfig::from_json_str("{}").unwrap();
    assert_eq!(config, LayoutConfig::default());
}

#[test]
fn test_config_partial_json() {
    let config = LayoutConfig::from_json_str(r#"{"gap": 8, "barrier_timeout_ms": 250}"#).unwrap();
    assert_eq!(config.gap, 8.0);
    assert_eq!(config.barrier_timeout_ms, 250);
    assert_eq!(config.min_column_width, 200.0);
}

#[test]
fn test_config_round_trip() {
    let config = LayoutConfig {
        min_column_width: 180.0,
        ..LayoutConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(LayoutConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_config_rejects_zero_column_width() {
    let err = LayoutConfig::from_json_str(r#"{"min_column_width": 0}"#).unwrap_err();
    assert!(matches!(err, ConfigError::MinColumnWidth(_)));
}

#[test]
fn test_config_rejects_negative_gap() {
    let err = LayoutConfig::from_json_str(r#"{"gap": -1}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Gap(_)));
}

#[test]
fn test_config_rejects_zero_timeout() {
    let err = LayoutConfig::from_json_str(r#"{"barrier_timeout_ms": 0}"#).unwrap_err();
    assert!(matches!(err, ConfigError::BarrierTimeout));
}

#[test]
fn test_config_rejects_negative_fallback_and_hysteresis() {
    let config = LayoutConfig {
        fallback_height: -1.0,
        ..LayoutConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::FallbackHeight(_))));

    let config = LayoutConfig {
        resize_hysteresis: -0.5,
        ..LayoutConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Hysteresis(_))));
}

#[test]
fn test_config_rejects_malformed_json() {
    let err = LayoutConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_config_load_missing_file() {
    let err = LayoutConfig::load("/definitely/not/here/columnar.json").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("columnar.json"));
}

#[test]
fn test_config_load_from_disk() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("columnar-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{"min_column_width": 320}"#)?;
    let config = LayoutConfig::load(&path)?;
    std::fs::remove_file(&path)?;
    assert_eq!(config.min_column_width, 320.0);
    Ok(())
}

// ============================================================================
// Content Readiness Barrier Tests
// ============================================================================

/// Media stand-in: settles after `delay` with `outcome`, or never.
struct FakeMedia {
    complete: bool,
    settle: Option<(Duration, MediaOutcome)>,
}

impl FakeMedia {
    fn ready() -> Self {
        Self {
            complete: true,
            settle: None,
        }
    }

    fn after(ms: u64, outcome: MediaOutcome) -> Self {
        Self {
            complete: false,
            settle: Some((Duration::from_millis(ms), outcome)),
        }
    }

    fn never() -> Self {
        Self {
            complete: false,
            settle: None,
        }
    }
}

#[async_trait]
impl MediaElement for FakeMedia {
    fn is_complete(&self) -> bool {
        self.complete
    }

    async fn settled(&self) -> MediaOutcome {
        match self.settle {
            Some((delay, outcome)) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            None => std::future::pending().await,
        }
    }
}

const TIMEOUT: Duration = Duration::from_millis(5000);

#[tokio::test(start_paused = true)]
async fn test_barrier_no_media_resolves_immediately() {
    let start = tokio::time::Instant::now();
    let report = wait_for_ready::<FakeMedia>(&[], TIMEOUT).await;
    assert_eq!(report.tracked, 0);
    assert!(!report.timed_out);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_barrier_already_complete_media_not_awaited() {
    // A complete element whose event would never fire must not block.
    let start = tokio::time::Instant::now();
    let report = wait_for_ready(&[FakeMedia::ready(), FakeMedia::ready()], TIMEOUT).await;
    assert_eq!(report.already_complete, 2);
    assert!(!report.timed_out);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_barrier_waits_for_slowest_media() {
    let media = [
        FakeMedia::after(100, MediaOutcome::Loaded),
        FakeMedia::after(900, MediaOutcome::Loaded),
        FakeMedia::ready(),
    ];
    let start = tokio::time::Instant::now();
    let report = wait_for_ready(&media, TIMEOUT).await;
    assert_eq!(report.loaded, 2);
    assert_eq!(report.already_complete, 1);
    assert_eq!(report.outstanding(), 0);
    assert!(start.elapsed() >= Duration::from_millis(900));
    assert!(start.elapsed() < TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn test_barrier_error_is_terminal() {
    let media = [
        FakeMedia::after(50, MediaOutcome::Failed),
        FakeMedia::after(60, MediaOutcome::Loaded),
    ];
    let report = wait_for_ready(&media, TIMEOUT).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.loaded, 1);
    assert!(!report.timed_out);
}

#[tokio::test(start_paused = true)]
async fn test_barrier_times_out_on_stuck_media() {
    let media = [FakeMedia::after(10, MediaOutcome::Loaded), FakeMedia::never()];
    let start = tokio::time::Instant::now();
    let report = wait_for_ready(&media, TIMEOUT).await;
    assert!(report.timed_out);
    assert_eq!(report.loaded, 1);
    assert_eq!(report.outstanding(), 1);
    assert!(start.elapsed() >= TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn test_barrier_respects_custom_timeout() {
    let start = tokio::time::Instant::now();
    let report = wait_for_ready(&[FakeMedia::never()], Duration::from_millis(250)).await;
    assert!(report.timed_out);
    assert!(start.elapsed() >= Duration::from_millis(250));
    assert!(start.elapsed() < TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn test_barrier_many_media_tracked_independently() {
    let media: Vec<FakeMedia> = (0..50)
        .map(|i| {
            let outcome = if i % 7 == 0 {
                MediaOutcome::Failed
            } else {
                MediaOutcome::Loaded
            };
            FakeMedia::after(10 * i as u64, outcome)
        })
        .collect();
    let report = wait_for_ready(&media, TIMEOUT).await;
    assert_eq!(report.tracked, 50);
    assert_eq!(report.failed, 8);
    assert_eq!(report.loaded, 42);
    assert!(!report.timed_out);
}

// ============================================================================
// ResizeWatcher Tests
// ============================================================================

fn recording_watcher(
    widths: tokio::sync::watch::Receiver<f64>,
    stop_below: f64,
) -> (ResizeWatcher, std::sync::Arc<std::sync::Mutex<Vec<f64>>>) {
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&seen);
    let watcher = ResizeWatcher::spawn(widths, move |width| {
        sink.lock().unwrap().push(width);
        width >= stop_below
    });
    (watcher, seen)
}

#[tokio::test(start_paused = true)]
async fn test_resize_watcher_forwards_changes_only() {
    let (tx, rx) = tokio::sync::watch::channel(800.0);
    let (watcher, seen) = recording_watcher(rx, 0.0);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(seen.lock().unwrap().is_empty());

    tx.send(640.0).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(*seen.lock().unwrap(), vec![640.0]);
    assert!(watcher.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_resize_watcher_stops_when_callback_declines() {
    let (tx, rx) = tokio::sync::watch::channel(800.0);
    let (watcher, seen) = recording_watcher(rx, 500.0);

    tx.send(300.0).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(*seen.lock().unwrap(), vec![300.0]);
    assert!(!watcher.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_resize_watcher_stops_when_source_closes() {
    let (tx, rx) = tokio::sync::watch::channel(800.0);
    let (watcher, _seen) = recording_watcher(rx, 0.0);
    assert!(watcher.is_running());

    drop(tx);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!watcher.is_running());
}
