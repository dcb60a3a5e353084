//! Item-to-column placement.
//!
//! Two strategies:
//! - `assign`: round-robin, needs no measurements. Used for the first,
//!   speculative render while media is still loading.
//! - `reassign`: greedy shortest-column placement driven by measured heights.
//!   Used once the speculative render has settled.

use crate::item::{Assignment, Columns, Item};

/// Heights read back from the rendered speculative layout.
///
/// Both vectors hold `None` where the host could not measure. Item heights
/// are indexed by original item index, not by position within a column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurements {
    pub column_heights: Vec<Option<f64>>,
    pub item_heights: Vec<Option<f64>>,
}

impl Measurements {
    pub fn item(&self, index: usize) -> Option<f64> {
        self.item_heights
            .get(index)
            .copied()
            .flatten()
            .filter(|h| h.is_finite())
    }

    /// Max minus min over the measured columns.
    pub fn column_spread(&self) -> f64 {
        spread(self.column_heights.iter().flatten().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceParams {
    pub gap: f64,
    pub fallback_height: f64,
}

/// What the greedy pass expects the columns to look like once rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReport {
    /// Projected height of each column, without the trailing gap.
    pub projected_heights: Vec<f64>,
    /// Spread of the projected columns.
    pub projected_spread: f64,
    /// Spread of the speculative columns as measured.
    pub measured_spread: f64,
    /// Items that fell back to the default height.
    pub fallbacks: usize,
}

/// Round-robin: item `i` lands in column `i % column_count`.
pub fn assign<T: Clone>(items: &[Item<T>], column_count: usize) -> Columns<T> {
    let column_count = column_count.max(1);
    let mut columns: Columns<T> = (0..column_count)
        .map(|_| Vec::with_capacity(items.len().div_ceil(column_count)))
        .collect();

    for (index, item) in items.iter().enumerate() {
        columns[index % column_count].push(Assignment {
            key: item.key.clone(),
            item: item.value.clone(),
            index,
        });
    }

    columns
}

/// Greedy rebalance in original index order.
///
/// Each item goes to the column with the smallest running height; ties go to
/// the lowest column index. Running heights start at zero for every pass.
pub fn reassign<T: Clone>(
    items: &[Item<T>],
    column_count: usize,
    measurements: &Measurements,
    params: BalanceParams,
) -> Columns<T> {
    balance(items, column_count, measurements, params).0
}

/// Same placement as `reassign`, plus a report for diagnostics.
pub fn reassign_with_report<T: Clone>(
    items: &[Item<T>],
    column_count: usize,
    measurements: &Measurements,
    params: BalanceParams,
) -> (Columns<T>, BalanceReport) {
    let (columns, running) = balance(items, column_count, measurements, params);

    let projected_heights: Vec<f64> = running
        .iter()
        .zip(&columns)
        .map(|(height, column)| {
            if column.is_empty() {
                0.0
            } else {
                (height - params.gap).max(0.0)
            }
        })
        .collect();

    let fallbacks = (0..items.len())
        .filter(|&i| measurements.item(i).is_none())
        .count();

    let report = BalanceReport {
        projected_spread: spread(projected_heights.iter().copied()),
        projected_heights,
        measured_spread: measurements.column_spread(),
        fallbacks,
    };

    (columns, report)
}

/// Index of the strictly smallest height; the first one wins ties.
pub fn shortest_column(heights: &[f64]) -> usize {
    let mut index = 0;
    let mut best = heights.first().copied().unwrap_or(0.0);
    for (i, height) in heights.iter().enumerate().skip(1) {
        if *height < best {
            best = *height;
            index = i;
        }
    }
    index
}

fn balance<T: Clone>(
    items: &[Item<T>],
    column_count: usize,
    measurements: &Measurements,
    params: BalanceParams,
) -> (Columns<T>, Vec<f64>) {
    let column_count = column_count.max(1);
    let mut columns: Columns<T> = vec![Vec::new(); column_count];
    let mut running = vec![0.0_f64; column_count];

    for (index, item) in items.iter().enumerate() {
        let target = shortest_column(&running);
        let height = measurements.item(index).unwrap_or(params.fallback_height);

        columns[target].push(Assignment {
            key: item.key.clone(),
            item: item.value.clone(),
            index,
        });
        running[target] += height + params.gap;
    }

    (columns, running)
}

fn spread(heights: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = heights.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), h| {
        (lo.min(h), hi.max(h))
    });
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}
