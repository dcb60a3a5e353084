//! Column count resolution.
//!
//! Turns an observed container width into a column count, and filters out
//! sub-pixel resize jitter before it reaches the resolver.

/// Upper bound on the resolved column count.
pub const MAX_COLUMNS: usize = 256;

/// Number of columns that fit in `container_width`, capped at `MAX_COLUMNS`.
///
/// N columns need only N-1 gaps, so one gap is added to the numerator and
/// the count falls out of a single division. Unmeasured or degenerate widths
/// yield one column.
pub fn resolve(container_width: f64, min_column_width: f64, gap: f64) -> usize {
    if !container_width.is_finite() || container_width <= 0.0 {
        return 1;
    }

    let slot = min_column_width + gap;
    if !slot.is_finite() || slot <= 0.0 {
        return 1;
    }

    let count = ((container_width + gap) / slot).floor();
    if count < 1.0 {
        1
    } else {
        count.min(MAX_COLUMNS as f64) as usize
    }
}

/// Remembers the last accepted container width and rejects observations that
/// moved less than the hysteresis threshold.
#[derive(Debug, Clone)]
pub struct WidthTracker {
    threshold: f64,
    accepted: Option<f64>,
}

impl WidthTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            accepted: None,
        }
    }

    /// Returns the new width when the observation is significant.
    /// The first observation is always accepted.
    pub fn observe(&mut self, width: f64) -> Option<f64> {
        match self.accepted {
            Some(last) if (width - last).abs() < self.threshold => None,
            _ => {
                self.accepted = Some(width);
                Some(width)
            }
        }
    }

    pub fn width(&self) -> Option<f64> {
        self.accepted
    }
}
