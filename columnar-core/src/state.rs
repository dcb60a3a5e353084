use serde::Serialize;

use crate::item::Columns;

/// Where the orchestrator is in its current run.
///
/// Any trigger restarts the sequence from `Idle`. `Inactive` means the engine
/// is not mounted and publishes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutPhase {
    Inactive,
    Idle,
    SpeculativeRendered,
    AwaitingContent,
    Settled,
}

/// Which strategy produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FramePhase {
    /// No items; every column is empty.
    Cleared,
    /// Round-robin placement, heights unknown.
    Speculative,
    /// Height-balanced placement from measured geometry.
    Settled,
}

/// A published column assignment. This is what the host renders and what
/// subscribers observe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutFrame<T> {
    pub version: u64,
    pub phase: FramePhase,
    pub column_count: usize,
    pub columns: Columns<T>,
}

impl<T> LayoutFrame<T> {
    /// The frame an engine starts with, before anything has been laid out.
    pub fn empty() -> Self {
        Self {
            version: 0,
            phase: FramePhase::Cleared,
            column_count: 1,
            columns: vec![Vec::new()],
        }
    }

    pub fn item_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Original indices, column by column, top to bottom.
    pub fn indices(&self) -> Vec<Vec<usize>> {
        self.columns
            .iter()
            .map(|column| column.iter().map(|a| a.index).collect())
            .collect()
    }
}
