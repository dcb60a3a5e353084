//! Item model.
//!
//! An item is whatever the caller wants laid out (a card, a generated image,
//! a preset tile) plus the key that identifies it across re-layouts.
//! Once placed into a column it becomes an `Assignment`, which remembers the
//! item's original position in the source collection.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Caller-provided identity. Either a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemKey {
    Num(i64),
    Str(String),
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Num(n) => write!(f, "{}", n),
            ItemKey::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for ItemKey {
    fn from(n: i64) -> Self {
        ItemKey::Num(n)
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        ItemKey::Str(s.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(s: String) -> Self {
        ItemKey::Str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item<T> {
    pub key: ItemKey,
    pub value: T,
}

impl<T> Item<T> {
    pub fn new(key: impl Into<ItemKey>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// One item placed into a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment<T> {
    pub key: ItemKey,
    pub item: T,
    /// Position of the item in the source collection.
    pub index: usize,
}

/// Per-column ordered assignments, left to right.
pub type Columns<T> = Vec<Vec<Assignment<T>>>;

/// Reject collections in which two items share a key.
pub fn ensure_unique_keys<T>(items: &[Item<T>]) -> Result<(), LayoutError> {
    let mut seen = HashSet::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if !seen.insert(&item.key) {
            return Err(LayoutError::DuplicateKey {
                key: item.key.clone(),
                index,
            });
        }
    }
    Ok(())
}

/// Flatten columns back into the list of original indices they hold.
pub fn placed_indices<T>(columns: &Columns<T>) -> Vec<usize> {
    columns
        .iter()
        .flat_map(|column| column.iter().map(|a| a.index))
        .collect()
}
