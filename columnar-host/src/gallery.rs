//! Demo content: a gallery of generated-image cards.
//!
//! Heights and load times come from a small deterministic mix so the demo
//! and the tests see the same layout on every run.

use std::time::Duration;

use columnar_core::{Item, ItemKey};
use serde::{Deserialize, Serialize};

use crate::media::{LoadBehavior, MediaSpec, RenderSpec};

/// Caption strip under every card.
pub const CAPTION_HEIGHT: f64 = 48.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    pub prompt: String,
}

/// Build `count` cards with their render specs.
///
/// Every seventh image fails to load, and if `stuck` is set the last image
/// never reports back at all.
pub fn demo_gallery(count: usize, stuck: bool) -> (Vec<Item<Card>>, Vec<(ItemKey, RenderSpec)>) {
    let mut items = Vec::with_capacity(count);
    let mut specs = Vec::with_capacity(count);

    for i in 0..count {
        let key = format!("card-{:03}", i);
        let mixed = (i * 7919 + 13) % 97;

        let behavior = if stuck && i + 1 == count {
            LoadBehavior::Never
        } else if i % 7 == 6 {
            LoadBehavior::Fails(Duration::from_millis(40 + mixed as u64 * 3))
        } else {
            LoadBehavior::Loads(Duration::from_millis(60 + mixed as u64 * 8))
        };

        let spec = RenderSpec {
            base_height: CAPTION_HEIGHT,
            media: Some(MediaSpec {
                intrinsic_height: 120.0 + (mixed as f64) * 4.0,
                placeholder_height: 24.0,
                behavior,
            }),
        };

        items.push(Item::new(
            key.as_str(),
            Card {
                title: format!("Generation #{}", i + 1),
                prompt: format!("variation {} of a lighthouse at dusk", i + 1),
            },
        ));
        specs.push((ItemKey::from(key), spec));
    }

    (items, specs)
}
