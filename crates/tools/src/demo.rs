use std::collections::BTreeMap;

use saberline_common::Hand;
use saberline_kernel::{Level, LevelDifficulty, LevelObject};

/// Play type the demo chart is filed under.
pub const DEMO_PLAY_TYPE: &str = "standard";

const FIRST_BEAT_MS: f64 = 2000.0;
const BEAT_SPACING_MS: f64 = 500.0;
const ROTATIONS: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// A chart of `beats` blocks alternating hands every half second, left
/// blocks in the left lane and right blocks in the right lane. Each hand
/// cycles through the four cut directions.
pub fn demo_difficulty(beats: usize) -> LevelDifficulty {
    let objects = (0..beats)
        .map(|i| {
            let hand = if i % 2 == 0 { Hand::Left } else { Hand::Right };
            let x = match hand {
                Hand::Left => -0.5,
                Hand::Right => 0.5,
            };
            let rot = ROTATIONS[(i / 2) % ROTATIONS.len()];
            LevelObject::block(hand, FIRST_BEAT_MS + i as f64 * BEAT_SPACING_MS, x, 0.0, rot)
        })
        .collect();
    LevelDifficulty {
        name: Some("Demo".to_string()),
        ..LevelDifficulty::new(objects)
    }
}

pub fn demo_level(beats: usize) -> Level {
    Level {
        title: "Demo".to_string(),
        subtitle: None,
        artist: "saberline".to_string(),
        mapper: "saberline".to_string(),
        maps: BTreeMap::from([(DEMO_PLAY_TYPE.to_string(), vec![demo_difficulty(beats)])]),
        custom_data: None,
    }
}
