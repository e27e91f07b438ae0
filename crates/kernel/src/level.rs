use saberline_common::Hand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::LevelError;

/// Object travel speed in m/s when a difficulty does not set one.
pub const DEFAULT_OBJECT_SPEED: f64 = 5.0;
/// Spawn distance in metres when a difficulty does not set one.
pub const DEFAULT_JUMP_OFFSET: f64 = 10.0;

/// Stable position of an object within its difficulty's object sequence.
///
/// Objects are identified by index, never by value: two objects with equal
/// fields are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LevelObjectKind {
    /// Mod-defined object with no built-in representation.
    Custom,
    BlockLeft,
    BlockRight,
}

impl LevelObjectKind {
    /// Hand whose saber must cut this object, if it is a block.
    pub fn hand(self) -> Option<Hand> {
        match self {
            LevelObjectKind::Custom => None,
            LevelObjectKind::BlockLeft => Some(Hand::Left),
            LevelObjectKind::BlockRight => Some(Hand::Right),
        }
    }
}

/// A scheduled event in a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelObject {
    #[serde(rename = "type")]
    pub kind: LevelObjectKind,
    /// Milliseconds from track start.
    pub time: f64,
    /// Left/right offset in metres, 0 is the middle.
    #[serde(default)]
    pub x: f64,
    /// Up/down offset in metres from eye level at full height.
    #[serde(default)]
    pub y: f64,
    /// Degrees, 0..360. 0 points up, 180 down.
    #[serde(default)]
    pub rot: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub any_dir: bool,
    #[serde(default, rename = "cd", skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
}

impl LevelObject {
    /// A directional block for `hand` arriving at `time_ms`.
    pub fn block(hand: Hand, time_ms: f64, x: f64, y: f64, rot: f64) -> Self {
        Self {
            kind: match hand {
                Hand::Left => LevelObjectKind::BlockLeft,
                Hand::Right => LevelObjectKind::BlockRight,
            },
            time: time_ms,
            x,
            y,
            rot,
            any_dir: false,
            custom_data: None,
        }
    }

    pub fn custom(time_ms: f64) -> Self {
        Self {
            kind: LevelObjectKind::Custom,
            time: time_ms,
            x: 0.0,
            y: 0.0,
            rot: 0.0,
            any_dir: false,
            custom_data: None,
        }
    }

    pub fn with_any_dir(mut self) -> Self {
        self.any_dir = true;
        self
    }

    pub fn time_seconds(&self) -> f64 {
        self.time / 1000.0
    }
}

/// One playable chart: an ordered object sequence plus movement parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDifficulty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Object travel speed in m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Distance in metres in front of the player at which objects spawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump_offset: Option<f64>,
    /// Ordered by non-decreasing `time`.
    pub objects: Vec<LevelObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
}

impl LevelDifficulty {
    pub fn new(objects: Vec<LevelObject>) -> Self {
        Self {
            objects,
            ..Default::default()
        }
    }

    pub fn object_speed(&self) -> f64 {
        self.speed.unwrap_or(DEFAULT_OBJECT_SPEED)
    }

    pub fn spawn_distance(&self) -> f64 {
        self.jump_offset.unwrap_or(DEFAULT_JUMP_OFFSET)
    }

    pub fn object(&self, index: ObjectIndex) -> Option<&LevelObject> {
        self.objects.get(index.0)
    }

    /// Check the time ordering the lifecycle scan relies on.
    pub fn validate(&self) -> Result<(), LevelError> {
        for (index, pair) in self.objects.windows(2).enumerate() {
            if pair[1].time < pair[0].time {
                return Err(LevelError::UnorderedObjects {
                    index: index + 1,
                    time: pair[1].time,
                    previous: pair[0].time,
                });
            }
        }
        Ok(())
    }
}

/// A song with its charts, grouped by play type (e.g. "standard").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub artist: String,
    pub mapper: String,
    pub maps: BTreeMap<String, Vec<LevelDifficulty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<serde_json::Value>,
}

impl Level {
    /// Look up a difficulty by play type and name. Without a name the first
    /// difficulty of that type is returned.
    pub fn difficulty(&self, kind: &str, name: Option<&str>) -> Option<&LevelDifficulty> {
        let maps = self.maps.get(kind)?;
        match name {
            Some(name) => maps.iter().find(|d| d.name.as_deref() == Some(name)),
            None => maps.first(),
        }
    }
}
