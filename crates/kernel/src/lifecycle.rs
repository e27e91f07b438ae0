use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use saberline_common::Pose;
use tracing::debug;

use crate::error::SessionError;
use crate::level::{LevelObject, ObjectIndex};
use crate::scene::{BlockStyle, RenderHandle, Scene};

/// Metres behind the player past which an unresolved object is dropped.
pub const REAR_DESPAWN_DISTANCE: f64 = 5.0;

/// Signed distance an object has travelled past the player's plane.
/// Negative while it is still approaching.
pub fn forward_distance(time: f64, object_time_ms: f64, obj_speed: f64) -> f64 {
    (time - object_time_ms / 1000.0) * obj_speed
}

/// An active object with its position for the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub index: ObjectIndex,
    pub distance: f64,
}

impl Placement {
    pub fn is_behind_player(&self) -> bool {
        self.distance > REAR_DESPAWN_DISTANCE
    }
}

/// Sliding window of objects currently in play.
///
/// Everything before `obj_idx` has been admitted; `active` holds the admitted
/// objects that are neither cut nor evicted. Each active object owns at most
/// one render handle, released exactly once when it leaves the set.
#[derive(Debug, Default, Clone)]
pub struct ActiveSet {
    obj_idx: usize,
    active: BTreeSet<ObjectIndex>,
    handles: BTreeMap<ObjectIndex, RenderHandle>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next object awaiting admission.
    pub fn obj_idx(&self) -> usize {
        self.obj_idx
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, index: ObjectIndex) -> bool {
        self.active.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectIndex> + '_ {
        self.active.iter().copied()
    }

    pub fn handle(&self, index: ObjectIndex) -> Option<RenderHandle> {
        self.handles.get(&index).copied()
    }

    /// Admit every object that has reached the spawn horizon. Stops at the
    /// first object still too far away. Returns the admitted index range.
    pub fn admit(
        &mut self,
        objects: &[LevelObject],
        time: f64,
        obj_speed: f64,
        jump_offset: f64,
    ) -> Range<usize> {
        let start = self.obj_idx;
        while let Some(object) = objects.get(self.obj_idx) {
            if forward_distance(time, object.time, obj_speed) < -jump_offset {
                break;
            }
            debug!(index = self.obj_idx, object_time = object.time, "object admitted");
            self.active.insert(ObjectIndex(self.obj_idx));
            self.obj_idx += 1;
        }
        start..self.obj_idx
    }

    /// Position of every active object at `time`, computed once so the
    /// eviction and cut decisions of a tick agree.
    pub fn placements(&self, objects: &[LevelObject], time: f64, obj_speed: f64) -> Vec<Placement> {
        self.active
            .iter()
            .filter_map(|&index| {
                let object = objects.get(index.0)?;
                Some(Placement {
                    index,
                    distance: forward_distance(time, object.time, obj_speed),
                })
            })
            .collect()
    }

    /// Handle for an active object, spawning it on first use.
    pub fn ensure_handle(
        &mut self,
        index: ObjectIndex,
        object: &LevelObject,
        pose: &Pose,
        scene: &mut dyn Scene,
    ) -> Result<RenderHandle, SessionError> {
        if let Some(handle) = self.handles.get(&index) {
            return Ok(*handle);
        }
        let hand = object.kind.hand().ok_or(SessionError::UnrenderableObject {
            index,
            kind: object.kind,
        })?;
        let style = if object.any_dir {
            BlockStyle::Dot
        } else {
            BlockStyle::Arrow
        };
        let handle = scene.spawn_block(hand, style, pose);
        self.handles.insert(index, handle);
        Ok(handle)
    }

    /// Take an object out of play, releasing its handle if it has one.
    /// Returns false if it was not active.
    pub fn remove(&mut self, index: ObjectIndex, scene: &mut dyn Scene) -> bool {
        let was_active = self.active.remove(&index);
        if let Some(handle) = self.handles.remove(&index) {
            scene.release(handle);
        }
        was_active
    }

    /// Drop everything still in play. Used when a session is torn down.
    pub fn clear(&mut self, scene: &mut dyn Scene) {
        for (_, handle) in std::mem::take(&mut self.handles) {
            scene.release(handle);
        }
        self.active.clear();
    }
}
