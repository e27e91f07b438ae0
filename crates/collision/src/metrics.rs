//! Cut quality scoring.
//!
//! Detection is decided by [`crate::CutDetector::detect`] alone; everything in
//! this module only grades a cut that has already registered. [`CutMetrics`]
//! is the extension point for alternative scoring rules.

use glam::{DVec2, DVec3};

use crate::cut::CutGeometry;

/// Motion context for scoring a cut, supplied by the caller per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swing {
    /// Controller linear velocity over the tick, in world space and before
    /// any compensation for block travel.
    pub velocity: DVec3,
    /// Mean controller velocity over the recent swing window.
    pub recent_velocity: DVec3,
    /// The block accepts a cut from any direction.
    pub any_direction: bool,
}

impl Default for Swing {
    fn default() -> Self {
        Self {
            velocity: DVec3::ZERO,
            recent_velocity: DVec3::ZERO,
            any_direction: false,
        }
    }
}

/// Scores for a registered cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutQuality {
    pub accuracy: f64,
    pub speed: f64,
    pub strength: f64,
    pub angle: f64,
}

pub trait CutMetrics {
    fn score(&self, geometry: &CutGeometry, swing: &Swing) -> CutQuality;
}

/// Fixed scores regardless of the swing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderMetrics;

impl CutMetrics for PlaceholderMetrics {
    fn score(&self, _geometry: &CutGeometry, _swing: &Swing) -> CutQuality {
        CutQuality {
            accuracy: 1.0,
            speed: 1.0,
            strength: 1.0,
            angle: 0.0,
        }
    }
}

/// Scores derived from the swept blade plane and the controller's motion.
///
/// - accuracy: how close the blade plane passes to the block centre, relative
///   to the box's extent along the plane normal.
/// - speed: magnitude of the controller's velocity over the tick.
/// - strength: magnitude of the mean velocity over the swing window, so a long
///   swing in one direction outscores a quick flick.
/// - angle: tip sweep direction in the block's face plane against the
///   required direction (local -Y), clockwise positive, scaled to -1..1.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepMetrics;

impl CutMetrics for SweepMetrics {
    fn score(&self, geometry: &CutGeometry, swing: &Swing) -> CutQuality {
        CutQuality {
            accuracy: accuracy(geometry),
            speed: swing.velocity.length(),
            strength: swing.recent_velocity.length(),
            angle: if swing.any_direction {
                0.0
            } else {
                angle_error(geometry)
            },
        }
    }
}

fn accuracy(geometry: &CutGeometry) -> f64 {
    let (point, normal) = geometry.blade_plane();
    let hitbox = &geometry.hitbox;
    let support = normal.abs().dot(hitbox.half_extents());
    if support <= 0.0 {
        return 0.0;
    }
    let offset = normal.dot(hitbox.center() - point).abs();
    (1.0 - offset / support).clamp(0.0, 1.0)
}

fn angle_error(geometry: &CutGeometry) -> f64 {
    let d = geometry.tip_sweep.delta();
    let sweep = DVec2::new(d.x, d.y);
    if sweep == DVec2::ZERO {
        return 0.0;
    }
    let required = DVec2::NEG_Y;
    let counter_clockwise = required.perp_dot(sweep).atan2(required.dot(sweep));
    -counter_clockwise / std::f64::consts::PI
}

/// Ring buffer of recent controller velocities for one hand.
#[derive(Debug, Clone)]
pub struct SwingWindow {
    history: Vec<DVec3>,
    capacity: usize,
    index: usize,
    filled: bool,
}

impl SwingWindow {
    /// `capacity` is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![DVec3::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, velocity: DVec3) {
        self.history[self.index] = velocity;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
    }

    pub fn count(&self) -> usize {
        if self.filled { self.capacity } else { self.index }
    }

    pub fn mean(&self) -> DVec3 {
        let count = self.count();
        if count == 0 {
            return DVec3::ZERO;
        }
        self.history[..count].iter().copied().sum::<DVec3>() / count as f64
    }

    pub fn clear(&mut self) {
        self.index = 0;
        self.filled = false;
    }
}
