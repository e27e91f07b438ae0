//! Geometry primitives shared by every saberline crate.
//!
//! # Invariants
//! - All operations are pure: inputs are never mutated.
//! - Inputs are assumed finite; NaN and infinity propagate unguarded.

mod geometry;
mod types;

pub use geometry::{Aabb, Segment};
pub use types::{Hand, POSE_FIELDS, PlayerPose, Pose};
