//! Embodiment: where the player's headset and controller poses come from.
//!
//! # Invariants
//! - Live tracking and scripted input produce the same `PlayerPose` shape.
//! - Sources never touch simulation state; the driver decides what to do
//!   with a sample.

pub mod source;

pub use source::{
    IDLE_OFFSET, PoseSource, SWING_DEPTH, SWING_HALF_WINDOW, SWING_REACH, ScriptedSwings, StaticPose,
};
