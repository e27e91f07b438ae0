//! Cut Detection: swept saber vs. block intersection and cut scoring.
//!
//! # Invariants
//! - The test runs in block-local space; translating block and sabers together
//!   never changes the outcome.
//! - Degenerate sweeps (zero velocity, parallel projections) always resolve to
//!   a definite cut/no-cut answer through the endpoint fallback, never NaN.
//! - One implementation serves both production and debugging; debugging
//!   observes it through [`CutTrace`].

mod bounds;
mod cut;
mod metrics;
mod trace;

pub use bounds::{hitbox_reach, may_reach, sweep_bounds};
pub use cut::{
    BlockHalf, CutDetector, CutGeometry, CutResult, EdgeCrossing, FaceEdge, Projection,
    SaberDimensions, SweptLine, calculate_cut, crosses_between,
};
pub use metrics::{CutMetrics, CutQuality, PlaceholderMetrics, SweepMetrics, Swing, SwingWindow};
pub use trace::{CutTrace, NoTrace};
