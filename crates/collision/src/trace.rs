use saberline_common::{Pose, Segment};

use crate::cut::{EdgeCrossing, SweptLine};

/// Observer for the intermediate state of a cut test.
///
/// Every hook has an empty default so a tracer only overrides what it needs.
/// The detector calls the hooks in order: relative poses, swept lines, slice
/// line, one call per face edge, verdict.
pub trait CutTrace {
    /// Saber poses after being moved into block-local space.
    fn relative_poses(&mut self, _saber_prev: &Pose, _saber: &Pose) {}
    /// Handle-end and tip sweeps from the previous to the current frame.
    fn swept_lines(&mut self, _handle: &SweptLine, _tip: &SweptLine) {}
    /// Line across the block's top face where the blade sweep crosses it.
    fn slice_line(&mut self, _slice: &Segment) {}
    fn edge_crossing(&mut self, _crossing: &EdgeCrossing) {}
    fn verdict(&mut self, _cut: bool) {}
}

/// Tracer that records nothing. Used by the production path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl CutTrace for NoTrace {}
