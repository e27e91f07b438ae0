use std::fmt;

use saberline_collision::{CutTrace, EdgeCrossing, SweptLine};
use saberline_common::{Pose, Segment};

/// One observed stage of a cut test.
#[derive(Debug, Clone, PartialEq)]
pub enum CutStep {
    RelativePoses { saber_prev: Pose, saber: Pose },
    SweptLines { handle: SweptLine, tip: SweptLine },
    SliceLine(Segment),
    EdgeCrossing(EdgeCrossing),
    Verdict(bool),
}

/// Records every intermediate result of a cut test for display.
#[derive(Debug, Clone, Default)]
pub struct CutStepRecorder {
    steps: Vec<CutStep>,
}

impl CutStepRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[CutStep] {
        &self.steps
    }

    /// Final verdict, if the test ran to completion.
    pub fn verdict(&self) -> Option<bool> {
        self.steps.iter().rev().find_map(|step| match step {
            CutStep::Verdict(cut) => Some(*cut),
            _ => None,
        })
    }

    pub fn crossings(&self) -> impl Iterator<Item = &EdgeCrossing> {
        self.steps.iter().filter_map(|step| match step {
            CutStep::EdgeCrossing(crossing) => Some(crossing),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

impl CutTrace for CutStepRecorder {
    fn relative_poses(&mut self, saber_prev: &Pose, saber: &Pose) {
        self.steps.push(CutStep::RelativePoses {
            saber_prev: *saber_prev,
            saber: *saber,
        });
    }

    fn swept_lines(&mut self, handle: &SweptLine, tip: &SweptLine) {
        self.steps.push(CutStep::SweptLines {
            handle: *handle,
            tip: *tip,
        });
    }

    fn slice_line(&mut self, slice: &Segment) {
        self.steps.push(CutStep::SliceLine(*slice));
    }

    fn edge_crossing(&mut self, crossing: &EdgeCrossing) {
        self.steps.push(CutStep::EdgeCrossing(*crossing));
    }

    fn verdict(&mut self, cut: bool) {
        self.steps.push(CutStep::Verdict(cut));
    }
}

fn segment(f: &mut fmt::Formatter<'_>, label: &str, s: &Segment) -> fmt::Result {
    writeln!(
        f,
        "  {label}: ({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3})",
        s.start.x, s.start.y, s.start.z, s.end.x, s.end.y, s.end.z
    )
}

impl fmt::Display for CutStepRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step {
                CutStep::RelativePoses { saber_prev, saber } => {
                    writeln!(f, "block-local saber:")?;
                    segment(f, "grip", &Segment::new(saber_prev.position, saber.position))?;
                }
                CutStep::SweptLines { handle, tip } => {
                    writeln!(f, "swept lines:")?;
                    segment(f, "handle", &handle.line)?;
                    segment(f, "tip", &tip.line)?;
                }
                CutStep::SliceLine(slice) => {
                    writeln!(f, "slice line:")?;
                    segment(f, "top", slice)?;
                }
                CutStep::EdgeCrossing(c) => writeln!(
                    f,
                    "  edge {:?} at {:.3}: face={} blade={}",
                    c.edge, c.at, c.within_face, c.within_blade
                )?,
                CutStep::Verdict(cut) => writeln!(f, "verdict: {}", if *cut { "CUT" } else { "miss" })?,
            }
        }
        Ok(())
    }
}
