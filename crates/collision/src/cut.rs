use glam::DVec3;
use saberline_common::{Aabb, Pose, Segment};
use serde::{Deserialize, Serialize};

use crate::metrics::{CutMetrics, SweepMetrics, Swing};
use crate::trace::{CutTrace, NoTrace};

/// Physical saber dimensions in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaberDimensions {
    /// Distance from the grip origin to the blade tip.
    pub saber_length: f64,
    /// Length of the handle; the blade's inner sample point sits at half of it.
    pub handle_length: f64,
}

impl Default for SaberDimensions {
    fn default() -> Self {
        Self {
            saber_length: 1.5,
            handle_length: 0.2,
        }
    }
}

/// Gradient/intercept form of a segment projected onto one plane:
/// `rise = gradient * run + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub gradient: f64,
    pub intercept: f64,
}

impl Projection {
    /// Line through two projected points. `None` when both share the run
    /// coordinate, which would need a division by zero.
    pub fn through(run_a: f64, rise_a: f64, run_b: f64, rise_b: f64) -> Option<Self> {
        if run_a == run_b {
            return None;
        }
        let gradient = (rise_b - rise_a) / (run_b - run_a);
        Some(Self {
            gradient,
            intercept: rise_b - run_b * gradient,
        })
    }

    /// Run coordinate at which the line reaches `rise`. `None` for a flat line.
    pub fn run_at(&self, rise: f64) -> Option<f64> {
        (self.gradient != 0.0).then(|| (rise - self.intercept) / self.gradient)
    }

    pub fn rise_at(&self, run: f64) -> f64 {
        self.gradient * run + self.intercept
    }
}

/// One blade sample point swept from the previous frame to the current one,
/// with its X/Y and Z/Y projections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweptLine {
    pub line: Segment,
    /// Y as a function of X. `None` when the sweep has no X run.
    pub xy: Option<Projection>,
    /// Y as a function of Z. `None` when the sweep has no Z run.
    pub zy: Option<Projection>,
}

impl SweptLine {
    pub fn new(line: Segment) -> Self {
        let (a, b) = (line.start, line.end);
        Self {
            line,
            xy: Projection::through(a.x, a.y, b.x, b.y),
            zy: Projection::through(a.z, a.y, b.z, b.y),
        }
    }

    /// Where the (infinite) line reaches height `y`. An axis whose projection
    /// is degenerate keeps the start point's coordinate.
    pub fn at_height(&self, y: f64) -> DVec3 {
        let start = self.line.start;
        let x = self.xy.and_then(|p| p.run_at(y)).unwrap_or(start.x);
        let z = self.zy.and_then(|p| p.run_at(y)).unwrap_or(start.z);
        DVec3::new(x, y, z)
    }
}

/// Edges of the block's top face in block-local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceEdge {
    /// `x = min.x`
    Left,
    /// `x = max.x`
    Right,
    /// `z = max.z`
    Front,
    /// `z = min.z`
    Back,
}

/// Intersection of the slice line with one top-face edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCrossing {
    pub edge: FaceEdge,
    /// Coordinate along the edge: Z for left/right, X for front/back.
    pub at: f64,
    /// Crossing lies within the edge's finite extent.
    pub within_face: bool,
    /// Edge lies between the slice line's endpoints on the perpendicular axis.
    pub within_blade: bool,
}

impl EdgeCrossing {
    pub fn registers(&self) -> bool {
        self.within_face && self.within_blade
    }
}

/// Ordering-parity betweenness: `(edge > a) == (edge < b)`.
///
/// True when `edge` lies strictly between `a` and `b` in either order, and also
/// when it coincides with `a` while `b` is below it. The test is not limited to
/// the plane the blade actually swept, so crossings near the block's corners
/// can register from the extended slice line.
pub fn crosses_between(edge: f64, a: f64, b: f64) -> bool {
    (edge > a) == (edge < b)
}

/// Geometry of a registered cut, all in block-local space.
#[derive(Debug, Clone, PartialEq)]
pub struct CutGeometry {
    pub saber_prev: Pose,
    pub saber: Pose,
    pub handle_sweep: Segment,
    pub tip_sweep: Segment,
    pub slice: Segment,
    pub crossings: [EdgeCrossing; 4],
    pub hitbox: Aabb,
}

impl CutGeometry {
    /// Plane spanned by the swept blade as `(point, unit normal)`.
    ///
    /// A blade that did not move, or moved only along itself, has no swept
    /// area; the normal then falls back to the blade direction crossed with
    /// +Y, and finally to +X.
    pub fn blade_plane(&self) -> (DVec3, DVec3) {
        let (h0, h1) = (self.handle_sweep.start, self.handle_sweep.end);
        let (t0, t1) = (self.tip_sweep.start, self.tip_sweep.end);
        let point = (h0 + h1 + t0 + t1) * 0.25;

        let swept = (t1 - h0).cross(t0 - h1).normalize_or_zero();
        if swept != DVec3::ZERO {
            return (point, swept);
        }
        let blade = (t1 - h1).cross(DVec3::Y).normalize_or_zero();
        if blade != DVec3::ZERO {
            return (point, blade);
        }
        (point, DVec3::X)
    }

    /// Split the hitbox along the blade plane into two convex vertex sets.
    pub fn split_hitbox(&self) -> [BlockHalf; 2] {
        let (point, normal) = self.blade_plane();
        let corners = self.hitbox.corners();
        let dist = corners.map(|c| normal.dot(c - point));

        let mut front = Vec::with_capacity(8);
        let mut back = Vec::with_capacity(8);
        for (corner, d) in corners.iter().zip(dist) {
            if d >= 0.0 {
                front.push(*corner);
            } else {
                back.push(*corner);
            }
        }
        for (a, b) in Aabb::edges() {
            if (dist[a] >= 0.0) != (dist[b] >= 0.0) {
                let t = dist[a] / (dist[a] - dist[b]);
                let p = corners[a] + (corners[b] - corners[a]) * t;
                front.push(p);
                back.push(p);
            }
        }
        [BlockHalf { vertices: front }, BlockHalf { vertices: back }]
    }
}

/// Vertices of one piece of a cut block, in block-local space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockHalf {
    pub vertices: Vec<DVec3>,
}

/// Outcome of a positive cut test.
#[derive(Debug, Clone, PartialEq)]
pub struct CutResult {
    /// 0 = graze, 1 = exact bisection.
    pub accuracy: f64,
    /// Controller speed in m/s over the tick.
    pub speed: f64,
    /// Speed sustained in a consistent direction over the recent swing window.
    pub strength: f64,
    /// -1..1, 0 = required direction, positive = rotated clockwise.
    pub angle: f64,
    pub block_halves: [BlockHalf; 2],
}

/// Swept saber vs. block test.
///
/// Both saber poses are moved into the block's local space so the block is an
/// axis-aligned box at the origin; the sweep is then reduced to a slice line
/// across the top face and intersected with the face's four edges.
#[derive(Debug, Clone)]
pub struct CutDetector<M = SweepMetrics> {
    dims: SaberDimensions,
    hitbox: Aabb,
    metrics: M,
}

impl CutDetector<SweepMetrics> {
    pub fn new(dims: SaberDimensions, hitbox: Aabb) -> Self {
        Self {
            dims,
            hitbox,
            metrics: SweepMetrics,
        }
    }
}

impl<M: CutMetrics> CutDetector<M> {
    /// Replace the metrics used to score registered cuts.
    pub fn with_metrics<N: CutMetrics>(self, metrics: N) -> CutDetector<N> {
        CutDetector {
            dims: self.dims,
            hitbox: self.hitbox,
            metrics,
        }
    }

    pub fn dims(&self) -> &SaberDimensions {
        &self.dims
    }

    pub fn hitbox(&self) -> &Aabb {
        &self.hitbox
    }

    /// Decide whether the blade swept through the block's top face this tick.
    pub fn detect<T: CutTrace + ?Sized>(
        &self,
        block: &Pose,
        saber_prev: &Pose,
        saber: &Pose,
        trace: &mut T,
    ) -> Option<CutGeometry> {
        let rel_prev = saber_prev.relative_to(block);
        let rel = saber.relative_to(block);
        trace.relative_poses(&rel_prev, &rel);

        let inner = self.dims.handle_length / 2.0;
        let outer = self.dims.saber_length;
        let handle = SweptLine::new(Segment::new(
            rel_prev.point_along(inner),
            rel.point_along(inner),
        ));
        let tip = SweptLine::new(Segment::new(
            rel_prev.point_along(outer),
            rel.point_along(outer),
        ));
        trace.swept_lines(&handle, &tip);

        let top = self.hitbox.max.y;
        let slice = Segment::new(handle.at_height(top), tip.at_height(top));
        trace.slice_line(&slice);

        let crossings = face_crossings(&slice, &self.hitbox);
        for crossing in &crossings {
            trace.edge_crossing(crossing);
        }
        let cut = crossings.iter().any(EdgeCrossing::registers);
        trace.verdict(cut);

        cut.then(|| CutGeometry {
            saber_prev: rel_prev,
            saber: rel,
            handle_sweep: handle.line,
            tip_sweep: tip.line,
            slice,
            crossings,
            hitbox: self.hitbox,
        })
    }

    /// Detect and score a cut.
    pub fn cut(&self, block: &Pose, saber_prev: &Pose, saber: &Pose, swing: &Swing) -> Option<CutResult> {
        self.cut_traced(block, saber_prev, saber, swing, &mut NoTrace)
    }

    pub fn cut_traced<T: CutTrace + ?Sized>(
        &self,
        block: &Pose,
        saber_prev: &Pose,
        saber: &Pose,
        swing: &Swing,
        trace: &mut T,
    ) -> Option<CutResult> {
        let geometry = self.detect(block, saber_prev, saber, trace)?;
        let quality = self.metrics.score(&geometry, swing);
        Some(CutResult {
            accuracy: quality.accuracy,
            speed: quality.speed,
            strength: quality.strength,
            angle: quality.angle,
            block_halves: geometry.split_hitbox(),
        })
    }
}

/// One-shot cut test with default metrics and an empty swing history.
pub fn calculate_cut(
    block: &Pose,
    saber_prev: &Pose,
    saber: &Pose,
    dims: &SaberDimensions,
    hitbox: &Aabb,
) -> Option<CutResult> {
    CutDetector::new(*dims, *hitbox).cut(block, saber_prev, saber, &Swing::default())
}

fn face_crossings(slice: &Segment, hitbox: &Aabb) -> [EdgeCrossing; 4] {
    let (a, b) = (slice.start, slice.end);
    // Z as a function of X across the top face.
    let xz = Projection::through(a.x, a.z, b.x, b.z);

    let z_at = |x: f64| {
        if a.z == b.z {
            a.z
        } else {
            xz.map_or(a.z, |p| p.rise_at(x))
        }
    };
    let x_at = |z: f64| {
        if a.x == b.x {
            a.x
        } else {
            xz.and_then(|p| p.run_at(z)).unwrap_or(a.x)
        }
    };

    let side = |edge: FaceEdge, x: f64| {
        let z = z_at(x);
        EdgeCrossing {
            edge,
            at: z,
            within_face: (hitbox.min.z..=hitbox.max.z).contains(&z),
            within_blade: crosses_between(x, a.x, b.x),
        }
    };
    let end = |edge: FaceEdge, z: f64| {
        let x = x_at(z);
        EdgeCrossing {
            edge,
            at: x,
            within_face: (hitbox.min.x..=hitbox.max.x).contains(&x),
            within_blade: crosses_between(z, a.z, b.z),
        }
    };

    [
        side(FaceEdge::Left, hitbox.min.x),
        side(FaceEdge::Right, hitbox.max.x),
        end(FaceEdge::Front, hitbox.max.z),
        end(FaceEdge::Back, hitbox.min.z),
    ]
}
