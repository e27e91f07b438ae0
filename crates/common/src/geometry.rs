use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box. All containment tests use closed intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Cube centred on the origin.
    pub fn cube(half_extent: f64) -> Self {
        Self {
            min: DVec3::splat(-half_extent),
            max: DVec3::splat(half_extent),
        }
    }

    /// Smallest box containing every point. `None` for an empty slice.
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self {
            min: *first,
            max: *first,
        };
        for p in rest {
            bounds.min = bounds.min.min(*p);
            bounds.max = bounds.max.max(*p);
        }
        Some(bounds)
    }

    /// `min <= p <= max` on every axis.
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Grow every face outward by `padding`.
    pub fn expanded(&self, padding: f64) -> Self {
        Self {
            min: self.min - DVec3::splat(padding),
            max: self.max + DVec3::splat(padding),
        }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    /// The eight corners, indexed by bit pattern `(x, y, z)` where 1 selects `max`.
    pub fn corners(&self) -> [DVec3; 8] {
        std::array::from_fn(|i| {
            DVec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    /// The twelve edges as pairs of corner indices into [`Aabb::corners`].
    pub fn edges() -> [(usize, usize); 12] {
        [
            (0, 1),
            (2, 3),
            (4, 5),
            (6, 7),
            (0, 2),
            (1, 3),
            (4, 6),
            (5, 7),
            (0, 4),
            (1, 5),
            (2, 6),
            (3, 7),
        ]
    }
}

/// Finite line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: DVec3,
    pub end: DVec3,
}

impl Segment {
    pub fn new(start: DVec3, end: DVec3) -> Self {
        Self { start, end }
    }

    pub fn delta(&self) -> DVec3 {
        self.end - self.start
    }

    /// Both endpoints coincide.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_point_is_closed() {
        let b = Aabb::cube(0.25);
        assert!(b.contains_point(DVec3::new(0.25, -0.25, 0.0)));
        assert!(!b.contains_point(DVec3::new(0.2500001, 0.0, 0.0)));
    }

    #[test]
    fn from_points_covers_all() {
        let b = Aabb::from_points(&[
            DVec3::new(1.0, -2.0, 0.0),
            DVec3::new(-1.0, 3.0, 0.5),
        ])
        .unwrap();
        assert_eq!(b.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, DVec3::new(1.0, 3.0, 0.5));
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn corners_and_edges_are_consistent() {
        let b = Aabb::cube(1.0);
        let corners = b.corners();
        for (a, c) in Aabb::edges() {
            // Every edge differs in exactly one axis.
            let d = (corners[a] - corners[c]).abs();
            let changed = [d.x, d.y, d.z].iter().filter(|v| **v > 0.0).count();
            assert_eq!(changed, 1);
        }
    }

    #[test]
    fn expanded_grows_both_sides() {
        let b = Aabb::cube(1.0).expanded(0.5);
        assert_eq!(b.min, DVec3::splat(-1.5));
        assert_eq!(b.max, DVec3::splat(1.5));
        assert_eq!(b.center(), DVec3::ZERO);
    }

    #[test]
    fn segment_degenerate() {
        assert!(Segment::new(DVec3::ONE, DVec3::ONE).is_degenerate());
        assert!(!Segment::new(DVec3::ZERO, DVec3::ONE).is_degenerate());
    }
}
