use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Number of scalar fields in a flattened pose: position xyz + quaternion xyzw.
pub const POSE_FIELDS: usize = 7;

/// Rigid body placement: position plus unit-quaternion orientation.
///
/// Double precision throughout so recorded samples survive a round trip
/// through the 64-bit recording format bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` with identity orientation.
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
        }
    }

    /// Express this pose in the local space of `parent`.
    ///
    /// `position = inverse(parent.rotation) * (position - parent.position)`,
    /// `rotation = inverse(parent.rotation) * rotation`. Neither input is mutated.
    pub fn relative_to(&self, parent: &Pose) -> Pose {
        let inverse = parent.rotation.conjugate();
        Pose {
            position: inverse * (self.position - parent.position),
            rotation: inverse * self.rotation,
        }
    }

    /// Same orientation, position moved by `offset`.
    pub fn translated(&self, offset: DVec3) -> Pose {
        Pose {
            position: self.position + offset,
            rotation: self.rotation,
        }
    }

    /// Point `distance` metres along the pose's forward axis (local -Z).
    pub fn point_along(&self, distance: f64) -> DVec3 {
        self.rotation * DVec3::new(0.0, 0.0, -distance) + self.position
    }

    /// Flatten to `[x, y, z, qx, qy, qz, qw]`.
    pub fn to_array(&self) -> [f64; POSE_FIELDS] {
        let p = self.position;
        let q = self.rotation;
        [p.x, p.y, p.z, q.x, q.y, q.z, q.w]
    }

    /// Inverse of [`Pose::to_array`]. The quaternion is taken verbatim, not renormalized.
    pub fn from_array(v: [f64; POSE_FIELDS]) -> Self {
        Self {
            position: DVec3::new(v[0], v[1], v[2]),
            rotation: DQuat::from_xyzw(v[3], v[4], v[5], v[6]),
        }
    }
}

/// Which hand holds a saber. Index matches controller order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    /// Controller slot driving this hand's saber.
    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }
}

/// Headset plus both controllers, sampled once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerPose {
    pub headset: Pose,
    pub controllers: [Pose; 2],
}

impl PlayerPose {
    pub fn controller(&self, hand: Hand) -> &Pose {
        &self.controllers[hand.index()]
    }
}
