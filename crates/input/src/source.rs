use glam::{DQuat, DVec3};
use saberline_common::{Hand, PlayerPose, Pose};
use saberline_kernel::LevelDifficulty;
use tracing::debug;

/// Supplies the player's tracked pose each tick.
pub trait PoseSource {
    /// Pose at simulation `time` seconds.
    fn sample(&mut self, time: f64) -> PlayerPose;
}

/// The same pose forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPose(pub PlayerPose);

impl PoseSource for StaticPose {
    fn sample(&mut self, _time: f64) -> PlayerPose {
        self.0
    }
}

/// Seconds either side of a beat during which a scripted hand is swinging.
pub const SWING_HALF_WINDOW: f64 = 0.15;
/// Distance either side of the block centre the scripted swing covers.
pub const SWING_REACH: f64 = 0.5;
/// Controller depth relative to the headset while swinging.
pub const SWING_DEPTH: f64 = -0.4;
/// Sideways distance of an idle hand from the centre line.
pub const IDLE_OFFSET: f64 = 2.5;

#[derive(Debug, Clone, Copy)]
struct Beat {
    time: f64,
    center: DVec3,
    /// Unit direction of the sweep, the block's local -Y.
    direction: DVec3,
}

/// Synthetic player that swings through every block of a difficulty.
///
/// Each hand rests well outside the lanes and, for a short window around
/// each of its blocks' beats, sweeps across the block's centre along the
/// block's required cut direction with the blade pointing forward.
#[derive(Debug, Clone)]
pub struct ScriptedSwings {
    beats: [Vec<Beat>; 2],
    headset: Pose,
    idle: [Pose; 2],
}

impl ScriptedSwings {
    pub fn from_difficulty(difficulty: &LevelDifficulty, player_height: f64) -> Self {
        let mut beats: [Vec<Beat>; 2] = [Vec::new(), Vec::new()];
        for object in &difficulty.objects {
            let Some(hand) = object.kind.hand() else {
                continue;
            };
            let direction = DQuat::from_rotation_z(object.rot.to_radians()) * DVec3::NEG_Y;
            beats[hand.index()].push(Beat {
                time: object.time_seconds(),
                center: DVec3::new(object.x, player_height + object.y, SWING_DEPTH),
                direction,
            });
        }
        debug!(
            left = beats[0].len(),
            right = beats[1].len(),
            "scripted swings prepared"
        );
        let idle_y = player_height - 0.6;
        Self {
            beats,
            headset: Pose::at(DVec3::new(0.0, player_height, 0.0)),
            idle: [
                Pose::at(DVec3::new(-IDLE_OFFSET, idle_y, SWING_DEPTH)),
                Pose::at(DVec3::new(IDLE_OFFSET, idle_y, SWING_DEPTH)),
            ],
        }
    }

    pub fn beat_count(&self, hand: Hand) -> usize {
        self.beats[hand.index()].len()
    }

    fn controller(&self, hand: Hand, time: f64) -> Pose {
        let beats = &self.beats[hand.index()];
        let next = beats.partition_point(|b| b.time + SWING_HALF_WINDOW < time);
        match beats.get(next) {
            Some(beat) if beat.time - SWING_HALF_WINDOW <= time => {
                let progress = (time - beat.time) / SWING_HALF_WINDOW;
                Pose::at(beat.center + beat.direction * SWING_REACH * progress)
            }
            _ => self.idle[hand.index()],
        }
    }
}

impl PoseSource for ScriptedSwings {
    fn sample(&mut self, time: f64) -> PlayerPose {
        PlayerPose {
            headset: self.headset,
            controllers: [
                self.controller(Hand::Left, time),
                self.controller(Hand::Right, time),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saberline_kernel::LevelObject;

    fn difficulty() -> LevelDifficulty {
        LevelDifficulty::new(vec![
            LevelObject::block(Hand::Left, 1000.0, -0.5, 0.0, 0.0),
            LevelObject::block(Hand::Right, 2000.0, 0.5, 0.25, 90.0),
        ])
    }

    #[test]
    fn static_pose_never_moves() {
        let pose = PlayerPose {
            headset: Pose::at(DVec3::new(0.0, 1.7, 0.0)),
            ..Default::default()
        };
        let mut source = StaticPose(pose);
        assert_eq!(source.sample(0.0), pose);
        assert_eq!(source.sample(9.0), pose);
    }

    #[test]
    fn hands_idle_outside_windows() {
        let mut swings = ScriptedSwings::from_difficulty(&difficulty(), 1.7);
        let pose = swings.sample(0.0);
        assert_eq!(pose.controllers[0].position.x, -IDLE_OFFSET);
        assert_eq!(pose.controllers[1].position.x, IDLE_OFFSET);
        assert_eq!(pose.headset.position.y, 1.7);
    }

    #[test]
    fn swing_passes_through_block_centre_on_beat() {
        let mut swings = ScriptedSwings::from_difficulty(&difficulty(), 1.7);
        let left = swings.sample(1.0).controllers[0].position;
        assert_eq!(left, DVec3::new(-0.5, 1.7, SWING_DEPTH));

        let early = swings.sample(1.0 - SWING_HALF_WINDOW).controllers[0].position;
        assert!((early.y - (1.7 + SWING_REACH)).abs() < 1e-12);
        // Right hand is idle while the left swings.
        assert_eq!(swings.sample(1.0).controllers[1].position.x, IDLE_OFFSET);
    }

    #[test]
    fn swing_follows_block_rotation() {
        let mut swings = ScriptedSwings::from_difficulty(&difficulty(), 1.7);
        let before = swings.sample(1.9).controllers[1].position;
        let after = swings.sample(2.1).controllers[1].position;
        // rot 90 turns the downward cut into one towards +x.
        assert!(after.x > before.x);
        assert!((after.y - before.y).abs() < 1e-9);
    }
}
