use std::ops::Range;
use std::sync::Arc;

use glam::{DQuat, DVec3};
use saberline_collision::{
    CutDetector, CutResult, SaberDimensions, Swing, SwingWindow, hitbox_reach, may_reach,
    sweep_bounds,
};
use saberline_common::{Aabb, Hand, PlayerPose, Pose};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

use crate::clock::{ClockMode, LevelClock};
use crate::completion::{Completer, SessionCompletion};
use crate::error::SessionError;
use crate::level::{LevelDifficulty, LevelObject, ObjectIndex};
use crate::lifecycle::ActiveSet;
use crate::scene::Scene;
use crate::time_source::TimeSource;

/// Metres between the headset and the plane where blocks should be cut.
pub const BEAT_Z_OFFSET: f64 = 1.5;

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of track position to start from. Negative values give pre-roll.
    pub start_time: f64,
    /// Playback rate multiplier, fixed for the session.
    pub speed: f64,
    pub playing: bool,
    /// Volume applied to the time source when it starts.
    pub volume: f64,
    /// Eye height in metres that block `y` offsets are relative to.
    pub player_height: f64,
    pub saber: SaberDimensions,
    /// Half the edge length of the cubic block hitbox.
    pub hitbox_half_extent: f64,
    /// Skip the cut test for blocks whose centre lies outside the blade's
    /// padded sweep. Off by default: the slice line extends past the blade,
    /// so this also drops cuts the detector would register.
    pub broadphase: bool,
    /// Ticks of controller velocity averaged for cut strength.
    pub swing_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_time: -1.0,
            speed: 1.0,
            playing: true,
            volume: 0.8,
            player_height: 1.7,
            saber: SaberDimensions::default(),
            hitbox_half_extent: 0.5,
            broadphase: false,
            swing_window: 8,
        }
    }
}

/// Saber pose this tick and at the end of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SaberState {
    pub current: Pose,
    /// `None` until the first tick has been simulated.
    pub previous: Option<Pose>,
}

/// A block cut by a saber.
#[derive(Debug, Clone, PartialEq)]
pub struct CutEvent {
    pub object: ObjectIndex,
    pub hand: Hand,
    pub time: f64,
    pub result: CutResult,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    pub time: f64,
    pub mode: ClockMode,
    /// Object indices admitted this tick.
    pub admitted: Range<usize>,
    /// Objects that passed behind the player uncut.
    pub evicted: Vec<ObjectIndex>,
    pub cuts: Vec<CutEvent>,
}

/// World pose of a block `distance` metres along its travel.
pub fn block_pose(object: &LevelObject, distance: f64, headset: &Pose, player_height: f64) -> Pose {
    Pose::new(
        DVec3::new(
            object.x,
            player_height + object.y,
            distance + headset.position.z - BEAT_Z_OFFSET,
        ),
        DQuat::from_rotation_z(object.rot.to_radians()),
    )
}

/// Mutable state of one playback of one difficulty.
///
/// Owns the clock, active set, and saber history exclusively. Both playback
/// drivers run the same `update_time` / `update_physics` pair each tick.
pub struct LevelSession {
    difficulty: Arc<LevelDifficulty>,
    config: SessionConfig,
    clock: LevelClock,
    active: ActiveSet,
    detector: CutDetector,
    sabers: [SaberState; 2],
    swings: [SwingWindow; 2],
    obj_speed: f64,
    jump_offset: f64,
    completer: Completer,
    cuts: Vec<CutEvent>,
    evicted: usize,
    ticks: u64,
}

impl LevelSession {
    pub fn new(difficulty: Arc<LevelDifficulty>, config: SessionConfig) -> Result<Self, SessionError> {
        difficulty.validate()?;
        let obj_speed = difficulty.object_speed();
        let jump_offset = difficulty.spawn_distance();
        info!(
            objects = difficulty.objects.len(),
            obj_speed,
            jump_offset,
            start_time = config.start_time,
            speed = config.speed,
            "session created"
        );
        Ok(Self {
            clock: LevelClock::new(config.start_time, config.speed, config.volume, config.playing),
            active: ActiveSet::new(),
            detector: CutDetector::new(config.saber, Aabb::cube(config.hitbox_half_extent)),
            sabers: [SaberState::default(); 2],
            swings: [
                SwingWindow::new(config.swing_window),
                SwingWindow::new(config.swing_window),
            ],
            obj_speed,
            jump_offset,
            completer: Completer::new(),
            cuts: Vec::new(),
            evicted: 0,
            ticks: 0,
            difficulty,
            config,
        })
    }

    pub fn difficulty(&self) -> &LevelDifficulty {
        &self.difficulty
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> &LevelClock {
        &self.clock
    }

    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    pub fn saber(&self, hand: Hand) -> &SaberState {
        &self.sabers[hand.index()]
    }

    /// Every cut so far, in the order they happened.
    pub fn cut_history(&self) -> &[CutEvent] {
        &self.cuts
    }

    pub fn evicted_count(&self) -> usize {
        self.evicted
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// True once the completion future has an outcome.
    pub fn is_finished(&self) -> bool {
        self.completer.is_resolved()
    }

    pub fn completion(&self) -> SessionCompletion {
        self.completer.completion()
    }

    pub fn update_time(&mut self, time_delta: f64, audio: &dyn TimeSource) -> ClockMode {
        self.clock.update_time(time_delta, audio)
    }

    /// Stopping pauses the time source. Nothing already evicted or cut is undone.
    pub fn set_stopped(&mut self, stopped: bool, audio: &mut dyn TimeSource) {
        self.clock.set_playing(!stopped);
        if stopped {
            audio.pause();
        }
        info!(stopped, time = self.clock.time(), "playback state changed");
    }

    /// Release every render handle still held. The session keeps its history.
    pub fn release_all(&mut self, scene: &mut dyn Scene) {
        self.active.clear(scene);
    }

    /// Run admission, eviction, placement and cut testing for the current time.
    pub fn update_physics(
        &mut self,
        player: &PlayerPose,
        scene: &mut dyn Scene,
        audio: &mut dyn TimeSource,
    ) -> Result<TickReport, SessionError> {
        self.ticks += 1;
        let time = self.clock.time();
        let tick_seconds = time - self.clock.prev_time();
        let mut report = TickReport {
            time,
            mode: self.clock.mode(),
            ..TickReport::default()
        };

        if self.clock.poll_end(audio) {
            info!(time, cuts = self.cuts.len(), "track ended");
            self.completer.resolve(Ok(()));
        }
        if let Err(err) = self.clock.sync_source(audio) {
            return Err(self.fail(err.into()));
        }

        // Blocks moved towards the player since last tick; move the previous
        // saber pose with them so the sweep is measured in the block's frame.
        // Controller velocity is taken before the shift.
        let travel = tick_seconds * self.obj_speed;
        let mut velocities = [DVec3::ZERO; 2];
        for hand in Hand::BOTH {
            let saber = &mut self.sabers[hand.index()];
            saber.current = *player.controller(hand);
            if let Some(prev) = saber.previous.as_mut() {
                if tick_seconds > 0.0 {
                    let velocity = (saber.current.position - prev.position) / tick_seconds;
                    velocities[hand.index()] = velocity;
                    self.swings[hand.index()].record(velocity);
                }
                prev.position.z += travel;
            }
        }

        let difficulty = Arc::clone(&self.difficulty);
        let objects = &difficulty.objects;
        report.admitted = self.active.admit(objects, time, self.obj_speed, self.jump_offset);

        let reach = hitbox_reach(self.detector.hitbox());
        let sweeps = self.sabers.map(|s| {
            s.previous
                .map(|prev| sweep_bounds(&prev, &s.current, self.detector.dims(), reach))
        });

        for placement in self.active.placements(objects, time, self.obj_speed) {
            let index = placement.index;
            let Some(object) = objects.get(index.0) else {
                continue;
            };
            if placement.is_behind_player() {
                self.active.remove(index, scene);
                self.evicted += 1;
                debug!(index = index.0, distance = placement.distance, "object evicted");
                report.evicted.push(index);
                continue;
            }

            let pose = block_pose(object, placement.distance, &player.headset, self.config.player_height);
            let handle = match self.active.ensure_handle(index, object, &pose, scene) {
                Ok(handle) => handle,
                Err(err) => return Err(self.fail(err)),
            };
            scene.move_object(handle, &pose);

            let Some(hand) = object.kind.hand() else {
                continue;
            };
            let saber = self.sabers[hand.index()];
            let Some(prev) = saber.previous else {
                continue;
            };
            if self.config.broadphase {
                if let Some(bounds) = &sweeps[hand.index()] {
                    if !may_reach(bounds, pose.position) {
                        continue;
                    }
                }
            }

            let swing = Swing {
                velocity: velocities[hand.index()],
                recent_velocity: self.swings[hand.index()].mean(),
                any_direction: object.any_dir,
            };
            if let Some(result) = self.detector.cut(&pose, &prev, &saber.current, &swing) {
                self.active.remove(index, scene);
                debug!(
                    index = index.0,
                    ?hand,
                    time,
                    accuracy = result.accuracy,
                    speed = result.speed,
                    "block cut"
                );
                let event = CutEvent {
                    object: index,
                    hand,
                    time,
                    result,
                };
                self.cuts.push(event.clone());
                report.cuts.push(event);
            }
        }

        for saber in &mut self.sabers {
            saber.previous = Some(saber.current);
        }

        trace!(
            time,
            active = self.active.len(),
            admitted = report.admitted.len(),
            evicted = report.evicted.len(),
            cuts = report.cuts.len(),
            "physics tick"
        );
        Ok(report)
    }

    /// Terminate the session with `err`, settling the completion future.
    fn fail(&mut self, err: SessionError) -> SessionError {
        error!(error = %err, time = self.clock.time(), "session failed");
        self.clock.set_playing(false);
        self.completer.resolve(Err(err.clone()));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{BlockStyle, NullScene, RenderHandle};
    use crate::time_source::VirtualAudio;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct TrackingScene {
        next: u64,
        live: BTreeSet<RenderHandle>,
        styles: Vec<BlockStyle>,
        poses: Vec<(RenderHandle, Pose)>,
        double_released: usize,
    }

    impl Scene for TrackingScene {
        fn spawn_block(&mut self, _hand: Hand, style: BlockStyle, _pose: &Pose) -> RenderHandle {
            self.next += 1;
            self.live.insert(RenderHandle(self.next));
            self.styles.push(style);
            RenderHandle(self.next)
        }

        fn move_object(&mut self, handle: RenderHandle, pose: &Pose) {
            self.poses.push((handle, *pose));
        }

        fn release(&mut self, handle: RenderHandle) {
            if !self.live.remove(&handle) {
                self.double_released += 1;
            }
        }
    }

    fn session(objects: Vec<LevelObject>, config: SessionConfig) -> LevelSession {
        LevelSession::new(Arc::new(LevelDifficulty::new(objects)), config).unwrap()
    }

    fn idle_player() -> PlayerPose {
        PlayerPose {
            headset: Pose::at(DVec3::new(0.0, 1.7, 0.0)),
            controllers: [
                Pose::at(DVec3::new(-3.0, 1.0, 0.0)),
                Pose::at(DVec3::new(3.0, 1.0, 0.0)),
            ],
        }
    }

    fn tick(
        s: &mut LevelSession,
        dt: f64,
        player: &PlayerPose,
        scene: &mut dyn Scene,
        audio: &mut VirtualAudio,
    ) -> Result<TickReport, SessionError> {
        audio.advance(dt);
        let mode = s.update_time(dt, audio);
        let mut report = s.update_physics(player, scene, audio)?;
        report.mode = mode;
        Ok(report)
    }

    #[test]
    fn block_pose_places_and_rotates() {
        let object = LevelObject::block(Hand::Left, 0.0, 0.5, -0.25, 90.0);
        let headset = Pose::at(DVec3::new(0.0, 1.7, 0.25));
        let pose = block_pose(&object, -2.0, &headset, 1.7);
        assert_eq!(pose.position, DVec3::new(0.5, 1.45, -3.25));
        let up = pose.rotation * DVec3::Y;
        assert!((up - DVec3::NEG_X).length() < 1e-12);
    }

    #[test]
    fn uncut_block_is_evicted_behind_player() {
        // At 60 m/s a 0.15 s tick moves a block 9 m, further than the
        // despawn distance itself.
        for speed in [1.0, 5.0, 23.0, 60.0] {
            let difficulty = LevelDifficulty {
                speed: Some(speed),
                ..LevelDifficulty::new(vec![LevelObject::block(Hand::Left, 1000.0, 0.0, 0.0, 0.0)])
            };
            let mut s = LevelSession::new(
                Arc::new(difficulty),
                SessionConfig { start_time: 0.0, ..Default::default() },
            )
            .unwrap();
            let mut scene = TrackingScene::default();
            let mut audio = VirtualAudio::new(60.0);
            let player = idle_player();

            let mut evicted = Vec::new();
            for _ in 0..60 {
                let report = tick(&mut s, 0.15, &player, &mut scene, &mut audio).unwrap();
                for index in &report.evicted {
                    let object = &s.difficulty().objects[index.0];
                    let distance = crate::lifecycle::forward_distance(report.time, object.time, speed);
                    assert!(
                        distance > crate::lifecycle::REAR_DESPAWN_DISTANCE,
                        "evicted at {distance} m with speed {speed}"
                    );
                }
                evicted.extend(report.evicted);
            }
            assert_eq!(evicted, vec![ObjectIndex(0)], "speed {speed}");
            assert!(s.cut_history().is_empty());
            assert!(scene.live.is_empty());
            assert_eq!(scene.double_released, 0);
            assert_eq!(s.evicted_count(), 1);
        }
    }

    #[test]
    fn dot_blocks_use_dot_style() {
        let mut s = session(
            vec![
                LevelObject::block(Hand::Left, 0.0, 0.0, 0.0, 0.0).with_any_dir(),
                LevelObject::block(Hand::Right, 0.0, 0.0, 0.0, 0.0),
            ],
            SessionConfig { start_time: 0.0, ..Default::default() },
        );
        let mut scene = TrackingScene::default();
        let mut audio = VirtualAudio::new(60.0);
        tick(&mut s, 0.0, &idle_player(), &mut scene, &mut audio).unwrap();
        assert_eq!(scene.styles, vec![BlockStyle::Dot, BlockStyle::Arrow]);
    }

    #[test]
    fn downward_swing_cuts_block() {
        // Block arrives at t = 1.0; at t = 1.0 its centre is at z = -1.5.
        let mut s = session(
            vec![LevelObject::block(Hand::Right, 1000.0, 0.0, 0.0, 0.0)],
            SessionConfig { start_time: 0.9, ..Default::default() },
        );
        let mut scene = TrackingScene::default();
        let mut audio = VirtualAudio::new(60.0);

        let mut player = idle_player();
        player.headset = Pose::IDENTITY;
        // Blade pointing forward, raised above the block.
        player.controllers[1] = Pose::at(DVec3::new(0.0, 2.5, 0.0));
        tick(&mut s, 0.05, &player, &mut scene, &mut audio).unwrap();
        assert_eq!(s.active().len(), 1);

        // Swing down through it.
        player.controllers[1] = Pose::at(DVec3::new(0.0, 0.9, 0.0));
        let report = tick(&mut s, 0.05, &player, &mut scene, &mut audio).unwrap();
        assert_eq!(report.cuts.len(), 1);
        assert_eq!(report.cuts[0].object, ObjectIndex(0));
        assert_eq!(report.cuts[0].hand, Hand::Right);
        assert!(s.active().is_empty());
        assert!(scene.live.is_empty());
        assert_eq!(s.cut_history().len(), 1);
    }

    /// Two ticks of the right saber from `from` to `to` against a right block
    /// centred at (0, 1.7, -1.5) on the second tick.
    fn right_sweep(config: SessionConfig, from: DVec3, to: DVec3) -> Vec<CutEvent> {
        let mut s = session(
            vec![LevelObject::block(Hand::Right, 1000.0, 0.0, 0.0, 0.0)],
            SessionConfig { start_time: 0.9, ..config },
        );
        let mut scene = NullScene::default();
        let mut audio = VirtualAudio::new(60.0);
        let mut player = idle_player();
        player.headset = Pose::IDENTITY;
        player.controllers[1] = Pose::at(from);
        tick(&mut s, 0.05, &player, &mut scene, &mut audio).unwrap();
        player.controllers[1] = Pose::at(to);
        tick(&mut s, 0.05, &player, &mut scene, &mut audio).unwrap();
        s.cut_history().to_vec()
    }

    #[test]
    fn broadphase_agrees_on_a_swing_through_the_block() {
        let from = DVec3::new(0.0, 2.5, 0.0);
        let to = DVec3::new(0.0, 0.9, 0.0);
        let off = right_sweep(SessionConfig::default(), from, to);
        let on = right_sweep(SessionConfig { broadphase: true, ..Default::default() }, from, to);
        assert_eq!(off.len(), 1);
        assert_eq!(on, off);
    }

    #[test]
    fn default_session_keeps_extended_slice_line_cuts() {
        // The blade stays at least 2 m above the block's top face (y = 2.2),
        // but the slice line extrapolated down to the face crosses its front
        // edge. The detector registers it; only the opt-in broadphase drops it.
        let from = DVec3::new(0.0, 4.2, 0.0);
        let to = DVec3::new(0.0, 3.7, 0.0);
        assert!(!SessionConfig::default().broadphase);

        let cuts = right_sweep(SessionConfig::default(), from, to);
        assert_eq!(cuts.len(), 1);
        let detector = CutDetector::new(SaberDimensions::default(), Aabb::cube(0.5));
        let block = Pose::at(DVec3::new(0.0, 1.7, -1.5));
        let shifted_prev = Pose::at(from + DVec3::new(0.0, 0.0, 0.25));
        assert!(
            detector
                .detect(&block, &shifted_prev, &Pose::at(to), &mut saberline_collision::NoTrace)
                .is_some()
        );

        let filtered = right_sweep(SessionConfig { broadphase: true, ..Default::default() }, from, to);
        assert!(filtered.is_empty());
    }

    #[test]
    fn stationary_controller_has_no_speed() {
        // Block travel alone sweeps the blade through the block in its own
        // frame, but the controller never moved.
        let at = DVec3::new(0.0, 1.7, 0.0);
        let cuts = right_sweep(SessionConfig::default(), at, at);
        assert_eq!(cuts.len(), 1);
        assert!((cuts[0].time - 1.0).abs() < 1e-9);
        assert!(cuts[0].result.speed.abs() < 1e-9, "speed {}", cuts[0].result.speed);
        assert!(cuts[0].result.strength.abs() < 1e-9);
    }

    #[test]
    fn moving_controller_speed_ignores_block_travel() {
        let cuts = right_sweep(
            SessionConfig::default(),
            DVec3::new(0.0, 2.5, 0.0),
            DVec3::new(0.0, 0.9, 0.0),
        );
        assert_eq!(cuts.len(), 1);
        // 1.6 m in 0.05 s.
        assert!((cuts[0].result.speed - 32.0).abs() < 1e-6, "speed {}", cuts[0].result.speed);
    }

    #[test]
    fn wrong_hand_does_not_cut() {
        let mut s = session(
            vec![LevelObject::block(Hand::Left, 1000.0, 0.0, 0.0, 0.0)],
            SessionConfig { start_time: 0.9, ..Default::default() },
        );
        let mut scene = NullScene::default();
        let mut audio = VirtualAudio::new(60.0);
        let mut player = idle_player();
        player.headset = Pose::IDENTITY;
        player.controllers[1] = Pose::at(DVec3::new(0.0, 2.5, 0.0));
        tick(&mut s, 0.05, &player, &mut scene, &mut audio).unwrap();
        player.controllers[1] = Pose::at(DVec3::new(0.0, 0.9, 0.0));
        let report = tick(&mut s, 0.05, &player, &mut scene, &mut audio).unwrap();
        assert!(report.cuts.is_empty());
        assert_eq!(s.active().len(), 1);
    }

    #[test]
    fn custom_object_fails_session() {
        let mut s = session(vec![LevelObject::custom(0.0)], SessionConfig::default());
        let completion = s.completion();
        let mut scene = NullScene::default();
        let mut audio = VirtualAudio::new(60.0);
        let err = tick(&mut s, 0.1, &idle_player(), &mut scene, &mut audio).unwrap_err();
        assert!(matches!(err, SessionError::UnrenderableObject { .. }));
        assert!(!s.is_playing());
        assert_eq!(pollster::block_on(completion), Err(err));
    }

    #[test]
    fn refused_audio_fails_completion() {
        let mut s = session(vec![], SessionConfig { start_time: 0.0, ..Default::default() });
        let completion = s.completion();
        let mut scene = NullScene::default();
        let mut audio = VirtualAudio::refusing(10.0, "autoplay blocked");
        let err = tick(&mut s, 0.0, &idle_player(), &mut scene, &mut audio).unwrap_err();
        assert!(matches!(err, SessionError::TimeSource(_)));
        assert_eq!(completion.outcome(), Some(Err(err)));
    }

    #[test]
    fn track_end_resolves_completion() {
        let mut s = session(vec![], SessionConfig::default());
        let completion = s.completion();
        let mut scene = NullScene::default();
        let mut audio = VirtualAudio::new(0.5);
        let player = idle_player();

        let mut ticks = 0;
        while !completion.is_resolved() {
            tick(&mut s, 0.1, &player, &mut scene, &mut audio).unwrap();
            ticks += 1;
            assert!(ticks < 100, "session never completed");
        }
        assert!(!s.is_playing());
        assert_eq!(pollster::block_on(completion), Ok(()));

        let frozen = s.time();
        tick(&mut s, 0.1, &player, &mut scene, &mut audio).unwrap();
        assert_eq!(s.time(), frozen);
    }

    #[test]
    fn stop_pauses_source_and_freezes_time() {
        let mut s = session(vec![], SessionConfig { start_time: 0.0, ..Default::default() });
        let mut scene = NullScene::default();
        let mut audio = VirtualAudio::new(10.0);
        let player = idle_player();
        tick(&mut s, 0.1, &player, &mut scene, &mut audio).unwrap();
        assert!(!audio.is_paused());

        s.set_stopped(true, &mut audio);
        assert!(audio.is_paused());
        let time = s.time();
        let report = tick(&mut s, 0.1, &player, &mut scene, &mut audio).unwrap();
        assert_eq!(report.mode, ClockMode::Stopped);
        assert_eq!(s.time(), time);

        s.set_stopped(false, &mut audio);
        tick(&mut s, 0.1, &player, &mut scene, &mut audio).unwrap();
        assert!(!audio.is_paused());
        assert!(s.time() > time);
    }

    #[test]
    fn release_all_frees_handles() {
        let mut s = session(
            vec![LevelObject::block(Hand::Left, 0.0, 0.0, 0.0, 0.0)],
            SessionConfig { start_time: 0.0, ..Default::default() },
        );
        let mut scene = TrackingScene::default();
        let mut audio = VirtualAudio::new(10.0);
        tick(&mut s, 0.0, &idle_player(), &mut scene, &mut audio).unwrap();
        assert_eq!(scene.live.len(), 1);
        s.release_all(&mut scene);
        assert!(scene.live.is_empty());
    }
}
