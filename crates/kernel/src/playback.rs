use std::sync::Arc;

use saberline_common::{PlayerPose, Pose};
use tracing::trace_span;

use crate::error::SessionError;
use crate::level::LevelDifficulty;
use crate::recording::{Recording, RecordingCursor, RecordingFrame, RecordingWriter};
use crate::scene::Scene;
use crate::session::{LevelSession, SessionConfig, TickReport};
use crate::time_source::TimeSource;

/// Everything a driver may touch during one tick.
pub struct FrameContext<'a> {
    /// Wall-clock seconds since the previous tick.
    pub time_delta: f64,
    /// Live tracking data. Replay ignores it.
    pub player: PlayerPose,
    pub scene: &'a mut dyn Scene,
    pub audio: &'a mut dyn TimeSource,
}

/// A driver that advances a [`LevelSession`] once per rendered frame.
pub trait Playable {
    fn tick(&mut self, ctx: &mut FrameContext<'_>) -> Result<TickReport, SessionError>;

    fn set_stopped(&mut self, stopped: bool, audio: &mut dyn TimeSource);

    fn session(&self) -> &LevelSession;

    fn session_mut(&mut self) -> &mut LevelSession;
}

/// Plays from live tracking input and records every tick.
pub struct LivePlayback {
    session: LevelSession,
    writer: RecordingWriter,
}

impl LivePlayback {
    pub fn new(difficulty: Arc<LevelDifficulty>, config: SessionConfig) -> Result<Self, SessionError> {
        Ok(Self {
            session: LevelSession::new(difficulty, config)?,
            writer: RecordingWriter::new(),
        })
    }

    pub fn frames_recorded(&self) -> usize {
        self.writer.frame_count()
    }

    /// Export everything recorded so far.
    pub fn finish_recording(&self) -> Recording {
        self.writer.finish()
    }
}

impl Playable for LivePlayback {
    fn tick(&mut self, ctx: &mut FrameContext<'_>) -> Result<TickReport, SessionError> {
        let _span = trace_span!("tick", driver = "live").entered();
        let mode = self.session.update_time(ctx.time_delta, &*ctx.audio);
        let mut report = self
            .session
            .update_physics(&ctx.player, &mut *ctx.scene, &mut *ctx.audio)?;
        report.mode = mode;
        self.writer.push(&RecordingFrame {
            time: self.session.time(),
            player: ctx.player,
        });
        Ok(report)
    }

    fn set_stopped(&mut self, stopped: bool, audio: &mut dyn TimeSource) {
        self.session.set_stopped(stopped, audio);
    }

    fn session(&self) -> &LevelSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut LevelSession {
        &mut self.session
    }
}

/// Drives the sabers and headset from a recording instead of live input.
pub struct ReplayPlayback {
    session: LevelSession,
    recording: Recording,
    cursor: RecordingCursor,
    player: PlayerPose,
}

impl ReplayPlayback {
    pub fn new(
        difficulty: Arc<LevelDifficulty>,
        config: SessionConfig,
        recording: Recording,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            session: LevelSession::new(difficulty, config)?,
            recording,
            cursor: RecordingCursor::new(),
            player: PlayerPose::default(),
        })
    }

    /// Headset pose decoded on the latest tick.
    pub fn headset(&self) -> &Pose {
        &self.player.headset
    }

    /// Full player pose decoded on the latest tick.
    pub fn player(&self) -> &PlayerPose {
        &self.player
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn cursor(&self) -> &RecordingCursor {
        &self.cursor
    }
}

impl Playable for ReplayPlayback {
    fn tick(&mut self, ctx: &mut FrameContext<'_>) -> Result<TickReport, SessionError> {
        let _span = trace_span!("tick", driver = "replay").entered();
        let mode = self.session.update_time(ctx.time_delta, &*ctx.audio);
        if self.session.is_playing() {
            if let Some(frame) = self.cursor.advance(&self.recording, self.session.time()) {
                self.player = frame.player;
            }
        }
        let mut report = self
            .session
            .update_physics(&self.player, &mut *ctx.scene, &mut *ctx.audio)?;
        report.mode = mode;
        Ok(report)
    }

    fn set_stopped(&mut self, stopped: bool, audio: &mut dyn TimeSource) {
        self.session.set_stopped(stopped, audio);
    }

    fn session(&self) -> &LevelSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut LevelSession {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LevelObject, ObjectIndex};
    use crate::scene::NullScene;
    use crate::time_source::VirtualAudio;
    use glam::DVec3;
    use saberline_common::Hand;

    const DT: f64 = 1.0 / 90.0;

    fn difficulty() -> Arc<LevelDifficulty> {
        Arc::new(LevelDifficulty::new(vec![
            LevelObject::block(Hand::Right, 1000.0, 0.0, 0.0, 0.0),
            LevelObject::block(Hand::Left, 1500.0, 0.0, 0.0, 0.0),
            LevelObject::block(Hand::Right, 2000.0, 0.0, 0.0, 0.0),
        ]))
    }

    /// Right hand swings down through the centre lane around t = 1.0,
    /// left hand never leaves its idle spot.
    fn player_at(time: f64) -> PlayerPose {
        let swing = ((time - 0.97) / 0.06).clamp(0.0, 1.0);
        PlayerPose {
            headset: Pose::at(DVec3::new(0.0, 0.0, 0.0)),
            controllers: [
                Pose::at(DVec3::new(-3.0, 1.0, 0.0)),
                Pose::at(DVec3::new(0.0, 2.5 - 1.6 * swing, 0.0)),
            ],
        }
    }

    fn cut_objects<P: Playable>(
        playable: &mut P,
        audio: &mut VirtualAudio,
        live_input: bool,
        ticks: usize,
    ) -> Vec<(ObjectIndex, f64)> {
        let mut scene = NullScene::default();
        let mut cuts = Vec::new();
        for _ in 0..ticks {
            audio.advance(DT);
            let player = if live_input {
                player_at(playable.session().time())
            } else {
                PlayerPose::default()
            };
            let mut ctx = FrameContext {
                time_delta: DT,
                player,
                scene: &mut scene,
                audio: &mut *audio,
            };
            let report = playable.tick(&mut ctx).unwrap();
            cuts.extend(report.cuts.iter().map(|c| (c.object, c.time)));
        }
        cuts
    }

    #[test]
    fn live_records_one_frame_per_tick() {
        let mut live = LivePlayback::new(difficulty(), SessionConfig::default()).unwrap();
        let mut audio = VirtualAudio::new(30.0);
        cut_objects(&mut live, &mut audio, true, 50);
        assert_eq!(live.frames_recorded(), 50);
        let rec = live.finish_recording();
        assert_eq!(rec.frame_count(), 50);
        assert_eq!(rec.frame(49).map(|f| f.time), Some(live.session().time()));
    }

    #[test]
    fn replay_reproduces_live_cuts() {
        let ticks = 300;
        let mut live = LivePlayback::new(difficulty(), SessionConfig::default()).unwrap();
        let live_cuts = cut_objects(&mut live, &mut VirtualAudio::new(30.0), true, ticks);
        assert!(!live_cuts.is_empty());

        let recording = live.finish_recording();
        let mut first = ReplayPlayback::new(difficulty(), SessionConfig::default(), recording.clone()).unwrap();
        let first_cuts = cut_objects(&mut first, &mut VirtualAudio::new(30.0), false, ticks);
        let mut second = ReplayPlayback::new(difficulty(), SessionConfig::default(), recording).unwrap();
        let second_cuts = cut_objects(&mut second, &mut VirtualAudio::new(30.0), false, ticks);

        assert_eq!(first_cuts, live_cuts);
        assert_eq!(second_cuts, first_cuts);
        assert_eq!(first.session().cut_history(), live.session().cut_history());
    }

    #[test]
    fn stopped_replay_holds_pose() {
        let mut live = LivePlayback::new(difficulty(), SessionConfig::default()).unwrap();
        cut_objects(&mut live, &mut VirtualAudio::new(30.0), true, 120);
        let recording = live.finish_recording();

        let mut replay = ReplayPlayback::new(difficulty(), SessionConfig::default(), recording).unwrap();
        let mut audio = VirtualAudio::new(30.0);
        cut_objects(&mut replay, &mut audio, false, 100);
        let held = *replay.player();
        let index = replay.cursor().frame_index();

        replay.set_stopped(true, &mut audio);
        cut_objects(&mut replay, &mut audio, false, 10);
        assert_eq!(*replay.player(), held);
        assert_eq!(replay.cursor().frame_index(), index);
    }
}
