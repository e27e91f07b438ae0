use std::sync::Arc;
use std::time::{Duration, Instant};

use saberline_common::PlayerPose;
use saberline_input::PoseSource;
use saberline_kernel::{
    CutEvent, FrameContext, LevelDifficulty, LivePlayback, Playable, Recording, ReplayPlayback,
    SessionConfig, SessionError, VirtualAudio,
};
use saberline_render::DebugTextScene;
use thiserror::Error;
use tracing::{debug, info, info_span};

use crate::timer::TickTimer;

/// Seconds of track left after the last object.
const TRACK_TAIL: f64 = 2.0;

/// Fixed-step settings for a headless run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    /// Wall-clock seconds per tick, fed to both the clock and the audio.
    pub tick_seconds: f64,
    /// Length of the virtual track in seconds.
    pub track_duration: f64,
    /// Give up after this many ticks.
    pub max_ticks: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0 / 90.0,
            track_duration: 10.0,
            max_ticks: 100_000,
        }
    }
}

impl RunConfig {
    /// A track that ends shortly after the difficulty's last object.
    pub fn for_difficulty(difficulty: &LevelDifficulty) -> Self {
        let last = difficulty.objects.last().map_or(0.0, |o| o.time_seconds());
        Self {
            track_duration: last.max(0.0) + TRACK_TAIL,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("session failed: {0}")]
    Session(#[from] SessionError),
    #[error("session still running after {ticks} ticks")]
    TickLimit { ticks: u64 },
}

/// Everything a headless run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub cuts: Vec<CutEvent>,
    pub evicted: usize,
    pub ticks: u64,
    pub final_time: f64,
    /// Recorded input. `None` for replays.
    pub recording: Option<Recording>,
    pub average_tick: Duration,
    pub max_tick: Duration,
    pub blocks_spawned: usize,
    /// Handles still held by the scene after teardown; zero unless the
    /// kernel leaked one.
    pub blocks_leaked: usize,
    pub double_releases: usize,
}

/// Runs sessions to completion without a window or real audio.
pub struct HeadlessRunner {
    config: RunConfig,
}

impl HeadlessRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Play `difficulty` with input from `source`, recording every tick.
    pub fn run_live(
        &self,
        difficulty: Arc<LevelDifficulty>,
        session: SessionConfig,
        source: &mut dyn PoseSource,
    ) -> Result<RunOutcome, RunError> {
        let _span = info_span!("headless", driver = "live").entered();
        let mut live = LivePlayback::new(difficulty, session)?;
        let mut outcome = self.drive(&mut live, |p| source.sample(p.session().time()))?;
        outcome.recording = Some(live.finish_recording());
        Ok(outcome)
    }

    /// Replay `recording` against `difficulty`.
    pub fn run_replay(
        &self,
        difficulty: Arc<LevelDifficulty>,
        session: SessionConfig,
        recording: Recording,
    ) -> Result<RunOutcome, RunError> {
        let _span = info_span!("headless", driver = "replay").entered();
        let mut replay = ReplayPlayback::new(difficulty, session, recording)?;
        self.drive(&mut replay, |_| PlayerPose::default())
    }

    fn drive<P, F>(&self, playable: &mut P, mut input: F) -> Result<RunOutcome, RunError>
    where
        P: Playable,
        F: FnMut(&P) -> PlayerPose,
    {
        let mut audio = VirtualAudio::new(self.config.track_duration);
        let mut scene = DebugTextScene::new();
        let mut timer = TickTimer::default();
        let completion = playable.session().completion();

        let mut ticks = 0u64;
        while !completion.is_resolved() {
            if ticks >= self.config.max_ticks {
                playable.session_mut().release_all(&mut scene);
                return Err(RunError::TickLimit { ticks });
            }
            audio.advance(self.config.tick_seconds);
            let player = input(&*playable);
            let mut ctx = FrameContext {
                time_delta: self.config.tick_seconds,
                player,
                scene: &mut scene,
                audio: &mut audio,
            };
            let started = Instant::now();
            let result = playable.tick(&mut ctx);
            timer.record(started.elapsed());
            ticks += 1;
            match result {
                Ok(report) if !report.cuts.is_empty() => {
                    debug!(time = report.time, cuts = report.cuts.len(), "tick cut blocks");
                }
                Ok(_) => {}
                Err(err) => {
                    playable.session_mut().release_all(&mut scene);
                    return Err(err.into());
                }
            }
        }
        pollster::block_on(completion)?;

        playable.session_mut().release_all(&mut scene);
        let session = playable.session();
        info!(
            ticks,
            cuts = session.cut_history().len(),
            evicted = session.evicted_count(),
            average_tick_us = timer.average().as_micros() as u64,
            "headless run finished"
        );
        Ok(RunOutcome {
            cuts: session.cut_history().to_vec(),
            evicted: session.evicted_count(),
            ticks,
            final_time: session.time(),
            recording: None,
            average_tick: timer.average(),
            max_tick: timer.max(),
            blocks_spawned: scene.spawned_count(),
            blocks_leaked: scene.live_count(),
            double_releases: scene.double_releases(),
        })
    }
}
