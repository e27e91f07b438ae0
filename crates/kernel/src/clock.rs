use tracing::{debug, info};

use crate::error::TimeSourceError;
use crate::time_source::TimeSource;

/// How the clock advanced on a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockMode {
    /// Time was read from the external source.
    External,
    /// Time was integrated from the frame delta.
    FreeRunning,
    /// Playback is inactive; time did not move.
    #[default]
    Stopped,
}

/// Simulation time in seconds of track position.
///
/// Negative values are pre-roll before the track starts.
#[derive(Debug, Clone)]
pub struct LevelClock {
    time: f64,
    prev_time: f64,
    speed: f64,
    volume: f64,
    playing: bool,
    mode: ClockMode,
}

impl LevelClock {
    pub fn new(start_time: f64, speed: f64, volume: f64, playing: bool) -> Self {
        Self {
            time: start_time,
            prev_time: start_time,
            speed,
            volume,
            playing,
            mode: ClockMode::Stopped,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Time at the start of the current tick.
    pub fn prev_time(&self) -> f64 {
        self.prev_time
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    fn in_track(&self, duration: f64) -> bool {
        self.time >= 0.0 && self.time < duration
    }

    /// Advance by one tick.
    pub fn update_time(&mut self, time_delta: f64, source: &dyn TimeSource) -> ClockMode {
        self.prev_time = self.time;
        let mode = if !self.playing {
            ClockMode::Stopped
        } else if self.in_track(source.duration()) && !source.is_paused() {
            self.time = source.current_time();
            ClockMode::External
        } else {
            self.time += time_delta * self.speed;
            ClockMode::FreeRunning
        };
        if mode != self.mode {
            debug!(from = ?self.mode, to = ?mode, time = self.time, "clock mode changed");
            self.mode = mode;
        }
        mode
    }

    /// Hand timekeeping to the source once the clock is inside the track and
    /// the source is idle. Returns whether the source was started.
    pub fn sync_source(&self, source: &mut dyn TimeSource) -> Result<bool, TimeSourceError> {
        if !self.playing || !self.in_track(source.duration()) || !source.is_paused() {
            return Ok(false);
        }
        source.set_current_time(self.time);
        source.set_volume(self.volume);
        source.set_playback_rate(self.speed);
        source.play()?;
        info!(time = self.time, speed = self.speed, "external clock started");
        Ok(true)
    }

    /// Consume the source's end-of-track signal. Playback stops when it fires.
    pub fn poll_end(&mut self, source: &mut dyn TimeSource) -> bool {
        if source.take_ended() {
            self.playing = false;
            true
        } else {
            false
        }
    }
}
