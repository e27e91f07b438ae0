use crate::error::TimeSourceError;

/// External clock the level is synchronised to, normally the song's audio.
///
/// Times are in seconds of track position.
pub trait TimeSource {
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn is_paused(&self) -> bool;
    fn play(&mut self) -> Result<(), TimeSourceError>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f64);
    fn set_playback_rate(&mut self, rate: f64);
    /// True exactly once after the track reaches its end.
    fn take_ended(&mut self) -> bool;
}

/// Deterministic audio stand-in that only moves when [`VirtualAudio::advance`]
/// is called. Used for headless sessions and tests.
#[derive(Debug, Clone)]
pub struct VirtualAudio {
    duration: f64,
    position: f64,
    paused: bool,
    volume: f64,
    rate: f64,
    ended: bool,
    refusal: Option<String>,
}

impl VirtualAudio {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            position: 0.0,
            paused: true,
            volume: 1.0,
            rate: 1.0,
            ended: false,
            refusal: None,
        }
    }

    /// A source whose `play` always fails with `reason`.
    pub fn refusing(duration: f64, reason: impl Into<String>) -> Self {
        Self {
            refusal: Some(reason.into()),
            ..Self::new(duration)
        }
    }

    /// Let `wall_seconds` of real time pass. Reaching the end pauses the
    /// source and raises the ended flag.
    pub fn advance(&mut self, wall_seconds: f64) {
        if self.paused {
            return;
        }
        self.position += wall_seconds * self.rate;
        if self.position >= self.duration {
            self.position = self.duration;
            self.paused = true;
            self.ended = true;
        }
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn playback_rate(&self) -> f64 {
        self.rate
    }
}

impl TimeSource for VirtualAudio {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration);
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn play(&mut self) -> Result<(), TimeSourceError> {
        if let Some(reason) = &self.refusal {
            return Err(TimeSourceError::PlaybackRefused(reason.clone()));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn take_ended(&mut self) -> bool {
        std::mem::take(&mut self.ended)
    }
}
