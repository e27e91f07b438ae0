use std::time::Duration;

/// Rolling window of per-tick wall-clock costs.
#[derive(Debug, Clone)]
pub struct TickTimer {
    history: Vec<Duration>,
    capacity: usize,
    index: usize,
    filled: bool,
    total_ticks: u64,
}

impl TickTimer {
    /// `capacity` is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: vec![Duration::ZERO; capacity],
            capacity,
            index: 0,
            filled: false,
            total_ticks: 0,
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.history[self.index] = elapsed;
        self.index = (self.index + 1) % self.capacity;
        if self.index == 0 {
            self.filled = true;
        }
        self.total_ticks += 1;
    }

    fn window(&self) -> &[Duration] {
        &self.history[..self.count()]
    }

    pub fn average(&self) -> Duration {
        let window = self.window();
        if window.is_empty() {
            return Duration::ZERO;
        }
        window.iter().sum::<Duration>() / window.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.window().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.window().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    /// Samples currently in the window.
    pub fn count(&self) -> usize {
        if self.filled { self.capacity } else { self.index }
    }

    /// Ticks recorded since creation, including those rolled out of the window.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(120)
    }
}
