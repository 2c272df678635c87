use std::time::{Duration, Instant};

/// Minimum spacing between two throttled progress callbacks.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Rate limiter for progress callbacks.
///
/// The first update always passes; after that an update passes only once
/// `interval` has elapsed since the last one that passed.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL)
    }
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Returns `true` (and records `now`) if an update may be emitted.
    pub fn ready_at(&mut self, now: Instant) -> bool {
        let ready = self
            .last
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if ready {
            self.last = Some(now);
        }
        ready
    }

    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }
}
