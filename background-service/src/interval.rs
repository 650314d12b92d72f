use std::time::Duration;

/// Chooses the delay before the next automated post.
pub trait IntervalSource: Send + Sync {
    fn next_interval(&self, min: Duration, max: Duration) -> Duration;
}

/// Uniform over `[min, max]` at millisecond resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInterval;

impl IntervalSource for RandomInterval {
    fn next_interval(&self, min: Duration, max: Duration) -> Duration {
        let min_ms = min.as_millis() as u64;
        let max_ms = (max.as_millis() as u64).max(min_ms);
        Duration::from_millis(fastrand::u64(min_ms..=max_ms))
    }
}

/// Always the same delay, for deterministic schedules.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval(pub Duration);

impl IntervalSource for FixedInterval {
    fn next_interval(&self, _min: Duration, _max: Duration) -> Duration {
        self.0
    }
}
