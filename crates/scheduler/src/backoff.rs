use std::time::Duration;

/// Bounded exponential wait between idle scheduling cycles.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// `max` is raised to `min` if it is smaller.
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self { min, max, current: min }
    }

    /// The wait the next idle cycle will use.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Back to the minimum after a cycle that made progress.
    pub fn reset(&mut self) {
        self.current = self.min;
    }

    /// Wait once, then double the next wait up to the maximum.
    ///
    /// A zero wait yields to the runtime instead of sleeping.
    pub async fn wait(&mut self) {
        if self.current.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        tokio::time::sleep(self.current).await;
        self.current = (self.current * 2).min(self.max);
    }
}
