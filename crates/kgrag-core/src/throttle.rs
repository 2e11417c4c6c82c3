//! Fixed pause between sequential provider calls.

use std::time::Duration;

/// Sleeps a fixed delay before every call except the first.
///
/// Hosted free tiers allow a handful of requests per minute; local models
/// run with a zero delay.
#[derive(Debug, Clone)]
pub struct Throttle {
    delay: Duration,
    started: bool,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until the next call may be issued.
    pub async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            tracing::debug!(delay_ms = self.delay.as_millis() as u64, "Throttling");
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_not_delayed() {
        let mut throttle = Throttle::from_millis(1000);
        let start = tokio::time::Instant::now();

        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_zero_delay() {
        let mut throttle = Throttle::none();
        throttle.wait().await;
        throttle.wait().await;
        assert!(throttle.delay().is_zero());
    }
}
