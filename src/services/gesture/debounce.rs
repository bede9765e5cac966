use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

/// Minimum interval between two passes
#[derive(Debug)]
pub struct DebounceGate {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Records `now` and returns true unless the previous pass is less than
    /// one window ago.
    pub fn try_pass(&self, now: Instant) -> bool {
        let mut last = self.last.lock();
        if let Some(previous) = *last {
            if now.saturating_duration_since(previous) < self.window {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_second_pass_inside_window_suppressed() {
        let gate = DebounceGate::new(Duration::from_millis(500));
        let start = Instant::now();

        assert!(gate.try_pass(start));
        assert!(!gate.try_pass(start + Duration::from_millis(100)));
        assert!(!gate.try_pass(start + Duration::from_millis(499)));
        assert!(gate.try_pass(start + Duration::from_millis(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppressed_attempt_does_not_extend_window() {
        let gate = DebounceGate::new(Duration::from_millis(500));
        let start = Instant::now();

        assert!(gate.try_pass(start));
        assert!(!gate.try_pass(start + Duration::from_millis(400)));
        assert!(gate.try_pass(start + Duration::from_millis(600)));
    }
}
