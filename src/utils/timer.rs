use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};

/// A single one-shot timer. Arming always cancels whatever was armed before,
/// so a slot never has more than one outstanding callback.
#[derive(Debug, Default)]
pub struct TimerSlot {
    handle: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once `delay` has elapsed. Returns the deadline.
    pub fn arm<F>(&mut self, delay: Duration, task: F) -> Instant
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let deadline = Instant::now() + delay;
        self.handle = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            task.await;
        }));
        self.deadline = Some(deadline);
        deadline
    }

    /// Cancel the pending callback. Returns true if one was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline = None;
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Forget the handle without aborting it. Called from inside the
    /// callback itself once it has fired.
    pub fn clear(&mut self) {
        self.handle = None;
        self.deadline = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Deadline passed but the callback may not have been polled yet.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_rearm_cancels_previous() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new();

        let first = fired.clone();
        slot.arm(Duration::from_millis(100), async move {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = fired.clone();
        slot.arm(Duration::from_millis(100), async move {
            second.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_callback() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new();

        let counter = fired.clone();
        slot.arm(Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(slot.is_armed());
        assert!(slot.cancel());
        assert!(!slot.cancel());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_due_after_deadline() {
        let mut slot = TimerSlot::new();
        let deadline = slot.arm(Duration::from_millis(50), async {});
        assert!(!slot.is_due(Instant::now()));
        assert!(slot.is_due(deadline));
    }
}
