use crate::config::GestureConfig;
use crate::{debug_if_enabled, trace_if_enabled};
use crate::events::{GestureAction, InputChannel, PointerEvent, PressPhase};
use crate::utils::TimerSlot;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::debug;

use super::debounce::DebounceGate;

/// One press/release pair on a channel
#[derive(Debug, Default)]
struct PressSession {
    press_time_ms: Option<u32>,
    long_press_fired: bool,
    long_press_timer: TimerSlot,
    /// Invalidates timer callbacks belonging to an earlier press
    generation: u64,
}

#[derive(Debug, Default)]
struct Sessions {
    channels: [PressSession; 2],
    shut_down: bool,
}

pub struct PressGestureClassifier {
    long_press: Duration,
    short_press_ms: u32,
    debounce: DebounceGate,
    sessions: Mutex<Sessions>,
    actions: mpsc::UnboundedSender<GestureAction>,
    this: Weak<PressGestureClassifier>,
}

impl PressGestureClassifier {
    pub fn new(config: &GestureConfig) -> (Arc<Self>, mpsc::UnboundedReceiver<GestureAction>) {
        let (actions, receiver) = mpsc::unbounded_channel();
        let short_press_ms = u32::try_from(config.short_press_ms).unwrap_or(u32::MAX);

        let classifier = Arc::new_cyclic(|this| Self {
            long_press: config.long_press(),
            short_press_ms,
            debounce: DebounceGate::new(config.debounce()),
            sessions: Mutex::new(Sessions::default()),
            actions,
            this: this.clone(),
        });
        (classifier, receiver)
    }

    /// Feed a raw event. Returns false for events left to propagate
    /// (non-primary buttons, or after shutdown).
    pub fn handle(&self, event: PointerEvent) -> bool {
        if !event.is_primary() {
            return false;
        }
        trace_if_enabled!("Indicator input: {}", event);

        match event.phase {
            PressPhase::Press => self.on_press(event),
            PressPhase::Release => self.on_release(event),
        }
    }

    /// Cancel both channels' timers. Later events are ignored.
    pub fn shutdown(&self) {
        let mut sessions = self.sessions.lock();
        sessions.shut_down = true;
        for session in sessions.channels.iter_mut() {
            session.long_press_timer.cancel();
            session.press_time_ms = None;
            session.generation += 1;
        }
        debug!("Gesture classifier shut down");
    }

    fn on_press(&self, event: PointerEvent) -> bool {
        {
            let mut sessions = self.sessions.lock();
            if sessions.shut_down {
                return false;
            }

            let session = &mut sessions.channels[event.channel.index()];
            session.generation += 1;
            session.press_time_ms = Some(event.time_ms);
            session.long_press_fired = false;

            let generation = session.generation;
            let channel = event.channel;
            let this = self.this.clone();
            session.long_press_timer.arm(self.long_press, async move {
                if let Some(classifier) = this.upgrade() {
                    classifier.on_long_press(channel, generation);
                }
            });
        }

        if event.channel == InputChannel::Mouse {
            self.emit(GestureAction::CloseMenu);
        }
        true
    }

    fn on_long_press(&self, channel: InputChannel, generation: u64) {
        {
            let mut sessions = self.sessions.lock();
            let session = &mut sessions.channels[channel.index()];
            if session.generation != generation || session.long_press_fired {
                return;
            }
            session.long_press_fired = true;
            session.long_press_timer.clear();
        }
        debug!("Long press on {}", channel);
        self.emit(GestureAction::OpenMenu);
    }

    fn on_release(&self, event: PointerEvent) -> bool {
        let (fired_now, long_press_fired, duration_ms) = {
            let mut sessions = self.sessions.lock();
            if sessions.shut_down {
                return false;
            }

            let session = &mut sessions.channels[event.channel.index()];
            let Some(pressed_at) = session.press_time_ms.take() else {
                debug!("{} release without press", event.channel);
                return true;
            };

            // An expired timer that has not been polled yet still wins
            let fired_now = !session.long_press_fired && session.long_press_timer.is_due(Instant::now());
            if fired_now {
                session.long_press_fired = true;
            }
            session.long_press_timer.cancel();
            session.generation += 1;

            (fired_now, session.long_press_fired, event.time_ms.wrapping_sub(pressed_at))
        };

        if fired_now {
            self.emit(GestureAction::OpenMenu);
        }
        if long_press_fired {
            return true;
        }

        if duration_ms < self.short_press_ms {
            if self.debounce.try_pass(Instant::now()) {
                self.emit(GestureAction::Toggle);
            } else {
                debug!("Toggle suppressed by debounce");
            }
        } else if event.channel == InputChannel::Mouse {
            self.emit(GestureAction::ToggleMenu);
        }
        true
    }

    fn emit(&self, action: GestureAction) {
        debug_if_enabled!("Gesture action: {:?}", action);
        let _ = self.actions.send(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::PRIMARY_BUTTON;

    fn classifier() -> (Arc<PressGestureClassifier>, mpsc::UnboundedReceiver<GestureAction>) {
        PressGestureClassifier::new(&Config::default().gesture)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<GestureAction>) -> Vec<GestureAction> {
        let mut actions = Vec::new();
        while let Ok(action) = rx.try_recv() {
            actions.push(action);
        }
        actions
    }

    fn press(channel: InputChannel, time_ms: u32) -> PointerEvent {
        match channel {
            InputChannel::Mouse => PointerEvent::mouse(PressPhase::Press, PRIMARY_BUTTON, time_ms),
            InputChannel::Touch => PointerEvent::touch(PressPhase::Press, time_ms),
        }
    }

    fn release(channel: InputChannel, time_ms: u32) -> PointerEvent {
        match channel {
            InputChannel::Mouse => PointerEvent::mouse(PressPhase::Release, PRIMARY_BUTTON, time_ms),
            InputChannel::Touch => PointerEvent::touch(PressPhase::Release, time_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_tap_toggles() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Mouse, 0));
        tokio::time::sleep(Duration::from_millis(300)).await;
        classifier.handle(release(InputChannel::Mouse, 300));
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(drain(&mut rx), vec![GestureAction::CloseMenu, GestureAction::Toggle]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_opens_menu_once() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Touch, 0));
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(drain(&mut rx).is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(drain(&mut rx), vec![GestureAction::OpenMenu]);

        tokio::time::sleep(Duration::from_millis(199)).await;
        classifier.handle(release(InputChannel::Touch, 1200));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mouse_long_press_release_does_not_close_menu() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Mouse, 0));
        tokio::time::sleep(Duration::from_millis(1200)).await;
        classifier.handle(release(InputChannel::Mouse, 1200));

        assert_eq!(drain(&mut rx), vec![GestureAction::CloseMenu, GestureAction::OpenMenu]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggles_debounced_across_channels() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Mouse, 0));
        classifier.handle(release(InputChannel::Mouse, 50));
        tokio::time::sleep(Duration::from_millis(100)).await;
        classifier.handle(press(InputChannel::Touch, 100));
        classifier.handle(release(InputChannel::Touch, 150));
        assert_eq!(drain(&mut rx), vec![GestureAction::CloseMenu, GestureAction::Toggle]);

        tokio::time::sleep(Duration::from_millis(500)).await;
        classifier.handle(press(InputChannel::Touch, 600));
        classifier.handle(release(InputChannel::Touch, 650));
        assert_eq!(drain(&mut rx), vec![GestureAction::Toggle]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_release_mouse_toggles_menu_touch_does_nothing() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Mouse, 0));
        tokio::time::sleep(Duration::from_millis(700)).await;
        classifier.handle(release(InputChannel::Mouse, 700));
        assert_eq!(drain(&mut rx), vec![GestureAction::CloseMenu, GestureAction::ToggleMenu]);

        classifier.handle(press(InputChannel::Touch, 1000));
        tokio::time::sleep(Duration::from_millis(700)).await;
        classifier.handle(release(InputChannel::Touch, 1700));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_mouse_press_closes_menu() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Touch, 0));
        assert!(drain(&mut rx).is_empty());

        classifier.handle(press(InputChannel::Mouse, 10));
        assert_eq!(drain(&mut rx), vec![GestureAction::CloseMenu]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_secondary_button_propagates() {
        let (classifier, mut rx) = classifier();

        assert!(!classifier.handle(PointerEvent::mouse(PressPhase::Press, 3, 0)));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!classifier.handle(PointerEvent::mouse(PressPhase::Release, 3, 2000)));

        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_press_supersedes_unreleased_one() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Mouse, 0));
        tokio::time::sleep(Duration::from_millis(600)).await;
        classifier.handle(press(InputChannel::Mouse, 600));

        // The first press would have fired at 1000ms
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(drain(&mut rx), vec![GestureAction::CloseMenu, GestureAction::CloseMenu]);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(drain(&mut rx), vec![GestureAction::OpenMenu]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channels_are_independent() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Mouse, 0));
        classifier.handle(press(InputChannel::Touch, 10));
        classifier.handle(release(InputChannel::Touch, 100));
        assert_eq!(drain(&mut rx), vec![GestureAction::CloseMenu, GestureAction::Toggle]);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(drain(&mut rx), vec![GestureAction::OpenMenu]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_and_release_in_same_tick() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Mouse, 0));
        tokio::time::advance(Duration::from_millis(1000)).await;
        classifier.handle(release(InputChannel::Mouse, 1000));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(drain(&mut rx), vec![GestureAction::CloseMenu, GestureAction::OpenMenu]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_armed_timer() {
        let (classifier, mut rx) = classifier();

        classifier.handle(press(InputChannel::Touch, 0));
        classifier.shutdown();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(drain(&mut rx).is_empty());
        assert!(!classifier.handle(release(InputChannel::Touch, 2000)));
    }
}
