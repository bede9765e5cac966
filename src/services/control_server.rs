//! `org.onboard.Indicator`: the surface the shell-side shim talks to.
//!
//! The shim forwards panel input, edge drags, action mode changes and the
//! built-in keyboard's show/hide requests here, and mirrors the
//! `BuiltinKeyboard` signal back onto the real widget.

use crate::error::Result;
use crate::events::{ActionMode, GestureAction, InputChannel, PointerEvent, PressPhase};
use crate::services::gesture::PressGestureClassifier;
use crate::services::host_keyboard::{BuiltinKeyboard, SessionKeyboard};
use crate::services::indicator::{Indicator, IndicatorEvent, MenuItem};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zbus::object_server::{InterfaceRef, SignalEmitter};
use zbus::{fdo, interface, Connection};

pub const INDICATOR_BUS_NAME: &str = "org.onboard.Indicator";
pub const INDICATOR_PATH: &str = "/org/onboard/Indicator";

pub struct IndicatorControl {
    indicator: Arc<Indicator>,
    classifier: Arc<PressGestureClassifier>,
    host: Arc<SessionKeyboard>,
}

impl IndicatorControl {
    pub fn new(indicator: Arc<Indicator>, classifier: Arc<PressGestureClassifier>, host: Arc<SessionKeyboard>) -> Self {
        Self {
            indicator,
            classifier,
            host,
        }
    }
}

#[interface(name = "org.onboard.Indicator")]
impl IndicatorControl {
    async fn toggle(&self) {
        debug!("D-Bus: Toggle()");
        self.indicator.handle_action(GestureAction::Toggle).await;
    }

    fn show(&self) {
        self.indicator.manager().show();
    }

    fn hide(&self) {
        self.indicator.manager().hide();
    }

    async fn launch(&self) {
        self.indicator.manager().launch().await;
    }

    fn kill(&self) {
        let _ = self.indicator.manager().kill();
    }

    fn is_running(&self) -> bool {
        !self.indicator.manager().is_not_running()
    }

    fn show_any_keyboard(&self) {
        self.indicator.manager().show_any_keyboard();
    }

    /// Returns false when the show gesture is disabled
    fn edge_drag_activated(&self) -> bool {
        self.indicator.edge_drag_activated()
    }

    /// Returns true when the event was consumed by the indicator.
    fn pointer_event(&self, channel: &str, phase: &str, button: u32, time: u32) -> fdo::Result<bool> {
        let event = PointerEvent {
            channel: channel.parse::<InputChannel>()?,
            phase: phase.parse::<PressPhase>()?,
            button,
            time_ms: time,
        };
        Ok(self.classifier.handle(event))
    }

    async fn activate_menu_item(&self, item: &str) -> fdo::Result<()> {
        let item = item.parse::<MenuItem>()?;
        self.indicator.activate(item).await?;
        Ok(())
    }

    fn request_builtin_show(&self, monitor: i32) {
        debug!("D-Bus: RequestBuiltinShow({})", monitor);
        self.host.request_show_on(monitor);
    }

    fn request_builtin_hide(&self) {
        debug!("D-Bus: RequestBuiltinHide()");
        self.host.hide();
    }

    fn set_keyboard_requested(&self, requested: bool) {
        self.host.set_keyboard_requested(requested);
    }

    fn set_action_mode(&self, mode: &str) -> fdo::Result<()> {
        self.host.set_action_mode(mode.parse::<ActionMode>()?);
        Ok(())
    }

    fn set_show_gesture(&self, enabled: bool) -> fdo::Result<()> {
        self.indicator.set_show_gesture(enabled)?;
        Ok(())
    }

    #[zbus(property)]
    fn running(&self) -> bool {
        self.indicator.manager().snapshot().is_running
    }

    #[zbus(property)]
    fn exit_label(&self) -> String {
        self.indicator.exit_label()
    }

    #[zbus(property)]
    fn menu_open(&self) -> bool {
        self.indicator.menu_open()
    }

    #[zbus(signal)]
    async fn state_changed(emitter: &SignalEmitter<'_>, running: bool) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn menu_changed(emitter: &SignalEmitter<'_>, open: bool) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn builtin_keyboard(emitter: &SignalEmitter<'_>, event: &str, monitor: i32) -> zbus::Result<()>;
}

/// Claim the well-known name and export the control object.
pub async fn serve(control: IndicatorControl) -> Result<Connection> {
    let connection = zbus::connection::Builder::session()?
        .name(INDICATOR_BUS_NAME)?
        .serve_at(INDICATOR_PATH, control)?
        .build()
        .await?;

    info!("D-Bus service registered: {} at {}", INDICATOR_BUS_NAME, INDICATOR_PATH);
    Ok(connection)
}

/// Re-emit manager, indicator and built-in keyboard changes as signals and
/// property notifications until any source closes.
pub fn spawn_signal_forwarder(
    connection: Connection,
    indicator: Arc<Indicator>,
    host: &SessionKeyboard,
) -> JoinHandle<()> {
    let mut snapshots = indicator.manager().subscribe();
    let mut indicator_events = indicator.subscribe();
    let mut builtin_events = host.subscribe();

    tokio::spawn(async move {
        let iface_ref = match connection
            .object_server()
            .interface::<_, IndicatorControl>(INDICATOR_PATH)
            .await
        {
            Ok(iface_ref) => iface_ref,
            Err(e) => {
                error!("Control interface not exported: {}", e);
                return;
            }
        };

        let mut running = snapshots.borrow_and_update().is_running;
        loop {
            let result = tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now = snapshots.borrow_and_update().is_running;
                    if now == running {
                        continue;
                    }
                    running = now;
                    emit_running(&iface_ref, running).await
                }
                event = indicator_events.recv() => match event {
                    Ok(event) => emit_indicator(&iface_ref, event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Dropped {} indicator events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                event = builtin_events.recv() => match event {
                    Ok(event) => {
                        IndicatorControl::builtin_keyboard(iface_ref.signal_emitter(), event.name(), event.monitor()).await
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Dropped {} built-in keyboard events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            if let Err(e) = result {
                warn!("Failed to emit control signal: {}", e);
            }
        }
        debug!("Signal forwarder finished");
    })
}

async fn emit_running(iface_ref: &InterfaceRef<IndicatorControl>, running: bool) -> zbus::Result<()> {
    let emitter = iface_ref.signal_emitter();
    IndicatorControl::state_changed(emitter, running).await?;
    iface_ref.get().await.running_changed(emitter).await
}

async fn emit_indicator(iface_ref: &InterfaceRef<IndicatorControl>, event: IndicatorEvent) -> zbus::Result<()> {
    let emitter = iface_ref.signal_emitter();
    match event {
        IndicatorEvent::MenuChanged(open) => {
            IndicatorControl::menu_changed(emitter, open).await?;
            iface_ref.get().await.menu_open_changed(emitter).await
        }
        IndicatorEvent::LabelChanged(_) => iface_ref.get().await.exit_label_changed(emitter).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::session_manager::KeyboardSessionManager;
    use crate::services::testing::{FakeBus, FakeProcess};
    use crate::settings::SettingsStore;
    use tokio::sync::mpsc;
    use tokio::time::Duration;

    struct Fixture {
        control: IndicatorControl,
        actions: mpsc::UnboundedReceiver<GestureAction>,
        host: Arc<SessionKeyboard>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let config = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(SettingsStore::open(dir.path().join("settings.toml")).unwrap());
        let process = Arc::new(FakeProcess::new());
        let host = Arc::new(SessionKeyboard::new());
        let manager = KeyboardSessionManager::new(&config, Arc::new(FakeBus::new()), process.clone(), host.clone());
        let indicator = Indicator::new(&config, manager, process, settings);
        let (classifier, actions) = PressGestureClassifier::new(&config.gesture);

        Fixture {
            control: IndicatorControl::new(indicator, classifier, host.clone()),
            actions,
            host,
            _dir: dir,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_events_reach_classifier() {
        let mut fx = fixture();

        assert!(fx.control.pointer_event("mouse", "press", 1, 0).unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fx.control.pointer_event("mouse", "release", 1, 100).unwrap());
        assert!(!fx.control.pointer_event("mouse", "press", 3, 200).unwrap());

        assert_eq!(fx.actions.try_recv().unwrap(), GestureAction::CloseMenu);
        assert_eq!(fx.actions.try_recv().unwrap(), GestureAction::Toggle);
        assert!(fx.actions.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_strings_are_invalid_args() {
        let fx = fixture();

        assert!(matches!(fx.control.pointer_event("pen", "press", 1, 0), Err(fdo::Error::InvalidArgs(_))));
        assert!(matches!(fx.control.pointer_event("touch", "hover", 0, 0), Err(fdo::Error::InvalidArgs(_))));
        assert!(matches!(fx.control.set_action_mode("desktop"), Err(fdo::Error::InvalidArgs(_))));
        assert!(matches!(fx.control.activate_menu_item("about").await, Err(fdo::Error::InvalidArgs(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_builtin_requests_drive_host() {
        let fx = fixture();
        let mut events = fx.host.subscribe();

        fx.control.set_action_mode("lock-screen").unwrap();
        assert_eq!(fx.host.action_mode(), ActionMode::LockScreen);

        fx.control.request_builtin_show(1);
        let state = fx.host.state();
        assert!(state.requested);
        assert!(state.visible);
        assert_eq!(state.monitor, 1);
        assert_eq!(events.recv().await.unwrap(), crate::events::BuiltinKeyboardEvent::ShowRequested);

        fx.control.set_keyboard_requested(false);
        fx.control.request_builtin_hide();
        assert!(!fx.host.state().visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_properties_reflect_indicator() {
        let fx = fixture();

        assert!(!fx.control.running());
        assert!(!fx.control.is_running());
        assert_eq!(fx.control.exit_label(), "Start Onboard");
        assert!(!fx.control.menu_open());

        fx.control.set_show_gesture(false).unwrap();
        assert!(!fx.control.edge_drag_activated());
    }
}
