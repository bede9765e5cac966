use crate::config::{Config, OnboardConfig};
use crate::error::Result;
use crate::events::{GestureAction, SessionSnapshot};
use crate::indicator_error;
use crate::services::process::ProcessControl;
use crate::services::session_manager::KeyboardSessionManager;
use crate::settings::SettingsStore;
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Preferences,
    Help,
    StartOrExit,
}

impl FromStr for MenuItem {
    type Err = crate::error::IndicatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "preferences" => Ok(MenuItem::Preferences),
            "help" => Ok(MenuItem::Help),
            "start-or-exit" | "start" | "exit" => Ok(MenuItem::StartOrExit),
            other => Err(indicator_error!(invalid_argument, "unknown menu item '{}'", other)),
        }
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Preferences => f.write_str("preferences"),
            MenuItem::Help => f.write_str("help"),
            MenuItem::StartOrExit => f.write_str("start-or-exit"),
        }
    }
}

/// What the panel button should currently look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorEvent {
    LabelChanged(String),
    MenuChanged(bool),
}

#[derive(Debug)]
struct IndicatorView {
    menu_open: bool,
    label: String,
}

/// Panel button model. Turns gesture actions and menu activations into
/// manager calls and keeps the menu state and start/exit label.
pub struct Indicator {
    manager: Arc<KeyboardSessionManager>,
    process: Arc<dyn ProcessControl>,
    settings: Arc<SettingsStore>,
    onboard: OnboardConfig,
    view: Mutex<IndicatorView>,
    events: broadcast::Sender<IndicatorEvent>,
}

impl Indicator {
    pub fn new(
        config: &Config,
        manager: Arc<KeyboardSessionManager>,
        process: Arc<dyn ProcessControl>,
        settings: Arc<SettingsStore>,
    ) -> Arc<Self> {
        let label = manager.snapshot().exit_label().to_string();
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            manager,
            process,
            settings,
            onboard: config.onboard.clone(),
            view: Mutex::new(IndicatorView {
                menu_open: false,
                label,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IndicatorEvent> {
        self.events.subscribe()
    }

    pub fn manager(&self) -> &Arc<KeyboardSessionManager> {
        &self.manager
    }

    pub fn menu_open(&self) -> bool {
        self.view.lock().menu_open
    }

    pub fn exit_label(&self) -> String {
        self.view.lock().label.clone()
    }

    pub fn show_gesture_enabled(&self) -> bool {
        self.settings.show_gesture_enabled()
    }

    pub fn set_show_gesture(&self, enabled: bool) -> Result<()> {
        self.settings.set_show_gesture(enabled)
    }

    /// Consume classifier output and manager state until either side closes.
    pub async fn run(self: Arc<Self>, mut actions: mpsc::UnboundedReceiver<GestureAction>) {
        let mut snapshots = self.manager.subscribe();
        let initial = *snapshots.borrow_and_update();
        self.refresh_label(&initial);

        loop {
            tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => self.handle_action(action).await,
                    None => break,
                },
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = *snapshots.borrow_and_update();
                    self.refresh_label(&snapshot);
                }
            }
        }
        debug!("Indicator loop finished");
    }

    pub async fn handle_action(&self, action: GestureAction) {
        match action {
            GestureAction::Toggle => {
                self.manager.toggle_visible();
                self.manager.launch().await;
            }
            GestureAction::OpenMenu => self.set_menu_open(true),
            GestureAction::ToggleMenu => {
                let open = !self.menu_open();
                self.set_menu_open(open);
            }
            GestureAction::CloseMenu => self.set_menu_open(false),
        }
    }

    /// Activating an entry closes the menu first
    pub async fn activate(&self, item: MenuItem) -> Result<()> {
        info!("Menu item activated: {}", item);
        self.set_menu_open(false);

        match item {
            MenuItem::Preferences => {
                self.process.spawn(&self.onboard.settings_command).await?;
            }
            MenuItem::Help => {
                self.process.spawn(&self.onboard.help_command).await?;
            }
            MenuItem::StartOrExit => {
                if self.manager.is_not_running() {
                    self.manager.show();
                    self.manager.launch().await;
                } else {
                    let _ = self.manager.kill();
                }
            }
        }
        Ok(())
    }

    /// Edge swipe from the shell. Returns false when the gesture is switched off.
    pub fn edge_drag_activated(&self) -> bool {
        if !self.settings.show_gesture_enabled() {
            debug!("Show gesture disabled, ignoring edge drag");
            return false;
        }
        self.manager.show_any_keyboard();
        true
    }

    pub fn set_menu_open(&self, open: bool) {
        {
            let mut view = self.view.lock();
            if view.menu_open == open {
                return;
            }
            view.menu_open = open;
        }
        debug!("Menu {}", if open { "opened" } else { "closed" });
        let _ = self.events.send(IndicatorEvent::MenuChanged(open));
    }

    pub fn refresh_label(&self, snapshot: &SessionSnapshot) {
        let label = snapshot.exit_label();
        {
            let mut view = self.view.lock();
            if view.label == label {
                return;
            }
            view.label = label.to_string();
        }
        debug!("Label -> {}", label);
        let _ = self.events.send(IndicatorEvent::LabelChanged(label.to_string()));
    }
}
