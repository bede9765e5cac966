use crate::events::{ActionMode, BuiltinKeyboardEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use super::hooks::{HideHook, HookSlot, KeyboardHooks, ShowHook};
use super::r#trait::BuiltinKeyboard;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltinState {
    pub action_mode: ActionMode,
    pub requested: bool,
    pub visible: bool,
    pub monitor: i32,
    pub layout_shown: bool,
    pub source_active: bool,
}

/// Model of the shell's built-in keyboard. Every side effect is broadcast
/// so the shell-side shim can mirror it on the real widget.
pub struct SessionKeyboard {
    hooks: HookSlot,
    state: Mutex<BuiltinState>,
    events: broadcast::Sender<BuiltinKeyboardEvent>,
}

impl SessionKeyboard {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            hooks: HookSlot::new(stock_hooks()),
            state: Mutex::new(BuiltinState {
                source_active: true,
                ..BuiltinState::default()
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BuiltinKeyboardEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> BuiltinState {
        *self.state.lock()
    }

    pub fn set_action_mode(&self, mode: ActionMode) {
        debug!("Action mode -> {:?}", mode);
        self.state.lock().action_mode = mode;
    }

    /// Ask for the keyboard on a specific monitor
    pub fn request_show_on(&self, monitor: i32) {
        self.state.lock().monitor = monitor;
        self.request_show();
    }

    fn emit(&self, event: BuiltinKeyboardEvent) {
        debug!("Built-in keyboard: {}", event);
        let _ = self.events.send(event);
    }
}

impl Default for SessionKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

/// What the built-in keyboard does when nobody has patched it
fn stock_hooks() -> KeyboardHooks {
    let show: ShowHook = Arc::new(|keyboard: &dyn BuiltinKeyboard, monitor: i32| {
        if !keyboard.keyboard_requested() {
            return;
        }
        keyboard.set_keyboard_index(monitor);
        keyboard.redraw();
        keyboard.show_layout();
        keyboard.set_keyboard_visible(true);
        keyboard.destroy_source();
    });

    let hide: HideHook = Arc::new(|keyboard: &dyn BuiltinKeyboard| {
        if keyboard.keyboard_requested() {
            return;
        }
        keyboard.hide_subkeys();
        keyboard.hide_layout();
        keyboard.set_keyboard_visible(false);
        keyboard.create_source();
    });

    KeyboardHooks::new(show, hide)
}

impl BuiltinKeyboard for SessionKeyboard {
    fn hooks(&self) -> &HookSlot {
        &self.hooks
    }

    fn action_mode(&self) -> ActionMode {
        self.state.lock().action_mode
    }

    fn keyboard_requested(&self) -> bool {
        self.state.lock().requested
    }

    fn set_keyboard_requested(&self, requested: bool) {
        self.state.lock().requested = requested;
    }

    fn keyboard_visible(&self) -> bool {
        self.state.lock().visible
    }

    fn set_keyboard_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }

    fn set_keyboard_index(&self, monitor: i32) {
        self.state.lock().monitor = monitor;
        self.emit(BuiltinKeyboardEvent::KeyboardIndexChanged(monitor));
    }

    fn hide_subkeys(&self) {
        self.emit(BuiltinKeyboardEvent::SubkeysHidden);
    }

    fn hide_layout(&self) {
        self.state.lock().layout_shown = false;
        self.emit(BuiltinKeyboardEvent::LayoutHidden);
    }

    fn show_layout(&self) {
        self.state.lock().layout_shown = true;
        self.emit(BuiltinKeyboardEvent::LayoutShown);
    }

    fn redraw(&self) {
        self.emit(BuiltinKeyboardEvent::Redrawn);
    }

    fn create_source(&self) {
        self.state.lock().source_active = true;
        self.emit(BuiltinKeyboardEvent::SourceCreated);
    }

    fn destroy_source(&self) {
        self.state.lock().source_active = false;
        self.emit(BuiltinKeyboardEvent::SourceDestroyed);
    }

    fn show(&self, monitor: i32) {
        self.hooks.invoke_show(self, monitor);
    }

    fn hide(&self) {
        self.hooks.invoke_hide(self);
    }

    fn request_show(&self) {
        let monitor = {
            let mut state = self.state.lock();
            state.requested = true;
            state.monitor
        };
        self.emit(BuiltinKeyboardEvent::ShowRequested);
        self.show(monitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_show_renders_builtin() {
        let keyboard = SessionKeyboard::new();
        keyboard.request_show();

        let state = keyboard.state();
        assert!(state.requested);
        assert!(state.visible);
        assert!(state.layout_shown);
        assert!(!state.source_active);
    }

    #[test]
    fn test_stock_hide_respects_request() {
        let keyboard = SessionKeyboard::new();
        keyboard.request_show();
        keyboard.hide();
        assert!(keyboard.state().layout_shown);

        keyboard.set_keyboard_requested(false);
        keyboard.hide();
        let state = keyboard.state();
        assert!(!state.visible);
        assert!(!state.layout_shown);
        assert!(state.source_active);
    }
}
