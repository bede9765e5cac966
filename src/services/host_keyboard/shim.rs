use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use super::hooks::{HideHook, KeyboardHooks, ShowHook};
use super::r#trait::BuiltinKeyboard;

/// Hides the external keyboard when the built-in one has to take over
pub type ExternalHide = Arc<dyn Fn() + Send + Sync>;

/// Overrides that leave the screen to the external keyboard in the normal
/// session, and hand it back to the built-in keyboard everywhere else.
pub fn override_hooks(hide_external: ExternalHide) -> KeyboardHooks {
    let show: ShowHook = Arc::new(move |keyboard: &dyn BuiltinKeyboard, monitor: i32| {
        if !keyboard.keyboard_requested() {
            return;
        }

        keyboard.set_keyboard_index(monitor);

        if keyboard.action_mode().is_normal() {
            // Logically visible, never rendered
            keyboard.hide_subkeys();
            keyboard.hide_layout();
            keyboard.set_keyboard_visible(true);
        } else {
            debug!("Restricted context {:?}, built-in keyboard takes over", keyboard.action_mode());
            hide_external();
            keyboard.redraw();
            keyboard.show_layout();
        }
        keyboard.destroy_source();
    });

    let hide: HideHook = Arc::new(|keyboard: &dyn BuiltinKeyboard| {
        if keyboard.keyboard_requested() {
            return;
        }

        keyboard.hide_subkeys();
        keyboard.hide_layout();
        keyboard.create_source();
    });

    KeyboardHooks::new(show, hide)
}

/// Installs the overrides and remembers the hooks they replaced
#[derive(Default)]
pub struct HookShim {
    saved: Mutex<Option<KeyboardHooks>>,
}

impl HookShim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if already installed.
    pub fn install(&self, keyboard: &dyn BuiltinKeyboard, hide_external: ExternalHide) -> bool {
        let mut saved = self.saved.lock();
        if saved.is_some() {
            return false;
        }

        *saved = Some(keyboard.hooks().replace(override_hooks(hide_external)));
        info!("Built-in keyboard hooks overridden");
        true
    }

    /// Put the saved hooks back exactly as they were. Returns false if
    /// nothing was installed.
    pub fn uninstall(&self, keyboard: &dyn BuiltinKeyboard) -> bool {
        match self.saved.lock().take() {
            Some(original) => {
                keyboard.hooks().replace(original);
                info!("Built-in keyboard hooks restored");
                true
            }
            None => false,
        }
    }
}
