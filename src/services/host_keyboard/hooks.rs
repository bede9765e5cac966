use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::r#trait::BuiltinKeyboard;

pub type ShowHook = Arc<dyn Fn(&dyn BuiltinKeyboard, i32) + Send + Sync>;
pub type HideHook = Arc<dyn Fn(&dyn BuiltinKeyboard) + Send + Sync>;

/// The pair of entry points a keyboard runs on show/hide
#[derive(Clone)]
pub struct KeyboardHooks {
    pub show: ShowHook,
    pub hide: HideHook,
}

impl KeyboardHooks {
    pub fn new(show: ShowHook, hide: HideHook) -> Self {
        Self { show, hide }
    }

    /// Same closures, not merely equivalent ones
    pub fn same_as(&self, other: &KeyboardHooks) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.show), Arc::as_ptr(&other.show))
            && std::ptr::addr_eq(Arc::as_ptr(&self.hide), Arc::as_ptr(&other.hide))
    }
}

impl fmt::Debug for KeyboardHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardHooks")
            .field("show", &Arc::as_ptr(&self.show).cast::<()>())
            .field("hide", &Arc::as_ptr(&self.hide).cast::<()>())
            .finish()
    }
}

/// Currently installed hooks. Swaps are atomic; the lock is never held while
/// a hook runs, so hooks may re-enter the keyboard.
pub struct HookSlot {
    current: Mutex<KeyboardHooks>,
}

impl HookSlot {
    pub fn new(hooks: KeyboardHooks) -> Self {
        Self {
            current: Mutex::new(hooks),
        }
    }

    /// Install `hooks`, returning what was there before
    pub fn replace(&self, hooks: KeyboardHooks) -> KeyboardHooks {
        std::mem::replace(&mut *self.current.lock(), hooks)
    }

    pub fn current(&self) -> KeyboardHooks {
        self.current.lock().clone()
    }

    pub fn invoke_show(&self, keyboard: &dyn BuiltinKeyboard, monitor: i32) {
        let show = self.current.lock().show.clone();
        show(keyboard, monitor);
    }

    pub fn invoke_hide(&self, keyboard: &dyn BuiltinKeyboard) {
        let hide = self.current.lock().hide.clone();
        hide(keyboard);
    }
}
