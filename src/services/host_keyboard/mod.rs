//! Interception seam over the shell's built-in keyboard.
//!
//! The built-in keyboard exposes its show/hide entry points through a
//! [`HookSlot`]. The shim swaps in overrides that keep it out of Onboard's way
//! and puts the saved originals back on teardown.

mod hooks;
mod session_keyboard;
mod shim;
mod r#trait;

pub use self::hooks::{HideHook, HookSlot, KeyboardHooks, ShowHook};
pub use self::r#trait::BuiltinKeyboard;
pub use self::session_keyboard::{BuiltinState, SessionKeyboard};
pub use self::shim::{override_hooks, ExternalHide, HookShim};
