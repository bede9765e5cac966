use crate::events::ActionMode;

use super::hooks::HookSlot;

/// Capabilities of the host's built-in on-screen keyboard
pub trait BuiltinKeyboard: Send + Sync {
    /// Show/hide entry points, replaceable at runtime
    fn hooks(&self) -> &HookSlot;

    fn action_mode(&self) -> ActionMode;

    fn keyboard_requested(&self) -> bool;
    fn set_keyboard_requested(&self, requested: bool);

    fn keyboard_visible(&self) -> bool;
    fn set_keyboard_visible(&self, visible: bool);

    /// Monitor the keyboard is placed on
    fn set_keyboard_index(&self, monitor: i32);

    fn hide_subkeys(&self);
    fn hide_layout(&self);
    fn show_layout(&self);
    fn redraw(&self);

    /// Re-arm focus tracking that decides when to pop up
    fn create_source(&self);
    fn destroy_source(&self);

    /// Run the installed show hook
    fn show(&self, monitor: i32);

    /// Run the installed hide hook
    fn hide(&self);

    /// Public "a keyboard was asked for" entry point of the host
    fn request_show(&self);
}
