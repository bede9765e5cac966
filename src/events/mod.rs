pub mod host;
pub mod input;
pub mod keyboard;

pub use host::{ActionMode, BuiltinKeyboardEvent};
pub use input::{GestureAction, InputChannel, PointerEvent, PressPhase, PRIMARY_BUTTON};
pub use keyboard::{KeyboardCommand, LinkState, SessionSnapshot};
