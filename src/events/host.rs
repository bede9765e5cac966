use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IndicatorError;

/// UI context of the shell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionMode {
    #[default]
    Normal,
    Overview,
    LockScreen,
    UnlockDialog,
    LoginScreen,
    SystemModal,
}

impl ActionMode {
    /// Regular desktop session, where Onboard takes over from the built-in keyboard
    pub fn is_normal(&self) -> bool {
        matches!(self, ActionMode::Normal)
    }
}

impl FromStr for ActionMode {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(ActionMode::Normal),
            "overview" => Ok(ActionMode::Overview),
            "lock-screen" => Ok(ActionMode::LockScreen),
            "unlock-screen" | "unlock-dialog" => Ok(ActionMode::UnlockDialog),
            "login-screen" => Ok(ActionMode::LoginScreen),
            "system-modal" => Ok(ActionMode::SystemModal),
            other => Err(IndicatorError::InvalidArgument(format!("unknown action mode '{}'", other))),
        }
    }
}

/// Side effect performed on the built-in keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinKeyboardEvent {
    ShowRequested,
    KeyboardIndexChanged(i32),
    SubkeysHidden,
    LayoutHidden,
    LayoutShown,
    Redrawn,
    SourceCreated,
    SourceDestroyed,
}

impl BuiltinKeyboardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinKeyboardEvent::ShowRequested => "show-requested",
            BuiltinKeyboardEvent::KeyboardIndexChanged(_) => "keyboard-index-changed",
            BuiltinKeyboardEvent::SubkeysHidden => "subkeys-hidden",
            BuiltinKeyboardEvent::LayoutHidden => "layout-hidden",
            BuiltinKeyboardEvent::LayoutShown => "layout-shown",
            BuiltinKeyboardEvent::Redrawn => "redrawn",
            BuiltinKeyboardEvent::SourceCreated => "source-created",
            BuiltinKeyboardEvent::SourceDestroyed => "source-destroyed",
        }
    }

    /// Monitor index carried by the event, -1 otherwise
    pub fn monitor(&self) -> i32 {
        match self {
            BuiltinKeyboardEvent::KeyboardIndexChanged(monitor) => *monitor,
            _ => -1,
        }
    }
}

impl fmt::Display for BuiltinKeyboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuiltinKeyboardEvent::KeyboardIndexChanged(monitor) => write!(f, "{}({})", self.name(), monitor),
            _ => f.write_str(self.name()),
        }
    }
}
