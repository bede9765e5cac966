use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote call on the keyboard service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyboardCommand {
    Show,
    Hide,
    ToggleVisible,
}

impl KeyboardCommand {
    /// Member name on `org.onboard.Onboard.Keyboard`
    pub fn method_name(&self) -> &'static str {
        match self {
            KeyboardCommand::Show => "Show",
            KeyboardCommand::Hide => "Hide",
            KeyboardCommand::ToggleVisible => "ToggleVisible",
        }
    }
}

impl fmt::Display for KeyboardCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Progress of the proxy binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    #[default]
    Idle,
    Connecting,
    Bound,
    /// Retries exhausted; only an explicit launch or command starts over.
    Failed,
}

/// What observers get to see of the connection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub is_running: bool,
    pub proxy_bound: bool,
    pub link: LinkState,
    pub retry_count: u32,
}

impl SessionSnapshot {
    /// Label for the start/exit menu entry
    pub fn exit_label(&self) -> &'static str {
        if self.is_running {
            "Exit Onboard"
        } else {
            "Start Onboard"
        }
    }
}

impl fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "running={} bound={} link={:?} retries={}",
            self.is_running, self.proxy_bound, self.link, self.retry_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        assert_eq!(KeyboardCommand::Show.method_name(), "Show");
        assert_eq!(KeyboardCommand::Hide.method_name(), "Hide");
        assert_eq!(KeyboardCommand::ToggleVisible.to_string(), "ToggleVisible");
    }

    #[test]
    fn test_exit_label_follows_running_flag() {
        let mut snapshot = SessionSnapshot::default();
        assert_eq!(snapshot.exit_label(), "Start Onboard");
        snapshot.is_running = true;
        assert_eq!(snapshot.exit_label(), "Exit Onboard");
    }
}
