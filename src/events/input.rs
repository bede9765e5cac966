use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IndicatorError;

/// Left mouse button
pub const PRIMARY_BUTTON: u32 = 1;

/// Independent input source feeding the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputChannel {
    Mouse,
    Touch,
}

impl InputChannel {
    pub fn index(&self) -> usize {
        match self {
            InputChannel::Mouse => 0,
            InputChannel::Touch => 1,
        }
    }
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputChannel::Mouse => f.write_str("mouse"),
            InputChannel::Touch => f.write_str("touch"),
        }
    }
}

impl FromStr for InputChannel {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mouse" | "pointer" => Ok(InputChannel::Mouse),
            "touch" => Ok(InputChannel::Touch),
            other => Err(IndicatorError::InvalidArgument(format!("unknown input channel '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressPhase {
    /// Button press or touch begin
    Press,
    /// Button release or touch end
    Release,
}

impl FromStr for PressPhase {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "press" | "begin" => Ok(PressPhase::Press),
            "release" | "end" => Ok(PressPhase::Release),
            other => Err(IndicatorError::InvalidArgument(format!("unknown press phase '{}'", other))),
        }
    }
}

/// Raw press/release as delivered by the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub channel: InputChannel,
    pub phase: PressPhase,
    /// Ignored for touch
    pub button: u32,
    /// Event clock in milliseconds
    pub time_ms: u32,
}

impl PointerEvent {
    pub fn mouse(phase: PressPhase, button: u32, time_ms: u32) -> Self {
        Self {
            channel: InputChannel::Mouse,
            phase,
            button,
            time_ms,
        }
    }

    pub fn touch(phase: PressPhase, time_ms: u32) -> Self {
        Self {
            channel: InputChannel::Touch,
            phase,
            button: 0,
            time_ms,
        }
    }

    /// Touch always counts; for the mouse only the primary button does.
    pub fn is_primary(&self) -> bool {
        match self.channel {
            InputChannel::Touch => true,
            InputChannel::Mouse => self.button == PRIMARY_BUTTON,
        }
    }
}

impl fmt::Display for PointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} button={} t={}", self.channel, self.phase, self.button, self.time_ms)
    }
}

/// Outcome of a classified press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureAction {
    /// Short tap: toggle the keyboard
    Toggle,
    /// Long press elapsed: open the menu
    OpenMenu,
    /// Slow mouse release: flip the menu
    ToggleMenu,
    /// Primary mouse press: any open menu goes away first
    CloseMenu,
}
