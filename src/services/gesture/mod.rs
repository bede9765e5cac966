//! Press classification for the panel indicator: short tap toggles the
//! keyboard, a long press opens the menu. Mouse and touch are tracked
//! independently but share one debounce gate.

mod classifier;
mod debounce;

pub use classifier::PressGestureClassifier;
pub use debounce::DebounceGate;
