pub mod control_server;
pub mod gesture;
pub mod host_keyboard;
pub mod indicator;
pub mod keyboard_bus;
pub mod process;
pub mod session_manager;

#[cfg(test)]
pub mod testing;

pub use control_server::{serve, spawn_signal_forwarder, IndicatorControl};
pub use gesture::PressGestureClassifier;
pub use host_keyboard::SessionKeyboard;
pub use indicator::Indicator;
pub use keyboard_bus::create_keyboard_bus;
pub use process::create_process_control;
pub use session_manager::KeyboardSessionManager;
