//! Transport to the on-screen keyboard's D-Bus service.
//!
//! Only binding, remote calls and owner tracking live here. Deciding when to
//! bind, retry or replay a command is the session manager's job.

mod dry_bus;
mod onboard_bus;
mod r#trait;

pub use self::r#trait::{create_keyboard_bus, KeyboardBus, OwnerLost};
