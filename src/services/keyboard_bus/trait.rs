use crate::config::Config;
use crate::error::Result;
use crate::events::KeyboardCommand;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Resolves with `Ok(())` when the bound service name loses its owner.
/// A closed channel means the watch was dropped, not that the owner left.
pub type OwnerLost = oneshot::Receiver<()>;

/// RPC surface of the keyboard service
#[async_trait::async_trait]
pub trait KeyboardBus: Send + Sync {
    /// Bind a proxy to the service. Fails while nobody owns the name.
    async fn bind(&self) -> Result<OwnerLost>;

    /// Invoke a no-argument remote method on the bound proxy
    async fn call(&self, command: KeyboardCommand) -> Result<()>;

    /// Whether the bound name currently has an owner
    fn has_owner(&self) -> bool;

    /// Drop the proxy and stop watching the name
    fn unbind(&self);
}

/// Factory function to create an appropriate bus based on the dry_run flag
pub fn create_keyboard_bus(config: &Config, dry_run: bool) -> Arc<dyn KeyboardBus> {
    if dry_run {
        Arc::new(super::dry_bus::DryRunBus::new())
    } else {
        Arc::new(super::onboard_bus::OnboardBus::new(
            config.onboard.bus_name.clone(),
            config.onboard.object_path.clone(),
        ))
    }
}
