use crate::error::Result;
use crate::events::KeyboardCommand;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::info;

use super::r#trait::{KeyboardBus, OwnerLost};

/// Pretends the keyboard service is always there
pub struct DryRunBus {
    owner: Mutex<Option<oneshot::Sender<()>>>,
}

impl DryRunBus {
    pub fn new() -> Self {
        info!("Dry-run mode - keyboard bus calls are only logged");
        Self { owner: Mutex::new(None) }
    }
}

#[async_trait::async_trait]
impl KeyboardBus for DryRunBus {
    async fn bind(&self) -> Result<OwnerLost> {
        let (tx, rx) = oneshot::channel();
        *self.owner.lock() = Some(tx);
        info!("[DRY RUN] Bound keyboard proxy");
        Ok(rx)
    }

    async fn call(&self, command: KeyboardCommand) -> Result<()> {
        info!("[DRY RUN] Keyboard call: {}", command);
        Ok(())
    }

    fn has_owner(&self) -> bool {
        self.owner.lock().is_some()
    }

    fn unbind(&self) {
        self.owner.lock().take();
    }
}
