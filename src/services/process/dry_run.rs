use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::info;

use super::r#trait::{split_command_line, ProcessControl, ProcessExit};

/// Keeps a table of "running" programs instead of touching the system
pub struct DryRunProcessControl {
    running: Mutex<HashMap<String, oneshot::Sender<()>>>,
}

impl DryRunProcessControl {
    pub fn new() -> Self {
        info!("Dry-run mode - processes are only simulated");
        Self {
            running: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl ProcessControl for DryRunProcessControl {
    async fn is_running(&self, name: &str) -> bool {
        self.running.lock().contains_key(name)
    }

    async fn spawn(&self, command_line: &str) -> Result<ProcessExit> {
        let (program, _) = split_command_line(command_line)?;
        let (tx, rx) = oneshot::channel();
        info!("[DRY RUN] spawn '{}'", command_line);
        self.running.lock().insert(program, tx);
        Ok(rx)
    }

    async fn kill(&self, name: &str) {
        info!("[DRY RUN] killall {}", name);
        if let Some(exit) = self.running.lock().remove(name) {
            let _ = exit.send(());
        }
    }
}
