use crate::error::Result;
use crate::indicator_error;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::r#trait::{split_command_line, ProcessControl, ProcessExit};

/// Uses `pgrep`/`killall` and tokio child processes
pub struct SystemProcessControl;

impl SystemProcessControl {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ProcessControl for SystemProcessControl {
    async fn is_running(&self, name: &str) -> bool {
        match Command::new("pgrep").arg("-x").arg(name).stdout(Stdio::null()).status().await {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("pgrep {} failed: {}", name, e);
                false
            }
        }
    }

    async fn spawn(&self, command_line: &str) -> Result<ProcessExit> {
        let (program, args) = split_command_line(command_line)?;

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| indicator_error!(process, "failed to spawn '{}': {}", command_line, e))?;

        info!("Spawned '{}' (pid {:?})", command_line, child.id());

        let (tx, rx) = oneshot::channel();
        let command_line = command_line.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => info!("'{}' exited with {}", command_line, status),
                Err(e) => warn!("Waiting for '{}' failed: {}", command_line, e),
            }
            let _ = tx.send(());
        });

        Ok(rx)
    }

    async fn kill(&self, name: &str) {
        match Command::new("killall").arg(name).stderr(Stdio::null()).status().await {
            Ok(status) if status.success() => info!("Sent SIGTERM to {}", name),
            Ok(status) => debug!("killall {} returned {}", name, status),
            Err(e) => warn!("killall {} failed: {}", name, e),
        }
    }
}
