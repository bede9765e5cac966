use crate::error::Result;
use crate::indicator_error;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Resolves once the spawned child has exited
pub type ProcessExit = oneshot::Receiver<()>;

/// Starting, probing and stopping helper processes
#[async_trait::async_trait]
pub trait ProcessControl: Send + Sync {
    /// Whether a process with this name is alive. Probe failures count as "no".
    async fn is_running(&self, name: &str) -> bool;

    /// Spawn a command line without waiting for it
    async fn spawn(&self, command_line: &str) -> Result<ProcessExit>;

    /// Best-effort termination of every process with this name
    async fn kill(&self, name: &str);
}

/// Factory function to create an appropriate process control based on the dry_run flag
pub fn create_process_control(dry_run: bool) -> Arc<dyn ProcessControl> {
    if dry_run {
        Arc::new(super::dry_run::DryRunProcessControl::new())
    } else {
        Arc::new(super::system::SystemProcessControl::new())
    }
}

/// Whitespace-split a command line into program and arguments. No shell
/// quoting is interpreted.
pub fn split_command_line(command_line: &str) -> Result<(String, Vec<String>)> {
    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| indicator_error!(invalid_argument, "empty command line"))?;
    Ok((program, parts.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command_line() {
        let (program, args) = split_command_line("yelp  help:onboard").unwrap();
        assert_eq!(program, "yelp");
        assert_eq!(args, vec!["help:onboard".to_string()]);
    }

    #[test]
    fn test_split_empty_command_line() {
        assert!(split_command_line("   ").is_err());
    }
}
