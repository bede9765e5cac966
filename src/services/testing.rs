//! In-memory fakes for the bus and process seams.

use crate::error::{IndicatorError, Result};
use crate::events::KeyboardCommand;
use crate::services::keyboard_bus::{KeyboardBus, OwnerLost};
use crate::services::process::{split_command_line, ProcessControl, ProcessExit};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tokio::time::Duration;

/// Yield long enough for spawned fire-and-forget tasks to run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Default)]
struct FakeBusState {
    failures_left: u32,
    always_fail: bool,
    bind_calls: u32,
    calls: Vec<KeyboardCommand>,
    owner: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
pub struct FakeBus {
    state: Mutex<FakeBusState>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` binds, then succeed
    pub fn failing(count: u32) -> Self {
        let bus = Self::default();
        bus.state.lock().failures_left = count;
        bus
    }

    pub fn always_failing() -> Self {
        let bus = Self::default();
        bus.state.lock().always_fail = true;
        bus
    }

    pub fn set_always_fail(&self, fail: bool) {
        self.state.lock().always_fail = fail;
    }

    pub fn bind_calls(&self) -> u32 {
        self.state.lock().bind_calls
    }

    pub fn calls(&self) -> Vec<KeyboardCommand> {
        self.state.lock().calls.clone()
    }

    /// Simulate the service name losing its owner
    pub fn drop_owner(&self) {
        if let Some(owner) = self.state.lock().owner.take() {
            let _ = owner.send(());
        }
    }
}

#[async_trait::async_trait]
impl KeyboardBus for FakeBus {
    async fn bind(&self) -> Result<OwnerLost> {
        let mut state = self.state.lock();
        state.bind_calls += 1;
        if state.always_fail {
            return IndicatorError::service_unavailable("fake bus refuses to bind");
        }
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return IndicatorError::service_unavailable("fake bus not ready");
        }
        let (tx, rx) = oneshot::channel();
        state.owner = Some(tx);
        Ok(rx)
    }

    async fn call(&self, command: KeyboardCommand) -> Result<()> {
        let mut state = self.state.lock();
        if state.owner.is_none() {
            return IndicatorError::service_unavailable("fake bus unbound");
        }
        state.calls.push(command);
        Ok(())
    }

    fn has_owner(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    fn unbind(&self) {
        self.state.lock().owner.take();
    }
}

#[derive(Default)]
struct FakeProcessState {
    already_running: bool,
    fail_spawn: bool,
    spawned: Vec<String>,
    killed: Vec<String>,
    children: HashMap<String, oneshot::Sender<()>>,
}

#[derive(Default)]
pub struct FakeProcess {
    state: Mutex<FakeProcessState>,
}

impl FakeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_already_running(&self, running: bool) {
        self.state.lock().already_running = running;
    }

    pub fn set_fail_spawn(&self, fail: bool) {
        self.state.lock().fail_spawn = fail;
    }

    pub fn spawned(&self) -> Vec<String> {
        self.state.lock().spawned.clone()
    }

    pub fn killed(&self) -> Vec<String> {
        self.state.lock().killed.clone()
    }

    /// Let a spawned program exit on its own
    pub fn exit(&self, program: &str) {
        if let Some(child) = self.state.lock().children.remove(program) {
            let _ = child.send(());
        }
    }
}

#[async_trait::async_trait]
impl ProcessControl for FakeProcess {
    async fn is_running(&self, _name: &str) -> bool {
        self.state.lock().already_running
    }

    async fn spawn(&self, command_line: &str) -> Result<ProcessExit> {
        let (program, _) = split_command_line(command_line)?;
        let mut state = self.state.lock();
        if state.fail_spawn {
            return Err(IndicatorError::Process(format!("cannot spawn {}", program)));
        }
        state.spawned.push(command_line.to_string());
        let (tx, rx) = oneshot::channel();
        state.children.insert(program, tx);
        Ok(rx)
    }

    async fn kill(&self, name: &str) {
        let mut state = self.state.lock();
        state.killed.push(name.to_string());
        state.children.remove(name);
    }
}
