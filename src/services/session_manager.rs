use crate::config::{Config, ConnectionConfig, OnboardConfig};
use crate::events::{KeyboardCommand, LinkState, SessionSnapshot};
use crate::services::host_keyboard::{BuiltinKeyboard, ExternalHide, HookShim};
use crate::services::keyboard_bus::{KeyboardBus, OwnerLost};
use crate::services::process::{ProcessControl, ProcessExit};
use crate::utils::TimerSlot;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// Connection bookkeeping. Only the manager touches it.
#[derive(Debug, Default)]
struct ConnectionState {
    is_running: bool,
    proxy_bound: bool,
    /// Last command issued while disconnected; later ones overwrite it.
    pending: Option<KeyboardCommand>,
    retry_count: u32,
    link: LinkState,
    /// Bumped whenever an in-flight connect attempt must be abandoned
    generation: u64,
    enabled: bool,
}

#[derive(Default)]
struct ManagerTimers {
    startup: TimerSlot,
    connect: TimerSlot,
    replay: TimerSlot,
    owner_watch: Option<JoinHandle<()>>,
    exit_watch: Option<JoinHandle<()>>,
}

impl ManagerTimers {
    fn cancel_all(&mut self) {
        self.startup.cancel();
        self.connect.cancel();
        self.replay.cancel();
        if let Some(watch) = self.owner_watch.take() {
            watch.abort();
        }
        if let Some(watch) = self.exit_watch.take() {
            watch.abort();
        }
    }
}

/// Owns the external keyboard process and its proxy, and decides which
/// keyboard gets the screen.
pub struct KeyboardSessionManager {
    connection: ConnectionConfig,
    onboard: OnboardConfig,
    bus: Arc<dyn KeyboardBus>,
    process: Arc<dyn ProcessControl>,
    host: Arc<dyn BuiltinKeyboard>,
    shim: HookShim,
    state: Mutex<ConnectionState>,
    timers: Mutex<ManagerTimers>,
    snapshots: watch::Sender<SessionSnapshot>,
    this: Weak<KeyboardSessionManager>,
}

impl KeyboardSessionManager {
    pub fn new(
        config: &Config,
        bus: Arc<dyn KeyboardBus>,
        process: Arc<dyn ProcessControl>,
        host: Arc<dyn BuiltinKeyboard>,
    ) -> Arc<Self> {
        info!(
            "Initializing KeyboardSessionManager (max_retries: {}, backoff: {}ms)",
            config.connection.max_retries, config.connection.retry_backoff_ms
        );

        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        Arc::new_cyclic(|this| Self {
            connection: config.connection.clone(),
            onboard: config.onboard.clone(),
            bus,
            process,
            host,
            shim: HookShim::new(),
            state: Mutex::new(ConnectionState::default()),
            timers: Mutex::new(ManagerTimers::default()),
            snapshots,
            this: this.clone(),
        })
    }

    /// Install the built-in keyboard overrides and bring the keyboard up
    /// after the startup delay.
    pub fn enable(&self) {
        {
            let mut state = self.state.lock();
            if state.enabled {
                return;
            }
            state.enabled = true;
        }

        let this = self.this.clone();
        let hide_external: ExternalHide = Arc::new(move || {
            if let Some(manager) = this.upgrade() {
                manager.hide();
            }
        });
        self.shim.install(self.host.as_ref(), hide_external);

        let this = self.this.clone();
        self.timers.lock().startup.arm(self.connection.startup_delay(), async move {
            if let Some(manager) = this.upgrade() {
                manager.spawn_if_absent().await;
                manager.schedule_connect(Duration::ZERO);
            }
        });
        info!("KeyboardSessionManager enabled");
    }

    /// Cancel every timer, restore the built-in keyboard and stop the
    /// external one. The returned handle completes once the kill was sent.
    pub fn disable(&self) -> Option<JoinHandle<()>> {
        let was_enabled = {
            let mut state = self.state.lock();
            state.generation += 1;
            std::mem::replace(&mut state.enabled, false)
        };

        self.timers.lock().cancel_all();
        self.shim.uninstall(self.host.as_ref());

        if !was_enabled {
            return None;
        }
        info!("KeyboardSessionManager disabled");
        Some(self.kill())
    }

    /// Start the keyboard unless it is already answering on the bus, then
    /// connect after a short settling delay.
    pub async fn launch(&self) {
        if !self.is_not_running() {
            debug!("Keyboard already running, launch is a no-op");
            return;
        }

        self.spawn_if_absent().await;
        self.schedule_connect(self.connection.connect_delay());
    }

    pub fn show(&self) {
        self.dispatch(KeyboardCommand::Show);
    }

    pub fn hide(&self) {
        self.dispatch(KeyboardCommand::Hide);
    }

    pub fn toggle_visible(&self) {
        self.dispatch(KeyboardCommand::ToggleVisible);
    }

    /// Terminate the keyboard process and drop the connection at once
    /// without waiting for the process to go away.
    pub fn kill(&self) -> JoinHandle<()> {
        {
            let mut state = self.state.lock();
            state.generation += 1;
            state.link = LinkState::Idle;
        }
        {
            let mut timers = self.timers.lock();
            timers.connect.cancel();
            timers.replay.cancel();
            if let Some(watch) = timers.exit_watch.take() {
                watch.abort();
            }
        }

        let process = self.process.clone();
        let name = self.onboard.process_name.clone();
        let handle = tokio::spawn(async move {
            process.kill(&name).await;
        });

        self.disconnect();
        handle
    }

    /// Forget the proxy; the keyboard is presumed gone.
    pub fn disconnect(&self) {
        {
            let mut state = self.state.lock();
            state.proxy_bound = false;
            state.is_running = false;
            if state.link == LinkState::Bound {
                state.link = LinkState::Idle;
            }
        }

        self.bus.unbind();
        {
            let mut timers = self.timers.lock();
            timers.replay.cancel();
            if let Some(watch) = timers.owner_watch.take() {
                watch.abort();
            }
        }

        info!("Keyboard process ended and proxy disconnected");
        self.publish();
    }

    /// True when no proxy is bound or nobody owns the service name
    pub fn is_not_running(&self) -> bool {
        !self.state.lock().proxy_bound || !self.bus.has_owner()
    }

    /// Edge-drag entry: ask the host for a keyboard, and in the normal
    /// session show Onboard as well.
    pub fn show_any_keyboard(&self) {
        self.host.set_keyboard_requested(true);
        self.host.set_keyboard_visible(false);
        self.host.request_show();

        if self.host.action_mode().is_normal() {
            self.show();
        }
    }

    #[cfg(test)]
    pub fn host(&self) -> &Arc<dyn BuiltinKeyboard> {
        &self.host
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            is_running: state.is_running,
            proxy_bound: state.proxy_bound,
            link: state.link,
            retry_count: state.retry_count,
        }
    }

    #[cfg(test)]
    pub fn pending_command(&self) -> Option<KeyboardCommand> {
        self.state.lock().pending
    }

    /// State-change notifications for the indicator
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        debug!("Session state: {}", snapshot);
        self.snapshots.send_replace(snapshot);
    }

    fn dispatch(&self, command: KeyboardCommand) {
        if self.is_not_running() {
            let (replaced, failed) = {
                let mut state = self.state.lock();
                (state.pending.replace(command), state.link == LinkState::Failed)
            };
            debug!("Not connected, queued {} (replacing {:?})", command, replaced);

            // A terminal failure only ends at the next explicit request
            if failed {
                info!("Retrying connection after {} request", command);
                self.schedule_connect(self.connection.connect_delay());
            }
            return;
        }

        let bus = self.bus.clone();
        tokio::spawn(async move {
            if let Err(e) = bus.call(command).await {
                warn!("Keyboard call {} failed: {}", command, e);
            }
        });
    }

    /// Claim the process slot, then spawn only if the probe finds nothing.
    async fn spawn_if_absent(&self) {
        {
            let mut state = self.state.lock();
            if state.is_running {
                return;
            }
            state.is_running = true;
        }

        if self.process.is_running(&self.onboard.process_name).await {
            debug!("{} is already running", self.onboard.process_name);
            self.publish();
            return;
        }

        info!("{} is not running, launching it", self.onboard.process_name);
        match self.process.spawn(&self.onboard.command).await {
            Ok(exit) => self.watch_exit(exit),
            Err(e) => {
                error!("Failed to launch keyboard: {}", e);
                self.state.lock().is_running = false;
            }
        }
        self.publish();
    }

    fn begin_connect(&self) -> u64 {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.retry_count = 0;
            state.link = LinkState::Connecting;
            state.generation
        };
        self.publish();
        generation
    }

    fn schedule_connect(&self, delay: Duration) {
        let generation = self.begin_connect();
        let this = self.this.clone();
        self.timers.lock().connect.arm(delay, async move {
            if let Some(manager) = this.upgrade() {
                manager.run_connect(generation).await;
            }
        });
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    async fn run_connect(&self, generation: u64) {
        let max_retries = self.connection.max_retries;
        let backoff = self.connection.retry_backoff();

        loop {
            if !self.is_current(generation) {
                return;
            }

            let error = match self.bus.bind().await {
                Ok(owner_lost) => {
                    if self.is_current(generation) {
                        self.on_bound(owner_lost);
                    }
                    return;
                }
                Err(e) => e,
            };

            let retry = {
                let mut state = self.state.lock();
                if state.generation != generation {
                    return;
                }
                if state.retry_count < max_retries {
                    state.retry_count += 1;
                    Some(state.retry_count)
                } else {
                    // Nothing answered: whatever the probe saw is not usable
                    state.link = LinkState::Failed;
                    state.is_running = false;
                    None
                }
            };
            self.publish();

            match retry {
                Some(attempt) => {
                    warn!(
                        "Keyboard bus connection failed ({}), retrying in {}ms ({}/{})",
                        error,
                        backoff.as_millis(),
                        attempt,
                        max_retries
                    );
                    sleep(backoff).await;
                }
                None => {
                    error!("Failed to connect to the keyboard bus after {} retries: {}", max_retries, error);
                    return;
                }
            }
        }
    }

    fn on_bound(&self, owner_lost: OwnerLost) {
        let replay = {
            let mut state = self.state.lock();
            let was_bound = state.proxy_bound;
            state.proxy_bound = true;
            state.is_running = true;
            state.retry_count = 0;
            state.link = LinkState::Bound;
            if was_bound {
                None
            } else {
                state.pending.take()
            }
        };
        info!("Connected to keyboard bus");

        self.watch_owner(owner_lost);

        if let Some(command) = replay {
            debug!("Replaying queued {} in {}ms", command, self.connection.replay_delay_ms);
            let this = self.this.clone();
            self.timers.lock().replay.arm(self.connection.replay_delay(), async move {
                if let Some(manager) = this.upgrade() {
                    manager.dispatch(command);
                }
            });
        }

        self.publish();
    }

    fn watch_owner(&self, owner_lost: OwnerLost) {
        let this = self.this.clone();
        let handle = tokio::spawn(async move {
            if owner_lost.await.is_ok() {
                if let Some(manager) = this.upgrade() {
                    info!("Keyboard service lost its bus name");
                    manager.disconnect();
                }
            }
        });
        if let Some(previous) = self.timers.lock().owner_watch.replace(handle) {
            previous.abort();
        }
    }

    fn watch_exit(&self, exit: ProcessExit) {
        let this = self.this.clone();
        let handle = tokio::spawn(async move {
            if exit.await.is_ok() {
                if let Some(manager) = this.upgrade() {
                    manager.disconnect();
                }
            }
        });
        if let Some(previous) = self.timers.lock().exit_watch.replace(handle) {
            previous.abort();
        }
    }
}
