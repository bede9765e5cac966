use crate::error::{IndicatorError, Result};
use crate::events::KeyboardCommand;
use crate::indicator_error;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zbus::names::BusName;
use zbus::proxy::CacheProperties;
use zbus::{proxy, Connection};

use super::r#trait::{KeyboardBus, OwnerLost};

#[proxy(
    interface = "org.onboard.Onboard.Keyboard",
    default_service = "org.onboard.Onboard",
    default_path = "/org/onboard/Onboard/Keyboard"
)]
trait OnboardKeyboard {
    fn toggle_visible(&self) -> zbus::Result<()>;

    fn show(&self) -> zbus::Result<()>;

    fn hide(&self) -> zbus::Result<()>;
}

pub struct OnboardBus {
    bus_name: String,
    object_path: String,
    connection: OnceCell<Connection>,
    proxy: Mutex<Option<OnboardKeyboardProxy<'static>>>,
    owned: Arc<AtomicBool>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl OnboardBus {
    pub fn new(bus_name: String, object_path: String) -> Self {
        info!("Keyboard bus targets {} at {}", bus_name, object_path);
        Self {
            bus_name,
            object_path,
            connection: OnceCell::new(),
            proxy: Mutex::new(None),
            owned: Arc::new(AtomicBool::new(false)),
            watcher: Mutex::new(None),
        }
    }

    async fn connection(&self) -> Result<&Connection> {
        let connection = self
            .connection
            .get_or_try_init(|| async { Connection::session().await })
            .await?;
        Ok(connection)
    }

    async fn name_has_owner(&self, connection: &Connection) -> Result<bool> {
        let name = BusName::try_from(self.bus_name.as_str())
            .map_err(|e| indicator_error!(invalid_argument, "bad bus name {}: {}", self.bus_name, e))?;
        let dbus = zbus::fdo::DBusProxy::new(connection).await?;
        Ok(dbus.name_has_owner(name).await?)
    }

    fn spawn_owner_watch(&self, proxy: OnboardKeyboardProxy<'static>) -> OwnerLost {
        let (tx, rx) = oneshot::channel();
        let owned = self.owned.clone();
        let bus_name = self.bus_name.clone();

        let handle = tokio::spawn(async move {
            let mut changes = match proxy.inner().receive_owner_changed().await {
                Ok(changes) => changes,
                Err(e) => {
                    warn!("Cannot watch owner of {}: {}", bus_name, e);
                    return;
                }
            };

            while let Some(owner) = changes.next().await {
                match owner {
                    Some(owner) => {
                        debug!("{} is now owned by {}", bus_name, owner);
                        owned.store(true, Ordering::SeqCst);
                    }
                    None => {
                        info!("{} lost its owner", bus_name);
                        owned.store(false, Ordering::SeqCst);
                        let _ = tx.send(());
                        return;
                    }
                }
            }
        });

        if let Some(previous) = self.watcher.lock().replace(handle) {
            previous.abort();
        }
        rx
    }
}

#[async_trait::async_trait]
impl KeyboardBus for OnboardBus {
    async fn bind(&self) -> Result<OwnerLost> {
        let connection = self.connection().await?;

        if !self.name_has_owner(connection).await? {
            self.owned.store(false, Ordering::SeqCst);
            return IndicatorError::service_unavailable(format!("{} has no owner", self.bus_name));
        }

        let proxy = OnboardKeyboardProxy::builder(connection)
            .destination(self.bus_name.clone())?
            .path(self.object_path.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;

        self.owned.store(true, Ordering::SeqCst);
        *self.proxy.lock() = Some(proxy.clone());
        Ok(self.spawn_owner_watch(proxy))
    }

    async fn call(&self, command: KeyboardCommand) -> Result<()> {
        let proxy = self
            .proxy
            .lock()
            .clone()
            .ok_or_else(|| indicator_error!(service_unavailable, "{} is not bound", self.bus_name))?;

        match command {
            KeyboardCommand::Show => proxy.show().await?,
            KeyboardCommand::Hide => proxy.hide().await?,
            KeyboardCommand::ToggleVisible => proxy.toggle_visible().await?,
        }
        Ok(())
    }

    fn has_owner(&self) -> bool {
        self.proxy.lock().is_some() && self.owned.load(Ordering::SeqCst)
    }

    fn unbind(&self) {
        self.proxy.lock().take();
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
        self.owned.store(false, Ordering::SeqCst);
    }
}
