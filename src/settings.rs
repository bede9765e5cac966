use crate::error::{IndicatorError, Result};
use crate::services::process::ProcessControl;
use anyhow::Context;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current layout of the persisted settings
pub const SCHEMA_VERSION: &str = "1.0";

/// Run once so Onboard pops up on its own for text entry
const AUTO_SHOW_SEED: &str = "gsettings set org.onboard.auto-show enabled true";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorSettings {
    /// Empty until the first run completed
    pub schema_version: String,
    pub enable_show_gesture: bool,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            schema_version: String::new(),
            enable_show_gesture: true,
        }
    }
}

/// User settings, written back on every change
pub struct SettingsStore {
    path: PathBuf,
    current: Mutex<IndicatorSettings>,
}

impl SettingsStore {
    /// `$XDG_CONFIG_HOME/onboard-indicator/settings.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("onboard-indicator").join("settings.toml"))
            .ok_or_else(|| crate::indicator_error!(internal, "no user configuration directory"))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let current = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            toml::from_str::<IndicatorSettings>(&text).with_context(|| format!("Failed to parse settings {:?}", path))?
        } else {
            debug!("No settings at {:?}, using defaults", path);
            IndicatorSettings::default()
        };

        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    #[cfg(test)]
    pub fn get(&self) -> IndicatorSettings {
        self.current.lock().clone()
    }

    pub fn show_gesture_enabled(&self) -> bool {
        self.current.lock().enable_show_gesture
    }

    pub fn set_show_gesture(&self, enabled: bool) -> Result<()> {
        let settings = {
            let mut current = self.current.lock();
            if current.enable_show_gesture == enabled {
                return Ok(());
            }
            current.enable_show_gesture = enabled;
            current.clone()
        };
        info!("Show gesture {}", if enabled { "enabled" } else { "disabled" });
        self.save(&settings)
    }

    /// Stamp the schema version and seed Onboard's defaults. Returns true
    /// when this was the first run.
    pub async fn ensure_first_run(&self, process: &dyn ProcessControl) -> Result<bool> {
        let settings = {
            let mut current = self.current.lock();
            if !current.schema_version.is_empty() {
                return Ok(false);
            }
            current.schema_version = SCHEMA_VERSION.to_string();
            current.clone()
        };

        info!("First run, seeding Onboard defaults");
        self.save(&settings)?;
        if let Err(e) = process.spawn(AUTO_SHOW_SEED).await {
            warn!("Could not enable Onboard auto-show: {}", e);
        }
        Ok(true)
    }

    fn save(&self, settings: &IndicatorSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(settings)
            .map_err(|e| IndicatorError::Internal(format!("cannot serialize settings: {}", e)))?;
        std::fs::write(&self.path, text)?;
        debug!("Settings saved to {:?}", self.path);
        Ok(())
    }
}
