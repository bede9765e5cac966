use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub onboard: OnboardConfig,
    pub connection: ConnectionConfig,
    pub gesture: GestureConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Where the keyboard lives and how to start it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OnboardConfig {
    pub command: String,
    pub process_name: String,
    pub bus_name: String,
    pub object_path: String,
    pub settings_command: String,
    pub help_command: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub startup_delay_ms: u64,
    pub connect_delay_ms: u64,
    pub retry_backoff_ms: u64,
    pub max_retries: u32,
    pub replay_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GestureConfig {
    pub long_press_ms: u64,
    pub short_press_ms: u64,
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
            },
            onboard: OnboardConfig {
                command: "onboard".to_string(),
                process_name: "onboard".to_string(),
                bus_name: "org.onboard.Onboard".to_string(),
                object_path: "/org/onboard/Onboard/Keyboard".to_string(),
                settings_command: "onboard-settings".to_string(),
                help_command: "yelp help:onboard".to_string(),
            },
            connection: ConnectionConfig {
                startup_delay_ms: 500,
                connect_delay_ms: 200,
                retry_backoff_ms: 200,
                max_retries: 5,
                replay_delay_ms: 200,
            },
            gesture: GestureConfig {
                long_press_ms: 1000,
                short_press_ms: 500,
                debounce_ms: 500,
            },
        }
    }
}

impl ConnectionConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }
}

impl GestureConfig {
    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Defaults, overlaid by the TOML file (if present), overlaid by
    /// `ONBOARD_INDICATOR_*` environment variables.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("ONBOARD_INDICATOR_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "full" | "compact" => {}
            _ => anyhow::bail!("Invalid log format: {}", self.logging.format),
        }

        if self.onboard.command.trim().is_empty() {
            anyhow::bail!("onboard.command must not be empty");
        }
        if self.onboard.process_name.trim().is_empty() {
            anyhow::bail!("onboard.process_name must not be empty");
        }
        if !self.onboard.object_path.starts_with('/') {
            anyhow::bail!("onboard.object_path must be absolute: {}", self.onboard.object_path);
        }

        if self.connection.retry_backoff_ms == 0 {
            anyhow::bail!("connection.retry_backoff_ms must be greater than 0");
        }

        if self.gesture.short_press_ms == 0 || self.gesture.long_press_ms == 0 {
            anyhow::bail!("gesture thresholds must be greater than 0");
        }
        if self.gesture.short_press_ms > self.gesture.long_press_ms {
            anyhow::bail!(
                "gesture.short_press_ms ({}) must not exceed gesture.long_press_ms ({})",
                self.gesture.short_press_ms,
                self.gesture.long_press_ms
            );
        }

        Ok(())
    }
}
