use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

mod config;
mod error;
mod events;
mod services;
mod settings;
mod utils;

use config::Config;
use services::{
    create_keyboard_bus, create_process_control, serve, spawn_signal_forwarder, Indicator, IndicatorControl,
    KeyboardSessionManager, PressGestureClassifier, SessionKeyboard,
};
use settings::SettingsStore;

#[derive(Parser, Debug)]
#[command(name = "onboard-indicator")]
#[command(about = "Panel indicator and session manager for the Onboard on-screen keyboard")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "onboard-indicator.toml")]
    config: String,

    /// Log actions instead of touching D-Bus or spawning processes
    #[arg(long)]
    dry_run: bool,

    /// Log level; overrides the configuration file
    #[arg(long)]
    log_level: Option<String>,

    /// Settings file (defaults to the user configuration directory)
    #[arg(long)]
    settings: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Arc::new(Config::load(&args.config)?);
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Starting onboard-indicator v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config);

    if args.dry_run {
        warn!("Dry run mode - no processes or D-Bus calls will be made");
    }

    let settings_path = match args.settings {
        Some(path) => path.into(),
        None => SettingsStore::default_path()?,
    };
    let settings = Arc::new(SettingsStore::open(&settings_path)?);
    info!("Settings loaded from: {:?}", settings_path);

    let process = create_process_control(args.dry_run);
    if let Err(e) = settings.ensure_first_run(process.as_ref()).await {
        warn!("First-run setup failed: {}", e);
    }

    let bus = create_keyboard_bus(&config, args.dry_run);
    let host = Arc::new(SessionKeyboard::new());
    let manager = KeyboardSessionManager::new(&config, bus, process.clone(), host.clone());
    manager.enable();

    let (classifier, actions) = PressGestureClassifier::new(&config.gesture);
    let indicator = Indicator::new(&config, manager.clone(), process, settings);
    let indicator_handle = tokio::spawn(indicator.clone().run(actions));

    let control = IndicatorControl::new(indicator.clone(), classifier.clone(), host.clone());
    let (connection, forwarder_handle) = match serve(control).await {
        Ok(connection) => {
            let forwarder = spawn_signal_forwarder(connection.clone(), indicator.clone(), &host);
            (Some(connection), Some(forwarder))
        }
        Err(e) => {
            warn!("Control interface unavailable: {}", e);
            (None, None)
        }
    };

    info!("All services started");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal (Ctrl+C)");
        }
        Err(err) => {
            error!("Failed to wait for shutdown signal: {}", err);
        }
    }

    info!("Shutting down...");

    classifier.shutdown();
    indicator_handle.abort();
    if let Some(forwarder) = forwarder_handle {
        forwarder.abort();
    }

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        if let Some(kill) = manager.disable() {
            let _ = kill.await;
        }
        let _ = indicator_handle.await;
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("All services stopped cleanly"),
        Err(_) => warn!("Timed out while stopping services"),
    }

    drop(connection);
    info!("onboard-indicator stopped");
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let compact = format == "compact";

    tracing_subscriber::registry()
        .with(filter)
        .with(compact.then(|| tracing_subscriber::fmt::layer().compact()))
        .with((!compact).then(|| tracing_subscriber::fmt::layer()))
        .init();

    Ok(())
}
