//! ntfy-bridge - MQTT to ntfy push-notification bridge
//!
//! Subscribes to the configured MQTT topics and forwards the notification
//! text extracted from each matching message to an ntfy-compatible push
//! endpoint, with per-topic title, priority and tags.

use anyhow::{Context, Result};
use clap::Parser;
use ntfy_bridge::{
    broker::MqttListener,
    cli::Cli,
    config::{DeviceFile, ModuleConfig, ModuleLoggingConfig},
    notifier::NtfyClient,
    registry::Registry,
    router::Router,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration; a missing or invalid document is fatal at startup.
    let (module_config, device_file) = match load_configuration(&cli) {
        Ok(loaded) => loaded,
        Err(err) => {
            // Logging is not configured yet, fall back to a plain subscriber.
            tracing_subscriber::fmt().init();
            error!("failed to load configuration: {err:#}");
            std::process::exit(1);
        }
    };

    // Module logging settings override the device-wide ones field by field.
    let mut logging = module_config.logging.clone();
    logging.merge(&device_file.logging);
    let _guard = init_logging(&logging)?;

    info!("ntfy-bridge starting up");
    info!(
        "MQTT broker: {}:{} (enabled: {})",
        device_file.device.mqtt.host,
        device_file.device.mqtt.port,
        device_file.device.mqtt.enabled
    );
    info!("ntfy base URL: {}", module_config.ntfy_base_url);
    info!("configured mappings: {}", module_config.mappings.len());

    if !device_file.device.mqtt.enabled {
        error!("MQTT not enabled in device configuration, exiting");
        std::process::exit(1);
    }

    let registry = Arc::new(Registry::new(module_config.mappings));
    let notifier = NtfyClient::new(&module_config.ntfy_base_url)?;
    let router = Arc::new(Router::new(registry.clone(), Box::new(notifier)));

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let listener = MqttListener::new(&device_file.device, registry, router);
    let listener_task = tokio::spawn(async move {
        if let Err(err) = listener.run(shutdown_rx).await {
            error!("MQTT listener failed: {err:#}");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, shutting down gracefully");
    let _ = shutdown_tx.send(());

    if let Err(err) = listener_task.await {
        error!("MQTT listener task panicked: {err:?}");
    }

    info!("all tasks shut down, exiting");
    Ok(())
}

fn load_configuration(cli: &Cli) -> Result<(ModuleConfig, DeviceFile)> {
    let module_config = ModuleConfig::load(&cli.config)?;
    let device_file = DeviceFile::load(&cli.device_config)?;
    Ok((module_config, device_file))
}

/// Initialises the tracing subscriber from the merged logging settings.
///
/// With a configured path and file name, logs go to a daily-rolling file
/// and the returned guard must be held for the lifetime of the process;
/// otherwise logs go to stderr.
fn init_logging(config: &ModuleLoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = config.base.level.clone().unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match (&config.base.path, &config.file) {
        (Some(path), Some(file)) => {
            std::fs::create_dir_all(path)
                .with_context(|| format!("failed to create log directory {}", path.display()))?;

            let mut builder = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix(file.clone());
            if let Some(rotation) = &config.base.rotation {
                builder = builder.max_log_files(rotation.keep);
            }
            let appender = builder
                .build(path)
                .context("failed to create log file appender")?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}
