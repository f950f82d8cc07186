//! MQTT listener feeding the router.
//!
//! This module owns the broker side of the bridge: it connects to the
//! configured broker, subscribes to every topic in the registry and hands
//! each incoming publish to the router, one message at a time. Connection
//! errors are logged and retried with exponential backoff; the event loop
//! reconnects on the next poll.

use crate::config::DeviceConfig;
use crate::registry::Registry;
use crate::router::Router;
use anyhow::Result;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const INITIAL_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 60_000;

/// Subscribes to the registry's topics and drives the router.
pub struct MqttListener {
    options: MqttOptions,
    registry: Arc<Registry>,
    router: Arc<Router>,
}

impl MqttListener {
    /// Creates a listener for the given device, using the device name as the
    /// MQTT client id.
    pub fn new(device: &DeviceConfig, registry: Arc<Registry>, router: Arc<Router>) -> Self {
        let mut options = MqttOptions::new(&device.name, &device.mqtt.host, device.mqtt.port);
        options.set_keep_alive(KEEP_ALIVE);
        Self {
            options,
            registry,
            router,
        }
    }

    /// Runs the delivery loop until the shutdown signal fires.
    ///
    /// Topics are (re)subscribed on every connection acknowledgement, so a
    /// broker reconnect restores the full subscription set. Messages are
    /// processed to completion before the next poll, matching the
    /// single-worker delivery model.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<()>) -> Result<()> {
        let (client, mut eventloop) = AsyncClient::new(self.options, 16);
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("MQTT listener received shutdown signal");
                    let _ = client.disconnect().await;
                    break;
                }
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                        backoff_ms = INITIAL_BACKOFF_MS;
                        for topic in self.registry.topics() {
                            client.subscribe(topic, QoS::AtMostOnce).await?;
                            debug!("subscribed to {topic}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        self.router.on_message(&publish.topic, &publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        error!("MQTT connection error: {err}");
                        info!("reconnecting in {backoff_ms} ms");
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms = std::cmp::min(backoff_ms * 2, MAX_BACKOFF_MS);
                    }
                }
            }
        }

        Ok(())
    }
}
