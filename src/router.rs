//! Routing of inbound broker messages to outbound notifications.
//!
//! The router is the only component with decision logic: it looks the
//! inbound topic up in the registry, extracts the notification text from the
//! message payload and hands the resulting notification to the configured
//! [`Notifier`]. Every message is handled independently; failures are
//! contained to the message that caused them and never tear down the
//! delivery loop.

use crate::config::TopicMapping;
use crate::notifier::{Notification, Notifier};
use crate::registry::Registry;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// A per-message dispatch failure. Contained to the offending message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload is not valid JSON or lacks a string `notification` field.
    /// A malformed payload on a matched topic is an upstream contract
    /// violation worth surfacing, not something to skip silently.
    #[error("payload is not a valid notification document: {0}")]
    Payload(#[from] serde_json::Error),
    /// The outbound HTTP call failed (connect error, timeout, non-2xx).
    #[error("failed to deliver notification to {destination}: {cause:#}")]
    Transport {
        destination: String,
        cause: anyhow::Error,
    },
}

/// Routes each inbound message to its configured notification, if any.
///
/// Holds no mutable state between invocations; the registry is read-only
/// after load, so the router can be shared across tasks.
pub struct Router {
    registry: Arc<Registry>,
    notifier: Box<dyn Notifier>,
}

impl Router {
    /// Creates a router over the given registry and notification collaborator.
    pub fn new(registry: Arc<Registry>, notifier: Box<dyn Notifier>) -> Self {
        Self { registry, notifier }
    }

    /// Handles one delivered broker message.
    ///
    /// An unmatched topic is logged and dropped; that is a normal outcome,
    /// since many broker messages have no notification target configured.
    /// Dispatch failures are logged here and never propagate to the caller.
    pub async fn on_message(&self, topic: &str, payload: &[u8]) {
        let Some(mapping) = self.registry.find_mapping(topic) else {
            warn!("no configuration found for topic {topic}");
            return;
        };
        debug!("found configuration for {topic}");
        if let Err(err) = self.dispatch(payload, mapping).await {
            error!("dropping message on {topic}: {err}");
        }
    }

    /// Builds and submits the notification for one matched message.
    async fn dispatch(
        &self,
        payload: &[u8],
        mapping: &TopicMapping,
    ) -> Result<(), DispatchError> {
        #[derive(Deserialize)]
        struct Payload {
            notification: String,
        }

        // Lossy decode: malformed byte sequences become replacement
        // characters instead of failing; the JSON parse below decides
        // whether the result is usable.
        let text = String::from_utf8_lossy(payload);
        let payload: Payload = serde_json::from_str(&text)?;
        debug!("sending notification to ntfy: {}", payload.notification);

        let options = &mapping.ntfy.options;
        let notification = Notification {
            destination: mapping.ntfy.topic.clone(),
            body: payload.notification,
            title: options.title.clone(),
            priority: options.priority,
            tags: options.tags.join(","),
        };

        self.notifier
            .send(&notification)
            .await
            .map_err(|cause| DispatchError::Transport {
                destination: notification.destination.clone(),
                cause,
            })?;
        info!("notification sent to ntfy topic {}", notification.destination);
        Ok(())
    }
}
