//! Read-only lookup from inbound MQTT topic to notification mapping.
//!
//! The registry is built once at startup from the module configuration and
//! never mutated afterwards, so it can be shared freely across tasks without
//! locking.

use crate::config::TopicMapping;

/// The ordered set of topic-to-notification mappings loaded at startup.
#[derive(Debug)]
pub struct Registry {
    mappings: Vec<TopicMapping>,
}

impl Registry {
    /// Creates a registry from the configured mappings, preserving load order.
    pub fn new(mappings: Vec<TopicMapping>) -> Self {
        Self { mappings }
    }

    /// Returns the mapping for `topic`, or `None` if the topic is not
    /// configured. An unmatched topic is a normal outcome, not an error.
    ///
    /// Matching is exact and case-sensitive, with no wildcard expansion.
    /// When several mappings share a topic, the first one in load order wins.
    pub fn find_mapping(&self, topic: &str) -> Option<&TopicMapping> {
        self.mappings.iter().find(|m| m.mqtt_topic == topic)
    }

    /// The topics to subscribe to, in registry order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.mqtt_topic.as_str())
    }

    /// Number of configured mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether the registry has no mappings at all.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
