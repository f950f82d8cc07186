//! Configuration management for ntfy-bridge
//!
//! Two JSON documents are loaded at startup: the module configuration, which
//! carries the topic-to-notification mappings, and the device configuration,
//! which carries broker connection details and the device-wide logging
//! defaults. Both are loaded with `figment`; the module document can
//! additionally be overridden through `NTFY_BRIDGE_`-prefixed environment
//! variables.

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The module configuration document: what to listen for and where to send it.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModuleConfig {
    /// Module-level logging settings, merged over the device-level ones.
    #[serde(default)]
    pub logging: ModuleLoggingConfig,
    /// Base URL of the ntfy-compatible endpoint.
    #[serde(default = "default_ntfy_base_url")]
    pub ntfy_base_url: String,
    /// The topic-to-notification mappings, in priority order.
    #[serde(default)]
    pub mappings: Vec<TopicMapping>,
}

/// One association between an inbound MQTT topic and an ntfy destination.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TopicMapping {
    /// The MQTT topic to subscribe to. Matched exactly, case-sensitive.
    pub mqtt_topic: String,
    /// The notification destination and its display options.
    pub ntfy: NtfyTarget,
}

/// The ntfy destination for one mapping.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NtfyTarget {
    /// The ntfy topic (the path component of the destination URL).
    pub topic: String,
    /// Display options attached to every notification for this mapping.
    #[serde(default)]
    pub options: NtfyOptions,
}

/// Display options for outbound notifications.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NtfyOptions {
    /// Notification title. Omitted from the request when unset.
    #[serde(default)]
    pub title: Option<String>,
    /// ntfy priority (1-5). Omitted from the request when unset.
    #[serde(default = "default_priority")]
    pub priority: Option<u8>,
    /// Tags, sent comma-joined in load order.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for NtfyOptions {
    fn default() -> Self {
        Self {
            title: None,
            priority: default_priority(),
            tags: Vec::new(),
        }
    }
}

/// The device configuration document.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceFile {
    /// Device-wide logging defaults.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// The device identity and broker connection settings.
    pub device: DeviceConfig,
}

/// Device identity and broker connection settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    /// Device name, used as the MQTT client id.
    pub name: String,
    /// Broker connection settings.
    #[serde(default)]
    pub mqtt: MqttConfig,
}

/// MQTT broker connection settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MqttConfig {
    /// Whether the bridge should run at all. Disabled by default.
    #[serde(default)]
    pub enabled: bool,
    /// Broker hostname.
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    /// Broker port.
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_mqtt_host(),
            port: default_mqtt_port(),
        }
    }
}

/// Logging settings shared by both configuration documents.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug").
    pub level: Option<String>,
    /// Directory for log files. Logs go to stderr when unset.
    pub path: Option<PathBuf>,
    /// Log file rotation settings.
    pub rotation: Option<RotationConfig>,
}

/// Log file rotation settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RotationConfig {
    /// Number of rotated log files to keep.
    pub keep: usize,
}

/// Module-level logging settings. Adds the log file name and inherits the
/// remaining fields from the device-level config via [`merge`].
///
/// [`merge`]: ModuleLoggingConfig::merge
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ModuleLoggingConfig {
    /// Log file name prefix within the configured path.
    pub file: Option<String>,
    #[serde(flatten)]
    pub base: LoggingConfig,
}

impl ModuleLoggingConfig {
    /// Fills unset fields from the device-level logging config.
    ///
    /// A module field wins whenever it is present; it counts as unset only
    /// when absent from the document, never when falsy or empty.
    pub fn merge(&mut self, parent: &LoggingConfig) {
        if self.base.level.is_none() {
            self.base.level = parent.level.clone();
        }
        if self.base.path.is_none() {
            self.base.path = parent.path.clone();
        }
        if self.base.rotation.is_none() {
            self.base.rotation = parent.rotation.clone();
        }
    }
}

impl ModuleConfig {
    /// Loads the module configuration from the given JSON file, with
    /// environment-variable overrides applied on top.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!(
                "module configuration file not found: {}",
                path.display()
            );
        }
        Figment::new()
            .merge(Json::file(path))
            .merge(Env::prefixed("NTFY_BRIDGE_"))
            .extract()
            .with_context(|| {
                format!("invalid module configuration in {}", path.display())
            })
    }
}

impl DeviceFile {
    /// Loads the device configuration from the given JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!(
                "device configuration file not found: {}",
                path.display()
            );
        }
        Figment::new()
            .merge(Json::file(path))
            .extract()
            .with_context(|| {
                format!("invalid device configuration in {}", path.display())
            })
    }
}

fn default_ntfy_base_url() -> String {
    "https://ntfy.sh".to_string()
}

fn default_priority() -> Option<u8> {
    Some(3)
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn module_config_loads_mappings_in_order() {
        let file = write_config(
            r#"{
                "mappings": [
                    {"mqtt_topic": "sensor/1", "ntfy": {"topic": "sensor-1"}},
                    {"mqtt_topic": "sensor/2", "ntfy": {"topic": "sensor-2",
                        "options": {"title": "Sensor", "priority": 5, "tags": ["alert", "door"]}}}
                ]
            }"#,
        );

        let config = ModuleConfig::load(file.path()).unwrap();
        assert_eq!(config.ntfy_base_url, "https://ntfy.sh");
        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings[0].mqtt_topic, "sensor/1");
        assert_eq!(config.mappings[0].ntfy.topic, "sensor-1");
        // Options default when absent, with the default priority applied.
        assert_eq!(config.mappings[0].ntfy.options, NtfyOptions::default());
        assert_eq!(config.mappings[0].ntfy.options.priority, Some(3));

        let options = &config.mappings[1].ntfy.options;
        assert_eq!(options.title.as_deref(), Some("Sensor"));
        assert_eq!(options.priority, Some(5));
        assert_eq!(options.tags, vec!["alert", "door"]);
    }

    #[test]
    fn module_config_missing_file_is_an_error() {
        let result = ModuleConfig::load(Path::new("/nonexistent/configuration.json"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn device_config_applies_mqtt_defaults() {
        let file = write_config(r#"{"device": {"name": "bridge-01"}}"#);

        let config = DeviceFile::load(file.path()).unwrap();
        assert_eq!(config.device.name, "bridge-01");
        assert!(!config.device.mqtt.enabled);
        assert_eq!(config.device.mqtt.host, "localhost");
        assert_eq!(config.device.mqtt.port, 1883);
    }

    #[test]
    fn device_config_reads_broker_settings() {
        let file = write_config(
            r#"{
                "logging": {"level": "warn", "path": "/var/log/bridge"},
                "device": {"name": "bridge-01",
                    "mqtt": {"enabled": true, "host": "broker.lan", "port": 8883}}
            }"#,
        );

        let config = DeviceFile::load(file.path()).unwrap();
        assert!(config.device.mqtt.enabled);
        assert_eq!(config.device.mqtt.host, "broker.lan");
        assert_eq!(config.device.mqtt.port, 8883);
        assert_eq!(config.logging.level.as_deref(), Some("warn"));
    }

    #[test]
    fn logging_merge_prefers_module_fields() {
        let mut module = ModuleLoggingConfig {
            file: Some("bridge.log".to_string()),
            base: LoggingConfig {
                level: Some("debug".to_string()),
                path: None,
                rotation: None,
            },
        };
        let device = LoggingConfig {
            level: Some("info".to_string()),
            path: Some(PathBuf::from("/var/log/bridge")),
            rotation: Some(RotationConfig { keep: 5 }),
        };

        module.merge(&device);

        // Present module fields win; absent ones inherit.
        assert_eq!(module.base.level.as_deref(), Some("debug"));
        assert_eq!(module.base.path, Some(PathBuf::from("/var/log/bridge")));
        assert_eq!(module.base.rotation, Some(RotationConfig { keep: 5 }));
        assert_eq!(module.file.as_deref(), Some("bridge.log"));
    }

    #[test]
    fn logging_merge_treats_empty_string_as_set() {
        let mut module = ModuleLoggingConfig {
            file: None,
            base: LoggingConfig {
                level: Some(String::new()),
                path: None,
                rotation: None,
            },
        };
        let device = LoggingConfig {
            level: Some("info".to_string()),
            path: None,
            rotation: None,
        };

        module.merge(&device);

        // An empty string is still a present value, not an unset field.
        assert_eq!(module.base.level.as_deref(), Some(""));
    }
}
