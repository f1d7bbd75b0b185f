//! Configuration for the auth dispatcher.

use std::time::Duration;

use auth_dispatcher_sdk::LogFacility;
use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// Configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthDispatcherConfig {
    /// Process name handed to plugins; they prefix their log lines with it.
    pub process_name: String,

    /// Syslog facility plugins should log under.
    pub log_facility: LogFacility,

    /// Upper bound on a single plugin call unless the request sets its own deadline.
    #[serde(with = "humantime_duration")]
    pub auth_timeout: Duration,

    /// Capacity of the auth request channel.
    pub queue_capacity: usize,

    /// Plugins to load, in registration order. The first plugin declaring a
    /// method services every request for it.
    pub plugins: Vec<PluginEntry>,
}

impl Default for AuthDispatcherConfig {
    fn default() -> Self {
        Self {
            process_name: "discodove".to_owned(),
            log_facility: LogFacility::Mail,
            auth_timeout: Duration::from_secs(30),
            queue_capacity: 1024,
            plugins: Vec::new(),
        }
    }
}

/// One configured plugin.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginEntry {
    /// Name the plugin factory was registered under, e.g. `static`.
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Plugin-specific section, passed through untouched.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl PluginEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            config,
        }
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
