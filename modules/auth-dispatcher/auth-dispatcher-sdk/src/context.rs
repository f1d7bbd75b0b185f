//! Everything a plugin receives when it is initialized.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InitializationError;

/// Syslog facility a plugin should log under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFacility {
    User,
    #[default]
    Mail,
    Daemon,
    Auth,
    #[serde(alias = "auth_priv")]
    AuthPriv,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

impl LogFacility {
    /// Facility code as defined by RFC 5424.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::User => 1,
            Self::Mail => 2,
            Self::Daemon => 3,
            Self::Auth => 4,
            Self::AuthPriv => 10,
            Self::Local0 => 16,
            Self::Local1 => 17,
            Self::Local2 => 18,
            Self::Local3 => 19,
            Self::Local4 => 20,
            Self::Local5 => 21,
            Self::Local6 => 22,
            Self::Local7 => 23,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Mail => "mail",
            Self::Daemon => "daemon",
            Self::Auth => "auth",
            Self::AuthPriv => "authpriv",
            Self::Local0 => "local0",
            Self::Local1 => "local1",
            Self::Local2 => "local2",
            Self::Local3 => "local3",
            Self::Local4 => "local4",
            Self::Local5 => "local5",
            Self::Local6 => "local6",
            Self::Local7 => "local7",
        }
    }
}

impl fmt::Display for LogFacility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration view handed to a plugin.
///
/// `section` is the plugin's own `config` block; `root` is the whole
/// configuration tree, read-only, for plugins that need shared settings.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    section: Value,
    root: Arc<Value>,
}

impl PluginConfig {
    #[must_use]
    pub fn new(section: Value, root: Arc<Value>) -> Self {
        Self { section, root }
    }

    /// A view with no plugin section and an empty root.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Value::Null, Arc::new(Value::Null))
    }

    /// Deserializes the plugin section. A missing section deserializes as an
    /// empty map so `#[serde(default)]` structs get their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the section does not match `T`.
    pub fn config<T: DeserializeOwned>(&self) -> Result<T, InitializationError> {
        let section = if self.section.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            self.section.clone()
        };
        serde_json::from_value(section).map_err(|e| InitializationError::Config(e.to_string()))
    }

    /// Looks up a value in the plugin section by JSON pointer, e.g. `/users/0`.
    #[must_use]
    pub fn get(&self, pointer: &str) -> Option<&Value> {
        self.section.pointer(pointer)
    }

    #[must_use]
    pub fn section(&self) -> &Value {
        &self.section
    }

    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }
}

/// Initialization context for a plugin.
#[derive(Debug, Clone)]
pub struct PluginContext {
    process_name: String,
    plugin_name: String,
    log_facility: LogFacility,
    config: PluginConfig,
}

impl PluginContext {
    #[must_use]
    pub fn new(
        process_name: impl Into<String>,
        plugin_name: impl Into<String>,
        log_facility: LogFacility,
        config: PluginConfig,
    ) -> Self {
        Self {
            process_name: process_name.into(),
            plugin_name: plugin_name.into(),
            log_facility,
            config,
        }
    }

    /// Name of the host process, almost always `discodove`.
    #[must_use]
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Name the plugin was registered under.
    #[must_use]
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    #[must_use]
    pub fn log_facility(&self) -> LogFacility {
        self.log_facility
    }

    #[must_use]
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Span tagging everything a plugin logs with process, plugin and facility.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "auth_plugin",
            process = %self.process_name,
            plugin = %self.plugin_name,
            facility = %self.log_facility,
        )
    }
}
