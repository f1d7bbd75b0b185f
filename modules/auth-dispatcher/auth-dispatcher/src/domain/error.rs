//! Domain errors for the auth dispatcher.

use std::time::Duration;

use auth_dispatcher_sdk::{AuthMethod, AuthPluginError, InitializationError, SaslError};

/// Internal domain errors.
///
/// None of these reach the caller of an authentication request; they are
/// logged and collapsed into `AuthOutcome::Fail`.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("plugin '{plugin}' failed to initialize: {source}")]
    Initialization {
        plugin: String,
        #[source]
        source: InitializationError,
    },

    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("no plugin implements {0}")]
    UnsupportedMethod(AuthMethod),

    #[error("payload does not fit method {0}")]
    PayloadMismatch(AuthMethod),

    #[error("plugin '{plugin}' rejected the request: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: AuthPluginError,
    },

    #[error("plugin '{plugin}' did not answer within {timeout:?}")]
    Timeout { plugin: String, timeout: Duration },

    #[error("plugin '{0}' panicked or was cancelled")]
    PluginAborted(String),

    #[error("plugin '{0}' returned an empty identity")]
    EmptyIdentity(String),
}

impl DomainError {
    pub(crate) fn plugin(plugin: &str, source: AuthPluginError) -> Self {
        Self::Plugin {
            plugin: plugin.to_owned(),
            source,
        }
    }

    pub(crate) fn sasl(plugin: &str, source: SaslError) -> Self {
        Self::plugin(plugin, AuthPluginError::Sasl(source))
    }
}
