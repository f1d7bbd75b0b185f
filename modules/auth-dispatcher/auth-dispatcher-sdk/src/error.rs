//! Error types for the auth dispatcher contract.

use thiserror::Error;

use crate::models::AuthMethod;

/// Errors a plugin reports from `initialize`.
///
/// A plugin that fails to initialize is excluded from dispatch; the
/// process keeps running with the remaining plugins.
#[derive(Debug, Error)]
pub enum InitializationError {
    /// The plugin's configuration section is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A backend the plugin depends on could not be reached or set up.
    #[error("backend setup failed: {0}")]
    Backend(String),

    /// `initialize` was called more than once.
    #[error("plugin already initialized")]
    AlreadyInitialized,
}

/// Errors a plugin reports from an authentication call.
///
/// These never reach the requesting caller: the dispatcher logs them and
/// collapses every variant into a plain authentication failure.
#[derive(Debug, Error)]
pub enum AuthPluginError {
    /// Unknown user or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The authenticated identity may not act as the requested authzid.
    #[error("'{authcid}' may not act as '{authzid}'")]
    DelegationDenied { authcid: String, authzid: String },

    /// The plugin does not implement this method.
    #[error("method {0} is not supported by this plugin")]
    Unsupported(AuthMethod),

    /// The directory, database, or other backend is unreachable.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The SASL exchange with the client failed.
    #[error("sasl exchange failed: {0}")]
    Sasl(#[from] SaslError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while running a SASL exchange over a [`crate::SaslConversation`].
#[derive(Debug, Error)]
pub enum SaslError {
    /// The client cancelled the exchange with `*`.
    #[error("exchange aborted by client")]
    Aborted,

    /// The client response could not be decoded or parsed.
    #[error("malformed client response: {0}")]
    Malformed(String),

    /// The client sent a line longer than the exchange allows.
    #[error("client response exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why a response could not be posted to a caller's response channel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PostError {
    /// The caller's buffer is full; posting would block.
    #[error("response channel is full")]
    Full,

    /// The caller dropped its receiver.
    #[error("response channel is closed")]
    Closed,
}
