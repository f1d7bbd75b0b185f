//! Auth Dispatcher SDK
//!
//! This crate provides the public contract of the discodove authentication
//! dispatcher:
//!
//! - [`AuthPlugin`] - Plugin API trait for authenticator implementations
//! - [`AuthDispatcherClient`] - Public API trait for consumers
//! - [`AuthRequest`] / [`AuthResponse`] - Messages exchanged over the auth channel
//! - [`AuthMethod`] - Supported authentication methods
//! - [`SaslConversation`] - Challenge/response handle for SASL exchanges
//! - [`PluginContext`] - Everything a plugin receives at initialization
//!
//! ## Usage
//!
//! Consumers send requests down the dispatcher's auth channel and wait on
//! their own response channel:
//!
//! ```ignore
//! use auth_dispatcher_sdk::{AuthMethod, AuthPayload, AuthRequest, Credentials, ResponseSink};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(1);
//! let request = AuthRequest::authenticate(
//!     AuthMethod::UsernameAndPassword,
//!     AuthPayload::Credentials(Credentials::new("alice", "secret")),
//!     ResponseSink::new(&tx),
//! );
//! auth_channel.send(request).await?;
//! let response = rx.recv().await;
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod context;
pub mod error;
pub mod models;
pub mod plugin_api;
pub mod registration;
pub mod sasl;

// Re-export main types at crate root
pub use api::AuthDispatcherClient;
pub use context::{LogFacility, PluginConfig, PluginContext};
pub use error::{AuthPluginError, InitializationError, PostError, SaslError};
pub use models::{
    AuthMethod, AuthOutcome, AuthPayload, AuthRequest, AuthRequestKind, AuthResponse,
    Credentials, ResponseSink,
};
pub use plugin_api::AuthPlugin;
pub use registration::{AuthPluginRegistration, find_registered_plugin, registered_plugins};
pub use sasl::{LineConversation, SaslChannel, SaslConversation};

#[doc(hidden)]
pub use inventory as __inventory;
