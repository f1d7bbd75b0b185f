//! Auth Dispatcher
//!
//! Loads the configured authentication plugins, indexes the methods each one
//! declares, and routes every authentication request to the first plugin
//! servicing the requested method.
//!
//! Callers reach the dispatcher through the auth channel returned by
//! [`AuthDispatcherHandle::sender`] or through the in-process
//! [`AuthDispatcherLocalClient`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod module;

pub use config::{AuthDispatcherConfig, PluginEntry};
pub use domain::{AuthDispatcherLocalClient, DomainError, Service};
pub use module::{AuthDispatcher, AuthDispatcherHandle};
