//! Domain layer for the auth dispatcher.

pub mod capability_index;
pub mod error;
pub mod local_client;
pub mod registry;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use capability_index::{CapabilityIndex, Candidate};
pub use error::DomainError;
pub use local_client::AuthDispatcherLocalClient;
pub use registry::{PluginId, PluginRegistry, RegisteredPlugin};
pub use service::Service;
