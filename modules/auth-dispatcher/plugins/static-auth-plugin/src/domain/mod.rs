//! Domain layer for the static auth plugin.

pub mod service;

pub use service::Service;
