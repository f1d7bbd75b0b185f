#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static Auth Plugin
//!
//! This plugin checks credentials against a user table from configuration.
//! Meant for development and tests; passwords are stored in clear text.
//!
//! ## Configuration
//!
//! ```yaml
//! auth:
//!   plugins:
//!     - name: static
//!       config:
//!         users:
//!           - username: alice
//!             password: secret
//!         delegations:
//!           - authcid: admin
//!             may_act_as: ["*"]
//!         methods: [username_and_password, sasl_plain]
//! ```

pub mod config;
pub mod domain;
pub mod module;

pub use module::StaticAuthPlugin;
