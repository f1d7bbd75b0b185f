// Links every auth plugin crate so its factory is registered via inventory.
// Plugins are optional features; add new ones here and in Cargo.toml.
#![allow(unused_imports)]

#[cfg(feature = "static-auth")]
use static_auth_plugin as _;
