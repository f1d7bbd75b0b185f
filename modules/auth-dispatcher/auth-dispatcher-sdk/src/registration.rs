//! Link-time plugin discovery.
//!
//! Plugin crates submit a factory under a stable name; the dispatcher looks
//! factories up by the names listed in its configuration. A binary only has
//! to link the plugin crate for its factory to be found.

use std::sync::Arc;

use crate::plugin_api::AuthPlugin;

/// A named plugin factory collected at link time.
pub struct AuthPluginRegistration {
    name: &'static str,
    factory: fn() -> Arc<dyn AuthPlugin>,
}

impl AuthPluginRegistration {
    #[must_use]
    pub const fn new(name: &'static str, factory: fn() -> Arc<dyn AuthPlugin>) -> Self {
        Self { name, factory }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Creates a fresh, uninitialized plugin instance.
    #[must_use]
    pub fn instantiate(&self) -> Arc<dyn AuthPlugin> {
        (self.factory)()
    }
}

inventory::collect!(AuthPluginRegistration);

/// Registers a plugin factory for discovery by name.
///
/// ```ignore
/// fn create() -> Arc<dyn AuthPlugin> {
///     Arc::new(StaticAuthPlugin::default())
/// }
///
/// auth_dispatcher_sdk::submit_auth_plugin!("static", create);
/// ```
#[macro_export]
macro_rules! submit_auth_plugin {
    ($name:expr, $factory:expr) => {
        $crate::__inventory::submit! {
            $crate::AuthPluginRegistration::new($name, $factory)
        }
    };
}

/// All plugin factories linked into the current binary.
pub fn registered_plugins() -> impl Iterator<Item = &'static AuthPluginRegistration> {
    inventory::iter::<AuthPluginRegistration>.into_iter()
}

/// Looks up a linked plugin factory by name.
#[must_use]
pub fn find_registered_plugin(name: &str) -> Option<&'static AuthPluginRegistration> {
    registered_plugins().find(|registration| registration.name() == name)
}
