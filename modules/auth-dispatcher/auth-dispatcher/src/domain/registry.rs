//! Plugin registry: initialized plugins and their cached capability sets.

use std::fmt;
use std::sync::Arc;

use auth_dispatcher_sdk::{AuthMethod, AuthPlugin, PluginContext};
use tracing::{Instrument, info};

use super::error::DomainError;

/// Dense registration index of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginId(usize);

impl PluginId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A successfully initialized plugin.
pub struct RegisteredPlugin {
    id: PluginId,
    name: String,
    plugin: Arc<dyn AuthPlugin>,
    capabilities: Vec<AuthMethod>,
    span: tracing::Span,
}

impl RegisteredPlugin {
    #[must_use]
    pub fn id(&self) -> PluginId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn plugin(&self) -> &Arc<dyn AuthPlugin> {
        &self.plugin
    }

    /// Declared methods, deduplicated and in method order.
    #[must_use]
    pub fn capabilities(&self) -> &[AuthMethod] {
        &self.capabilities
    }

    #[must_use]
    pub fn declares(&self, method: AuthMethod) -> bool {
        self.capabilities.contains(&method)
    }

    /// Span plugin calls run in.
    #[must_use]
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Plugins in registration order.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<RegisteredPlugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes `plugin` and adds it to the registry.
    ///
    /// The plugin's declared methods are read once, right after a successful
    /// initialization, and cached for the lifetime of the registry.
    ///
    /// # Errors
    ///
    /// - `DuplicatePlugin` if a plugin with the same name is registered
    /// - `Initialization` if the plugin's `initialize` fails; the plugin is
    ///   not added
    #[tracing::instrument(skip_all, fields(plugin = %ctx.plugin_name()))]
    pub async fn register(
        &mut self,
        plugin: Arc<dyn AuthPlugin>,
        ctx: &PluginContext,
    ) -> Result<PluginId, DomainError> {
        let name = ctx.plugin_name();
        if self.plugins.iter().any(|p| p.name == name) {
            return Err(DomainError::DuplicatePlugin(name.to_owned()));
        }

        let span = ctx.span();
        plugin
            .initialize(ctx)
            .instrument(span.clone())
            .await
            .map_err(|source| DomainError::Initialization {
                plugin: name.to_owned(),
                source,
            })?;

        let mut capabilities = plugin.implements();
        capabilities.sort_unstable();
        capabilities.dedup();

        let id = PluginId(self.plugins.len());
        info!(
            plugin_id = %id,
            capabilities = ?capabilities,
            "Registered auth plugin"
        );

        self.plugins.push(Arc::new(RegisteredPlugin {
            id,
            name: name.to_owned(),
            plugin,
            capabilities,
            span,
        }));
        Ok(id)
    }

    /// Cached capability set of a registered plugin.
    #[must_use]
    pub fn capabilities(&self, id: PluginId) -> Option<&[AuthMethod]> {
        self.plugins.get(id.0).map(|p| p.capabilities())
    }

    #[must_use]
    pub fn get(&self, id: PluginId) -> Option<&Arc<RegisteredPlugin>> {
        self.plugins.get(id.0)
    }

    /// Registered plugins in registration order.
    #[must_use]
    pub fn plugins(&self) -> &[Arc<RegisteredPlugin>] {
        &self.plugins
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
