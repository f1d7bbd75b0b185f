//! Capability index: which plugins service which method.

use std::collections::BTreeMap;
use std::sync::Arc;

use auth_dispatcher_sdk::AuthMethod;

use super::registry::{PluginRegistry, RegisteredPlugin};

/// A plugin listed under a method.
#[derive(Debug, Clone)]
pub struct Candidate {
    plugin: Arc<RegisteredPlugin>,
    derived: bool,
}

impl Candidate {
    #[must_use]
    pub fn plugin(&self) -> &Arc<RegisteredPlugin> {
        &self.plugin
    }

    /// True when the plugin is listed only because it declared
    /// `UsernameAndPassword`; the dispatcher then runs the SASL `LOGIN`
    /// exchange itself.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        self.derived
    }
}

/// Immutable method-to-plugins map, built once from the registry.
///
/// Candidates are kept in registration order so selection is deterministic.
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    by_method: BTreeMap<AuthMethod, Vec<Candidate>>,
}

impl CapabilityIndex {
    #[must_use]
    pub fn build(registry: &PluginRegistry) -> Self {
        let mut by_method: BTreeMap<AuthMethod, Vec<Candidate>> = BTreeMap::new();

        for plugin in registry.plugins() {
            for &method in plugin.capabilities() {
                by_method.entry(method).or_default().push(Candidate {
                    plugin: Arc::clone(plugin),
                    derived: false,
                });
            }

            // Username/password support implies SASL LOGIN, never SASL PLAIN.
            if plugin.declares(AuthMethod::UsernameAndPassword)
                && !plugin.declares(AuthMethod::SaslLogin)
            {
                by_method
                    .entry(AuthMethod::SaslLogin)
                    .or_default()
                    .push(Candidate {
                        plugin: Arc::clone(plugin),
                        derived: true,
                    });
            }
        }

        Self { by_method }
    }

    /// Plugins servicing `method`, in registration order. Possibly empty.
    #[must_use]
    pub fn plugins_for(&self, method: AuthMethod) -> &[Candidate] {
        self.by_method.get(&method).map_or(&[], Vec::as_slice)
    }

    /// The plugin every request for `method` goes to.
    #[must_use]
    pub fn first_for(&self, method: AuthMethod) -> Option<&Candidate> {
        self.plugins_for(method).first()
    }

    #[must_use]
    pub fn implements(&self, method: AuthMethod) -> bool {
        !self.plugins_for(method).is_empty()
    }

    /// Every method with at least one plugin, in method order, without duplicates.
    #[must_use]
    pub fn methods(&self) -> Vec<AuthMethod> {
        self.by_method
            .iter()
            .filter(|(_, candidates)| !candidates.is_empty())
            .map(|(method, _)| *method)
            .collect()
    }
}
