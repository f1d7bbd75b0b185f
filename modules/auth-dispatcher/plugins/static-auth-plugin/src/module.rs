//! Static auth plugin module.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use auth_dispatcher_sdk::sasl::{self, SaslConversation};
use auth_dispatcher_sdk::{
    AuthMethod, AuthPlugin, AuthPluginError, Credentials, InitializationError, PluginContext,
};
use tracing::{info, warn};

use crate::config::StaticAuthPluginConfig;
use crate::domain::Service;

/// Static auth plugin.
///
/// Checks credentials against the user table in its configuration section.
/// Linked binaries find it under the name `static`.
#[derive(Default)]
pub struct StaticAuthPlugin {
    service: OnceLock<Arc<Service>>,
}

impl StaticAuthPlugin {
    fn service(&self) -> Result<&Arc<Service>, AuthPluginError> {
        self.service
            .get()
            .ok_or_else(|| AuthPluginError::Internal("plugin is not initialized".to_owned()))
    }
}

#[async_trait]
impl AuthPlugin for StaticAuthPlugin {
    async fn initialize(&self, ctx: &PluginContext) -> Result<(), InitializationError> {
        info!("Initializing static_auth_plugin");

        let cfg: StaticAuthPluginConfig = ctx.config().config()?;
        if cfg.users.is_empty() {
            warn!("Static auth plugin has no users; every check will fail");
        }

        info!(
            user_count = cfg.users.len(),
            delegation_count = cfg.delegations.len(),
            methods = ?cfg.methods,
            "Loaded plugin configuration"
        );

        self.service
            .set(Arc::new(Service::from_config(cfg)))
            .map_err(|_| InitializationError::AlreadyInitialized)?;

        Ok(())
    }

    fn implements(&self) -> Vec<AuthMethod> {
        self.service
            .get()
            .map(|svc| svc.methods().to_vec())
            .unwrap_or_default()
    }

    async fn auth_basic_username_password(
        &self,
        credentials: &Credentials,
    ) -> Result<String, AuthPluginError> {
        self.service()?.verify(credentials)
    }

    async fn auth_sasl_plain(
        &self,
        channel: &mut dyn SaslConversation,
    ) -> Result<String, AuthPluginError> {
        let svc = self.service()?;
        if !svc.methods().contains(&AuthMethod::SaslPlain) {
            return Err(AuthPluginError::Unsupported(AuthMethod::SaslPlain));
        }
        let credentials = sasl::run_plain_exchange(channel).await?;
        svc.verify(&credentials)
    }
}

fn create() -> Arc<dyn AuthPlugin> {
    Arc::new(StaticAuthPlugin::default())
}

auth_dispatcher_sdk::submit_auth_plugin!("static", create);
