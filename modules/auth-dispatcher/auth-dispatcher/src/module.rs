//! Auth dispatcher module.

use std::sync::{Arc, OnceLock};

use anyhow::Context;
use auth_dispatcher_sdk::{
    AuthPlugin, AuthRequest, PluginConfig, PluginContext, find_registered_plugin,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use crate::config::AuthDispatcherConfig;
use crate::domain::{AuthDispatcherLocalClient, PluginRegistry, Service};

/// Auth dispatcher.
///
/// This module:
/// 1. Instantiates the configured plugins, in configuration order
/// 2. Initializes each one and caches its declared methods
/// 3. Serves authentication requests through the auth channel and the
///    local client
///
/// Plugins are taken from instances supplied with [`AuthDispatcher::with_plugin`]
/// first, then from factories linked into the binary.
pub struct AuthDispatcher {
    config: AuthDispatcherConfig,
    root_config: Option<Value>,
    supplied: Vec<(String, Arc<dyn AuthPlugin>)>,
    service: OnceLock<Arc<Service>>,
}

impl AuthDispatcher {
    #[must_use]
    pub fn new(config: AuthDispatcherConfig) -> Self {
        Self {
            config,
            root_config: None,
            supplied: Vec::new(),
            service: OnceLock::new(),
        }
    }

    /// Sets the configuration tree plugins see through [`PluginConfig::root`].
    ///
    /// Hosts pass their whole configuration here. Without it, plugins see the
    /// dispatcher's own configuration.
    #[must_use]
    pub fn with_root_config(mut self, root: Value) -> Self {
        self.root_config = Some(root);
        self
    }

    /// Supplies a plugin instance under `name`.
    ///
    /// A matching entry in `plugins` decides its position and configuration.
    /// Without one, the plugin is registered after all configured plugins
    /// with an empty configuration section.
    #[must_use]
    pub fn with_plugin(mut self, name: impl Into<String>, plugin: Arc<dyn AuthPlugin>) -> Self {
        self.supplied.push((name.into(), plugin));
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthDispatcherConfig {
        &self.config
    }

    /// Loads and initializes every plugin, then builds the dispatch service.
    ///
    /// A plugin that is unknown or fails to initialize is logged and left
    /// out; the dispatcher still starts.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be exposed to plugins or if called
    /// twice.
    #[tracing::instrument(skip_all, fields(process = %self.config.process_name))]
    pub async fn init(&self) -> anyhow::Result<Arc<Service>> {
        info!(
            plugins = self.config.plugins.len(),
            supplied = self.supplied.len(),
            "Initializing auth dispatcher"
        );

        let root = Arc::new(match &self.root_config {
            Some(root) => root.clone(),
            None => serde_json::to_value(&self.config)
                .context("failed to serialize dispatcher config")?,
        });
        let mut registry = PluginRegistry::new();
        let mut claimed = vec![false; self.supplied.len()];

        for entry in &self.config.plugins {
            let supplied = self
                .supplied
                .iter()
                .enumerate()
                .find(|(i, (name, _))| !claimed[*i] && *name == entry.name);
            if let Some((i, _)) = supplied {
                claimed[i] = true;
            }

            if !entry.enabled {
                info!(plugin = %entry.name, "Auth plugin disabled");
                continue;
            }

            let plugin = match supplied {
                Some((_, (_, plugin))) => Arc::clone(plugin),
                None => match find_registered_plugin(&entry.name) {
                    Some(registration) => registration.instantiate(),
                    None => {
                        warn!(plugin = %entry.name, "Unknown auth plugin, skipping");
                        continue;
                    }
                },
            };

            self.register(&mut registry, &entry.name, plugin, entry.config.clone(), &root)
                .await;
        }

        for ((name, plugin), _) in self
            .supplied
            .iter()
            .zip(&claimed)
            .filter(|(_, claimed)| !**claimed)
        {
            self.register(&mut registry, name, Arc::clone(plugin), Value::Null, &root)
                .await;
        }

        if registry.is_empty() {
            warn!("No auth plugins registered; every authentication will fail");
        }

        let svc = Arc::new(Service::new(registry, self.config.auth_timeout));
        info!(
            plugins = svc.registry().len(),
            methods = ?svc.implements(),
            "Auth dispatcher initialized"
        );

        self.service
            .set(Arc::clone(&svc))
            .map_err(|_| anyhow::anyhow!("Service already initialized"))?;

        Ok(svc)
    }

    async fn register(
        &self,
        registry: &mut PluginRegistry,
        name: &str,
        plugin: Arc<dyn AuthPlugin>,
        section: Value,
        root: &Arc<Value>,
    ) {
        let ctx = PluginContext::new(
            self.config.process_name.clone(),
            name,
            self.config.log_facility,
            PluginConfig::new(section, Arc::clone(root)),
        );
        if let Err(e) = registry.register(plugin, &ctx).await {
            error!(plugin = name, error = %e, "Auth plugin excluded from dispatch");
        }
    }

    /// The service built by [`AuthDispatcher::init`], if it ran.
    #[must_use]
    pub fn service(&self) -> Option<&Arc<Service>> {
        self.service.get()
    }

    /// Initializes the dispatcher and starts the dispatch loop.
    ///
    /// # Errors
    ///
    /// Propagates [`AuthDispatcher::init`] failures.
    pub async fn start(self) -> anyhow::Result<AuthDispatcherHandle> {
        let svc = match self.service.get() {
            Some(svc) => Arc::clone(svc),
            None => self.init().await?,
        };

        let (sender, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_dispatch_loop(
            Arc::clone(&svc),
            receiver,
            cancel.clone(),
        ));

        Ok(AuthDispatcherHandle {
            sender,
            client: AuthDispatcherLocalClient::new(Arc::clone(&svc)),
            service: svc,
            cancel,
            task,
        })
    }
}

/// Receives requests until cancelled or until every sender is gone.
///
/// Each request runs on its own task so a slow plugin never holds up the
/// rest of the queue. On cancellation the channel is closed and requests
/// already queued are still answered.
async fn run_dispatch_loop(
    svc: Arc<Service>,
    mut receiver: mpsc::Receiver<AuthRequest>,
    cancel: CancellationToken,
) {
    info!("Auth dispatch loop started");
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                info!("Auth dispatch loop shutting down (cancellation)");
                receiver.close();
                let mut drained = 0usize;
                while let Some(request) = receiver.recv().await {
                    dispatch(&svc, request);
                    drained += 1;
                }
                if drained > 0 {
                    info!(drained, "Answered queued auth requests");
                }
                break;
            }
            request = receiver.recv() => {
                let Some(request) = request else {
                    info!("Auth channel closed, dispatch loop exiting");
                    break;
                };
                dispatch(&svc, request);
            }
        }
    }
}

fn dispatch(svc: &Arc<Service>, request: AuthRequest) {
    debug!(request_id = %request.id, "Auth request received");
    let svc = Arc::clone(svc);
    tokio::spawn(async move { svc.handle(request).await }.in_current_span());
}

/// A running dispatcher.
pub struct AuthDispatcherHandle {
    sender: mpsc::Sender<AuthRequest>,
    client: AuthDispatcherLocalClient,
    service: Arc<Service>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AuthDispatcherHandle {
    /// A sender for the auth channel. The loop keeps running while any
    /// clone of it, including the handle's own, is alive.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<AuthRequest> {
        self.sender.clone()
    }

    /// In-process client sharing the loop's dispatch rules.
    #[must_use]
    pub fn client(&self) -> AuthDispatcherLocalClient {
        self.client.clone()
    }

    #[must_use]
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Stops the dispatch loop and waits for it to exit.
    ///
    /// New requests are refused. Requests already in the channel or picked
    /// up finish on their own tasks and still get their response.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Auth dispatch loop ended abnormally");
        }
    }
}
