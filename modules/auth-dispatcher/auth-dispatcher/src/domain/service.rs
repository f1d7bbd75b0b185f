//! Dispatch service: selects a plugin for each request and normalizes its answer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use auth_dispatcher_sdk::sasl;
use auth_dispatcher_sdk::{
    AuthMethod, AuthOutcome, AuthPayload, AuthRequest, AuthRequestKind, AuthResponse, Credentials,
};
use tracing::{Instrument, debug, warn};

use super::capability_index::CapabilityIndex;
use super::error::DomainError;
use super::registry::{PluginRegistry, RegisteredPlugin};
use super::session;

/// What a plugin call produced, before session binding.
struct PluginAnswer {
    identity: String,
    /// Credentials the client presented, when the dispatcher saw them.
    claimed: Option<Credentials>,
}

impl PluginAnswer {
    fn opaque(identity: String) -> Self {
        Self {
            identity,
            claimed: None,
        }
    }
}

/// Auth dispatcher service.
///
/// Immutable after construction; shared between the dispatch loop and the
/// local client.
pub struct Service {
    registry: PluginRegistry,
    index: CapabilityIndex,
    auth_timeout: Duration,
}

impl Service {
    /// Builds the capability index from an already populated registry.
    #[must_use]
    pub fn new(registry: PluginRegistry, auth_timeout: Duration) -> Self {
        let index = CapabilityIndex::build(&registry);
        Self {
            registry,
            index,
            auth_timeout,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    #[must_use]
    pub fn index(&self) -> &CapabilityIndex {
        &self.index
    }

    #[must_use]
    pub fn auth_timeout(&self) -> Duration {
        self.auth_timeout
    }

    /// Methods that can be offered to clients.
    #[must_use]
    pub fn implements(&self) -> Vec<AuthMethod> {
        self.index.methods()
    }

    #[must_use]
    pub fn implements_method(&self, method: AuthMethod) -> bool {
        self.index.implements(method)
    }

    /// Authenticates through the first plugin servicing `method`.
    ///
    /// `deadline` bounds the plugin call; the configured timeout applies
    /// when it is `None`.
    #[tracing::instrument(skip_all, fields(%method))]
    pub async fn perform_authentication(
        &self,
        method: AuthMethod,
        payload: AuthPayload,
        deadline: Option<Duration>,
    ) -> AuthOutcome {
        let timeout = deadline.unwrap_or(self.auth_timeout);
        let result = self.try_authenticate(method, payload, timeout).await;
        session::into_outcome(method, result)
    }

    async fn try_authenticate(
        &self,
        method: AuthMethod,
        payload: AuthPayload,
        timeout: Duration,
    ) -> Result<String, DomainError> {
        let candidate = self
            .index
            .first_for(method)
            .ok_or(DomainError::UnsupportedMethod(method))?;
        if !payload.suits(method) {
            return Err(DomainError::PayloadMismatch(method));
        }

        let registered = candidate.plugin();
        let derived = candidate.is_derived();
        debug!(plugin = registered.name(), derived, "Selected auth plugin");

        let plugin = Arc::clone(registered.plugin());
        let name = registered.name().to_owned();
        let call = async move {
            match (method, payload) {
                (AuthMethod::UsernameAndPassword, AuthPayload::Credentials(credentials)) => {
                    let identity = plugin
                        .auth_basic_username_password(&credentials)
                        .await
                        .map_err(|e| DomainError::plugin(&name, e))?;
                    Ok(PluginAnswer {
                        identity,
                        claimed: Some(credentials),
                    })
                }
                (AuthMethod::SaslLogin, AuthPayload::Channel(mut channel)) if derived => {
                    let credentials = sasl::run_login_exchange(channel.as_mut())
                        .await
                        .map_err(|e| DomainError::sasl(&name, e))?;
                    let identity = plugin
                        .auth_basic_username_password(&credentials)
                        .await
                        .map_err(|e| DomainError::plugin(&name, e))?;
                    Ok(PluginAnswer {
                        identity,
                        claimed: Some(credentials),
                    })
                }
                (AuthMethod::SaslLogin, AuthPayload::Channel(mut channel)) => plugin
                    .auth_sasl_login(channel.as_mut())
                    .await
                    .map(PluginAnswer::opaque)
                    .map_err(|e| DomainError::plugin(&name, e)),
                (AuthMethod::SaslPlain, AuthPayload::Channel(mut channel)) => plugin
                    .auth_sasl_plain(channel.as_mut())
                    .await
                    .map(PluginAnswer::opaque)
                    .map_err(|e| DomainError::plugin(&name, e)),
                (method, _) => Err(DomainError::PayloadMismatch(method)),
            }
        };

        let answer = call_plugin(registered, timeout, call).await?;
        session::bind(registered.name(), answer.claimed.as_ref(), answer.identity)
    }

    /// Answers one request on the auth channel.
    ///
    /// Exactly one response is built per request. If the caller's channel
    /// cannot take it right away, it is dropped with a warning.
    #[tracing::instrument(skip_all, fields(request_id = %request.id))]
    pub async fn handle(&self, request: AuthRequest) {
        let AuthRequest {
            id,
            kind,
            deadline,
            reply,
        } = request;

        let response = match kind {
            AuthRequestKind::QueryImplements => AuthResponse::Implements {
                request_id: id,
                methods: self.implements(),
            },
            AuthRequestKind::PerformAuthentication { method, payload } => {
                AuthResponse::Authentication {
                    request_id: id,
                    outcome: self
                        .perform_authentication(method, payload, deadline)
                        .await,
                }
            }
        };

        if let Err(e) = reply.post(response) {
            warn!(error = %e, "Dropped auth response");
        }
    }
}

/// Runs a plugin call on its own task, inside the plugin's span.
///
/// The task is aborted when `timeout` elapses. A panic in the plugin ends
/// only that task.
async fn call_plugin<F>(
    registered: &RegisteredPlugin,
    timeout: Duration,
    call: F,
) -> Result<PluginAnswer, DomainError>
where
    F: Future<Output = Result<PluginAnswer, DomainError>> + Send + 'static,
{
    let mut handle = tokio::spawn(call.instrument(registered.span().clone()));

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            if join_error.is_panic() {
                warn!(plugin = registered.name(), "Auth plugin panicked");
            }
            Err(DomainError::PluginAborted(registered.name().to_owned()))
        }
        Err(_) => {
            handle.abort();
            Err(DomainError::Timeout {
                plugin: registered.name().to_owned(),
                timeout,
            })
        }
    }
}
