//! Local (in-process) client for the auth dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use auth_dispatcher_sdk::{AuthDispatcherClient, AuthMethod, AuthOutcome, AuthPayload};

use super::Service;

/// Local client wrapping the service.
///
/// Handed out by the dispatcher handle for callers that live in the same
/// process and do not need the request channel.
#[derive(Clone)]
pub struct AuthDispatcherLocalClient {
    svc: Arc<Service>,
}

impl AuthDispatcherLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl AuthDispatcherClient for AuthDispatcherLocalClient {
    fn implements(&self) -> Vec<AuthMethod> {
        self.svc.implements()
    }

    fn implements_method(&self, method: AuthMethod) -> bool {
        self.svc.implements_method(method)
    }

    async fn authenticate(&self, method: AuthMethod, payload: AuthPayload) -> AuthOutcome {
        self.svc
            .perform_authentication(method, payload, None)
            .await
    }
}
