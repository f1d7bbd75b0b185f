//! Public API trait for the auth dispatcher.
//!
//! This trait is the in-process alternative to sending [`crate::AuthRequest`]
//! values down the auth channel. Both paths share the same dispatch rules.

use async_trait::async_trait;

use crate::models::{AuthMethod, AuthOutcome, AuthPayload};

/// Public API trait for the auth dispatcher.
///
/// ```ignore
/// let outcome = dispatcher
///     .authenticate(
///         AuthMethod::UsernameAndPassword,
///         AuthPayload::Credentials(Credentials::new("alice", "secret")),
///     )
///     .await;
/// if let Some(user) = outcome.authed_user() {
///     // start the session as `user`
/// }
/// ```
///
/// # Security
///
/// Failures carry no reason. Callers facing untrusted clients can forward
/// the outcome without leaking why authentication failed.
#[async_trait]
pub trait AuthDispatcherClient: Send + Sync {
    /// Methods that can be offered to clients, without duplicates.
    fn implements(&self) -> Vec<AuthMethod>;

    /// Whether `method` can be offered to clients.
    fn implements_method(&self, method: AuthMethod) -> bool {
        self.implements().contains(&method)
    }

    /// Authenticates through the first plugin servicing `method`.
    async fn authenticate(&self, method: AuthMethod, payload: AuthPayload) -> AuthOutcome;
}
