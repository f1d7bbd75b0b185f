//! Plugin API trait for authenticator implementations.
//!
//! Plugins implement this trait to verify credentials. The dispatcher
//! initializes each configured plugin once at startup, caches the methods it
//! declares, and routes authentication calls to the first plugin declaring
//! the requested method.

use async_trait::async_trait;

use crate::context::PluginContext;
use crate::error::{AuthPluginError, InitializationError};
use crate::models::{AuthMethod, Credentials};
use crate::sasl::{self, SaslConversation};

/// Plugin API trait for authenticator implementations.
///
/// Expect many concurrent calls of the `auth_*` methods. The dispatcher does
/// not pool or scale plugins; a plugin talking to a slow backend should
/// manage its own connections and workers.
#[async_trait]
pub trait AuthPlugin: Send + Sync {
    /// Called once when the plugin is loaded, before any dispatch traffic.
    ///
    /// Set up connection pools, worker tasks, and the like here. Log through
    /// [`PluginContext::span`] so messages carry the process and plugin name.
    ///
    /// # Errors
    ///
    /// Any error excludes the plugin from dispatch.
    async fn initialize(&self, ctx: &PluginContext) -> Result<(), InitializationError>;

    /// Methods this plugin services, e.g. `[UsernameAndPassword, SaslPlain]`.
    ///
    /// Queried once after a successful `initialize`; later changes are ignored.
    /// Declaring `UsernameAndPassword` also makes the plugin available for
    /// `SaslLogin`. `SaslPlain` must be declared explicitly.
    fn implements(&self) -> Vec<AuthMethod>;

    /// Verifies a username and password and returns the user the session is for.
    ///
    /// When `credentials.authzid()` is set and differs from the authcid, the
    /// plugin decides whether the authcid may act as the authzid and, if so,
    /// returns the authzid.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` for an unknown user or wrong password
    /// - `DelegationDenied` if the authcid may not act as the authzid
    /// - `BackendUnavailable` / `Internal` for backend failures
    async fn auth_basic_username_password(
        &self,
        credentials: &Credentials,
    ) -> Result<String, AuthPluginError>;

    /// Runs a SASL `LOGIN` exchange. Only called for plugins that declare
    /// `SaslLogin` explicitly.
    ///
    /// The default runs the standard exchange and checks the collected
    /// credentials with [`AuthPlugin::auth_basic_username_password`].
    ///
    /// # Errors
    ///
    /// `Sasl` when the exchange fails, otherwise as for the basic check.
    async fn auth_sasl_login(
        &self,
        channel: &mut dyn SaslConversation,
    ) -> Result<String, AuthPluginError> {
        let credentials = sasl::run_login_exchange(channel).await?;
        self.auth_basic_username_password(&credentials).await
    }

    /// Runs a SASL `PLAIN` exchange. Only called for plugins that declare
    /// `SaslPlain`.
    ///
    /// The default parses the RFC 4616 message and checks it with
    /// [`AuthPlugin::auth_basic_username_password`], authzid included.
    ///
    /// # Errors
    ///
    /// `Sasl` when the exchange fails, otherwise as for the basic check.
    async fn auth_sasl_plain(
        &self,
        channel: &mut dyn SaslConversation,
    ) -> Result<String, AuthPluginError> {
        let credentials = sasl::run_plain_exchange(channel).await?;
        self.auth_basic_username_password(&credentials).await
    }
}
