//! Session binding: turns a plugin's answer into the session identity.

use auth_dispatcher_sdk::{AuthMethod, AuthOutcome, Credentials};
use tracing::{debug, warn};

use super::error::DomainError;

/// Resolves the identity the session runs as.
///
/// The plugin has already validated any delegation from `claimed.authcid` to
/// `claimed.authzid`; the identity it returns is taken verbatim.
///
/// # Errors
///
/// `EmptyIdentity` if the plugin returned an empty string.
pub fn bind(
    plugin: &str,
    claimed: Option<&Credentials>,
    identity: String,
) -> Result<String, DomainError> {
    if identity.is_empty() {
        return Err(DomainError::EmptyIdentity(plugin.to_owned()));
    }

    if let Some(credentials) = claimed.filter(|c| c.is_delegated()) {
        debug!(
            plugin,
            authcid = credentials.authcid(),
            authzid = credentials.authzid(),
            authed_user = %identity,
            "Delegated session"
        );
    }

    Ok(identity)
}

/// Collapses a dispatch result into the outcome the caller sees.
///
/// The cause of a failure is logged here and goes no further.
#[must_use]
pub fn into_outcome(method: AuthMethod, result: Result<String, DomainError>) -> AuthOutcome {
    match result {
        Ok(authed_user) => AuthOutcome::ok(authed_user),
        Err(e) => {
            warn!(%method, error = %e, "Authentication failed");
            AuthOutcome::Fail
        }
    }
}
