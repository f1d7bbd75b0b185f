//! Service implementation for the static auth plugin.

use std::collections::HashMap;

use auth_dispatcher_sdk::{AuthMethod, AuthPluginError, Credentials};
use secrecy::{ExposeSecret, SecretString};

use crate::config::{ANY_USER, StaticAuthPluginConfig};

/// Static user table.
///
/// Checks passwords against the configured users and resolves delegated
/// sessions from the delegation list.
pub struct Service {
    users: HashMap<String, SecretString>,
    delegations: HashMap<String, Vec<String>>,
    methods: Vec<AuthMethod>,
}

impl Service {
    /// Create a service from plugin configuration.
    #[must_use]
    pub fn from_config(cfg: StaticAuthPluginConfig) -> Self {
        let users = cfg
            .users
            .into_iter()
            .map(|user| (user.username, user.password))
            .collect();

        let mut delegations: HashMap<String, Vec<String>> = HashMap::new();
        for delegation in cfg.delegations {
            delegations
                .entry(delegation.authcid)
                .or_default()
                .extend(delegation.may_act_as);
        }

        Self {
            users,
            delegations,
            methods: cfg.methods,
        }
    }

    #[must_use]
    pub fn methods(&self) -> &[AuthMethod] {
        &self.methods
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Checks `credentials` and returns the user the session runs as.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` for an unknown user or a wrong password
    /// - `DelegationDenied` if the authcid may not act as the authzid
    pub fn verify(&self, credentials: &Credentials) -> Result<String, AuthPluginError> {
        let authcid = credentials.authcid();
        let stored = self
            .users
            .get(authcid)
            .ok_or(AuthPluginError::InvalidCredentials)?;
        if stored.expose_secret() != credentials.password().expose_secret() {
            return Err(AuthPluginError::InvalidCredentials);
        }

        match credentials.authzid() {
            Some(authzid) if authzid != authcid => {
                if self.may_act_as(authcid, authzid) {
                    Ok(authzid.to_owned())
                } else {
                    Err(AuthPluginError::DelegationDenied {
                        authcid: authcid.to_owned(),
                        authzid: authzid.to_owned(),
                    })
                }
            }
            _ => Ok(authcid.to_owned()),
        }
    }

    /// Whether `authcid` may open sessions as `authzid`.
    #[must_use]
    pub fn may_act_as(&self, authcid: &str, authzid: &str) -> bool {
        self.delegations.get(authcid).is_some_and(|targets| {
            targets
                .iter()
                .any(|target| target == ANY_USER || target == authzid)
        })
    }
}
