//! Configuration for the static auth plugin.

use auth_dispatcher_sdk::AuthMethod;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Delegation target that lets an authcid act as any user.
pub const ANY_USER: &str = "*";

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticAuthPluginConfig {
    /// Known users and their passwords.
    pub users: Vec<UserEntry>,

    /// Which authcids may open sessions as which other users.
    pub delegations: Vec<Delegation>,

    /// Methods the plugin declares to the dispatcher.
    pub methods: Vec<AuthMethod>,
}

impl Default for StaticAuthPluginConfig {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            delegations: Vec::new(),
            methods: vec![AuthMethod::UsernameAndPassword],
        }
    }
}

/// One user of the static table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    pub username: String,
    #[serde(deserialize_with = "secret_string")]
    pub password: SecretString,
}

/// Users `authcid` may act as. `"*"` allows anyone.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Delegation {
    pub authcid: String,
    pub may_act_as: Vec<String>,
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
