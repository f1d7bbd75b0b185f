//! Application configuration.

use std::path::Path;

use anyhow::Context;
use auth_dispatcher::AuthDispatcherConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Environment variable prefix. `DISCODOVE_AUTH__AUTH_TIMEOUT=5s` sets
/// `auth.auth_timeout`.
pub const ENV_PREFIX: &str = "DISCODOVE_";

/// Top-level configuration of the `discodove-auth` binary.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub auth: AuthDispatcherConfig,
}

impl AppConfig {
    /// Layers built-in defaults, the YAML file at `path`, and the environment.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Fails if `path` does not exist or any layer holds invalid values.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            anyhow::ensure!(
                path.is_file(),
                "config file '{}' does not exist",
                path.display()
            );
        }
        Self::figment(path)
            .extract()
            .context("invalid configuration")
    }
}
