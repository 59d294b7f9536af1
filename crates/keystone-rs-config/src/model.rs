//! Standard configuration shared by keystone services.
//!
//! Applications embed [`Common`] in their own config type with
//! `#[serde(flatten)]` so its keys stay at the top level.

use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Address the server listens on, e.g. `":9080"`. Defaults to `":8080"`.
    #[serde(default)]
    pub address: String,
}

/// Settings for common Google Cloud functionality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Google {
    /// GCP project ID.
    #[serde(default)]
    pub project: String,
    /// Default region development resources are deployed to.
    #[serde(default)]
    pub region: String,
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logging {
    /// One of `debug`, `info`, `warn`, `error`. Defaults to `info`.
    #[serde(default)]
    pub level: String,
    /// Emit one JSON object per line. Should be set in cloud deployments.
    #[serde(default)]
    pub json: bool,
}

/// Standard config blocks every service carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Common {
    /// `server.*` keys.
    #[serde(default)]
    pub server: Server,
    /// `google.*` keys.
    #[serde(default)]
    pub google: Google,
    /// `logging.*` keys.
    #[serde(default)]
    pub logging: Logging,
}
