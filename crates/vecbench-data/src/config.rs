//! Backend connection parameters.

use std::fmt;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};

/// Environment variable holding the access token.
pub const ENV_TOKEN: &str = "ASTRA_TOKEN";
/// Environment variable holding the document API endpoint.
pub const ENV_API_ENDPOINT: &str = "ASTRA_API_ENDPOINT";

/// Connection parameters of a backend.
///
/// The document adapters need `api_endpoint`. The table adapter is built over
/// an injected [`VectorTable`](crate::VectorTable) handle and reads nothing
/// from here.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct DbConfig {
    /// Access token sent with every request.
    #[cfg_attr(
        feature = "config",
        arg(long = "astra-token", env = "ASTRA_TOKEN", default_value = "")
    )]
    #[serde(default)]
    pub token: String,

    /// Document API endpoint, e.g. `https://<db>-<region>.apps.astra.datastax.com`.
    #[cfg_attr(
        feature = "config",
        arg(long = "astra-api-endpoint", env = "ASTRA_API_ENDPOINT")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl DbConfig {
    /// Creates a configuration with only a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_endpoint: None,
        }
    }

    /// Reads the configuration from `ASTRA_TOKEN` and `ASTRA_API_ENDPOINT`.
    /// A missing token defaults to an empty string.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            token: var(ENV_TOKEN).unwrap_or_default(),
            api_endpoint: var(ENV_API_ENDPOINT),
        }
    }

    /// Sets the document API endpoint.
    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Returns the document API endpoint or an error naming the missing setting.
    pub fn require_api_endpoint(&self) -> VectorResult<&str> {
        self.api_endpoint.as_deref().ok_or_else(|| {
            VectorError::invalid_config(format!("{ENV_API_ENDPOINT} is not set"))
        })
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("token", &"[REDACTED]")
            .field("api_endpoint", &self.api_endpoint)
            .finish()
    }
}
