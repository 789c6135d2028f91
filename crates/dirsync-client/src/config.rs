//! Directory API connection configuration.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{DirectoryError, DirectoryResult};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for one directory API endpoint.
///
/// Constructed once per reconciliation call and passed by reference; there
/// is no process-wide configuration singleton.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the API, e.g. `https://console.example.com/api/v2`.
    pub base_url: String,

    /// API key, sent as the `x-api-key` header on every request.
    pub api_key: SecretString,

    /// Optional organization scope, sent as `x-org-id` when present.
    #[serde(default)]
    pub org_id: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl DirectoryConfig {
    /// Create a configuration with default timeout and no org scope.
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            org_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Scope all requests to an organization.
    #[must_use]
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.base_url.is_empty() {
            return Err(DirectoryError::Config("base_url must not be empty".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(DirectoryError::Config(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        if self.api_key.expose_secret().is_empty() {
            return Err(DirectoryError::Config("api_key must not be empty".into()));
        }
        Ok(())
    }
}
