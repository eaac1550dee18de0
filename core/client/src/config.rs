//! Transport configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use nexushub_common::{Error, Result};

/// Default API base path.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Configuration for [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Versioned API base URL, without trailing slash.
    pub base_url: String,
    /// Timeout applied to every request, in milliseconds.
    pub timeout_ms: u64,
    /// Timeout for object-storage uploads, in milliseconds.
    pub upload_timeout_ms: u64,
    /// User agent sent with each request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = duration_ms(timeout);
        self
    }

    /// Set the upload timeout.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    /// Validate the base URL and return it normalized (no trailing slash).
    ///
    /// # Errors
    /// - Base URL does not parse
    /// - Scheme is not http or https
    pub fn normalized_base_url(&self) -> Result<String> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            Error::Config(format!("Invalid API base URL '{}': {}", self.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(self.base_url.trim_end_matches('/').to_string())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
            upload_timeout_ms: 60_000,
            user_agent: format!("NexusHub/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Whole milliseconds, rounding sub-millisecond remainders up.
fn duration_ms(timeout: Duration) -> u64 {
    let ms = timeout.as_millis() + u128::from(timeout.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(ms).unwrap_or(u64::MAX)
}
