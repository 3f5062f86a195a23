//! Rate authority client configuration.
//!
//! Refresh is optional: without `NGTAX_AUTHORITY_URL` the engine runs on
//! the base table and administrative overrides only.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

/// Connection settings for the remote rate authority.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct AuthorityConfig {
    /// Base URL; the client calls `{base_url}/v1/rate-overrides`.
    pub base_url: Url,
    /// Bearer token, when the authority requires one.
    pub api_token: Option<Zeroizing<String>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AuthorityConfig {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Configuration for `base_url` with no token and the default timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_token: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `NGTAX_AUTHORITY_URL` (required; absent means refresh is disabled)
    /// - `NGTAX_AUTHORITY_TOKEN` (optional bearer token)
    /// - `NGTAX_AUTHORITY_TIMEOUT_SECS` (default: 5)
    pub fn from_env() -> Result<Self, AuthorityConfigError> {
        let raw = std::env::var("NGTAX_AUTHORITY_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthorityConfigError::NotConfigured)?;
        let base_url = Url::parse(raw.trim()).map_err(|e| {
            AuthorityConfigError::InvalidUrl("NGTAX_AUTHORITY_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            base_url,
            api_token: std::env::var("NGTAX_AUTHORITY_TOKEN")
                .ok()
                .filter(|s| !s.is_empty())
                .map(Zeroizing::new),
            timeout: std::env::var("NGTAX_AUTHORITY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Self::DEFAULT_TIMEOUT),
        })
    }

    /// The overrides endpoint under `base_url`.
    ///
    /// A base URL with a path prefix (`https://host/tax`) keeps the prefix.
    pub fn overrides_url(&self) -> Result<Url, AuthorityConfigError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("v1/rate-overrides")
            .map_err(|e| AuthorityConfigError::InvalidUrl(self.base_url.to_string(), e.to_string()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityConfigError {
    /// `NGTAX_AUTHORITY_URL` is not set.
    #[error("NGTAX_AUTHORITY_URL is not set; remote refresh disabled")]
    NotConfigured,
    /// A URL failed to parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    /// The token cannot be sent as a header value.
    #[error("NGTAX_AUTHORITY_TOKEN contains characters not allowed in a header")]
    InvalidToken,
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
