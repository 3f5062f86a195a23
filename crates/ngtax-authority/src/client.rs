//! HTTP implementation of [`RateAuthority`].
//!
//! Calls `GET {base_url}/v1/rate-overrides` and decodes the
//! [`RemoteOverrides`] payload. Every failure is mapped onto
//! [`RefreshTransportError`] so the refresh cache can back off uniformly.

use async_trait::async_trait;
use ngtax_core::RefreshTransportError;
use ngtax_overrides::{RateAuthority, RemoteOverrides};
use url::Url;

use crate::config::{AuthorityConfig, AuthorityConfigError};

/// Upper bound on error bodies carried in [`RefreshTransportError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Rate authority reached over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpRateAuthority {
    http: reqwest::Client,
    endpoint: Url,
    timeout_ms: u64,
}

impl HttpRateAuthority {
    /// Build a client from configuration.
    pub fn new(config: AuthorityConfig) -> Result<Self, AuthorityConfigError> {
        let endpoint = config.overrides_url()?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = &config.api_token {
            let mut value =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|_| AuthorityConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AuthorityConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            timeout_ms: u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// The URL this client fetches.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> RefreshTransportError {
        if e.is_timeout() {
            RefreshTransportError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            RefreshTransportError::Http {
                endpoint: self.endpoint.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl RateAuthority for HttpRateAuthority {
    async fn fetch_overrides(&self) -> Result<RemoteOverrides, RefreshTransportError> {
        tracing::debug!(endpoint = %self.endpoint, "fetching rate overrides");
        let resp = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(RefreshTransportError::Status {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        let payload: RemoteOverrides =
            serde_json::from_slice(&bytes).map_err(|e| RefreshTransportError::Malformed {
                endpoint: self.endpoint.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(
            endpoint = %self.endpoint,
            deltas = payload.deltas.len(),
            source_timestamp = %payload.source_timestamp,
            "rate overrides fetched"
        );
        Ok(payload)
    }

    fn authority_name(&self) -> &str {
        self.endpoint
            .host_str()
            .unwrap_or("HttpRateAuthority")
    }
}
