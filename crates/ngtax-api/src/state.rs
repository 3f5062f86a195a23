//! # Application State
//!
//! Shared state for the Axum application: the tax engine and server
//! configuration. Cloning is cheap; the engine is behind an `Arc`.

use std::sync::Arc;

use ngtax_overrides::{EngineConfig, TaxEngine};
use zeroize::Zeroizing;

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Admin bearer token for the write routes.
    /// If `None`, authentication is disabled.
    pub auth_token: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8080)
    /// - `AUTH_TOKEN` (optional admin bearer token)
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            auth_token: std::env::var("AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty())
                .map(Zeroizing::new),
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The rate engine.
    pub engine: Arc<TaxEngine>,
    /// Server configuration.
    pub config: AppConfig,
}

impl AppState {
    /// State over the compiled-in base table with no authority and auth disabled.
    pub fn new() -> Self {
        Self::with_engine(
            Arc::new(TaxEngine::with_base_rates(EngineConfig::default())),
            AppConfig::default(),
        )
    }

    /// State over an existing engine.
    pub fn with_engine(engine: Arc<TaxEngine>, config: AppConfig) -> Self {
        Self { engine, config }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
