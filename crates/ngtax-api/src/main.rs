//! # ngtax-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the tax rate engine.
//! Binds to configurable port (default 8080).

use std::sync::Arc;

use ngtax_api::state::{AppConfig, AppState};
use ngtax_authority::{AuthorityConfig, AuthorityConfigError, HttpRateAuthority};
use ngtax_overrides::{EngineConfig, TaxEngine};
use ngtax_rates::load_base_rates;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let engine_config = EngineConfig::from_env().map_err(|e| {
        tracing::error!("Engine configuration invalid: {e}");
        e
    })?;

    // Panics if the compiled-in table violates its own invariants.
    let base = load_base_rates();

    let engine = match AuthorityConfig::from_env() {
        Ok(authority_config) => {
            let authority = HttpRateAuthority::new(authority_config).map_err(|e| {
                tracing::error!("Failed to create rate authority client: {e}");
                e
            })?;
            tracing::info!(endpoint = %authority.endpoint(), "rate authority configured");
            TaxEngine::with_authority(base, engine_config, Arc::new(authority))
        }
        Err(AuthorityConfigError::NotConfigured) => {
            tracing::warn!("NGTAX_AUTHORITY_URL not set; serving base rates and admin overrides only");
            TaxEngine::new(base, engine_config)
        }
        Err(e) => {
            tracing::error!("Rate authority configuration invalid: {e}");
            return Err(e.into());
        }
    };

    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; administrative routes are unauthenticated");
    }

    let port = config.port;
    let state = AppState::with_engine(Arc::new(engine), config);
    let app = ngtax_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("ngtax API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
