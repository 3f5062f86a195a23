//! # ngtax-api — Axum API Service
//!
//! HTTP surface of the Nigerian tax rate engine.
//!
//! ## Routes
//!
//! - `/v1/rates/*` — effective configuration, metadata, overrides, history
//! - `/v1/tax/*` — PIT, CIT, CGT, VAT and levy calculators
//! - `/health/*` — Kubernetes health probes
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer on everything; admin bearer authentication on the write
//! routes (`POST /v1/rates/overrides`, `POST /v1/rates/refresh`).
//!
//! ## Crate Policy
//!
//! No business logic in route handlers: they delegate to the
//! [`ngtax_overrides::TaxEngine`]. All errors map to structured HTTP
//! responses via [`AppError`].

pub mod auth;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let admin = routes::rates::admin_router()
        .layer(from_fn(auth::admin_auth_middleware))
        .layer(axum::Extension(auth_config));

    let api = Router::new()
        .merge(routes::rates::router())
        .merge(routes::tax::router())
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. The base table is validated before the router is
/// built, so a serving process is ready.
async fn readiness() -> &'static str {
    "ready"
}
