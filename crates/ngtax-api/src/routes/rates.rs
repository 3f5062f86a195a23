//! # Rate Configuration API
//!
//! - **GET `/v1/rates`** — effective configuration (base + overrides)
//! - **GET `/v1/rates/metadata`** — version summary and refresh state
//! - **GET `/v1/rates/overrides`** — current override snapshot
//! - **GET `/v1/rates/overrides/history`** — audit history, optionally `?path=`
//! - **POST `/v1/rates/overrides`** — administrative overrides (admin)
//! - **POST `/v1/rates/refresh`** — fetch from the rate authority now (admin)
//!
//! Administrative writes are all-or-nothing: one invalid entry rejects the
//! whole request and nothing is stored.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use ngtax_overrides::{EngineMetadata, OverridesView, RefreshOutcome};
use ngtax_rates::{EffectiveConfig, OverrideEntry, OverrideSnapshot, OverrideSource};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Longest accepted actor label.
const MAX_ACTOR_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Administrative override submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplyOverridesRequest {
    /// `path → value` mapping, e.g. `{"pitBands[0].rate": 0.05}`.
    pub overrides: BTreeMap<String, serde_json::Value>,
    /// Who is making the change, recorded in history.
    #[serde(default)]
    pub actor: Option<String>,
}

impl Validate for ApplyOverridesRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.overrides.is_empty() {
            return Err(AppError::Validation {
                field: Some("overrides".to_string()),
                message: "overrides must not be empty".to_string(),
            });
        }
        if let Some(actor) = &self.actor {
            if actor.trim().is_empty() || actor.len() > MAX_ACTOR_LEN {
                return Err(AppError::Validation {
                    field: Some("actor".to_string()),
                    message: format!("actor must be 1-{MAX_ACTOR_LEN} characters"),
                });
            }
        }
        Ok(())
    }
}

/// Query for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Restrict to one override path.
    pub path: Option<String>,
}

/// Audit history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    /// The path filter, when given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Entries, oldest first.
    pub entries: Vec<OverrideEntry>,
}

/// Result of a forced refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// What the refresh did.
    pub outcome: RefreshOutcome,
    /// Metadata after the refresh.
    pub metadata: EngineMetadata,
}

// ---------------------------------------------------------------------------
// Routers
// ---------------------------------------------------------------------------

/// Unauthenticated read routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/rates", get(get_rates))
        .route("/v1/rates/metadata", get(get_metadata))
        .route("/v1/rates/overrides", get(get_overrides))
        .route("/v1/rates/overrides/history", get(get_history))
}

/// Write routes; the caller layers admin authentication on top.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/v1/rates/overrides", post(apply_overrides))
        .route("/v1/rates/refresh", post(force_refresh))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /v1/rates
async fn get_rates(State(state): State<AppState>) -> Json<EffectiveConfig> {
    let config = state.engine.get_effective_config().await;
    Json(config.as_ref().clone())
}

/// GET /v1/rates/metadata
async fn get_metadata(State(state): State<AppState>) -> Json<EngineMetadata> {
    Json(state.engine.get_metadata())
}

/// GET /v1/rates/overrides
async fn get_overrides(State(state): State<AppState>) -> Json<OverrideSnapshot> {
    Json(state.engine.get_override_snapshot().as_ref().clone())
}

/// GET /v1/rates/overrides/history?path=
async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let entries = match query.path.as_deref() {
        Some(path) => state.engine.history_for(path)?,
        None => state.engine.history(),
    };
    Ok(Json(HistoryResponse {
        path: query.path,
        entries,
    }))
}

/// POST /v1/rates/overrides
async fn apply_overrides(
    State(state): State<AppState>,
    body: Result<Json<ApplyOverridesRequest>, JsonRejection>,
) -> Result<Json<OverridesView>, AppError> {
    let req = extract_validated_json(body)?;
    let view = state.engine.apply_overrides(
        &req.overrides,
        OverrideSource::Api,
        req.actor.as_deref().map(str::trim),
    )?;
    Ok(Json(view))
}

/// POST /v1/rates/refresh
async fn force_refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let outcome = state
        .engine
        .force_refresh()
        .await
        .ok_or_else(|| AppError::Conflict("no rate authority is configured".to_string()))?;
    Ok(Json(RefreshResponse {
        outcome,
        metadata: state.engine.get_metadata(),
    }))
}
