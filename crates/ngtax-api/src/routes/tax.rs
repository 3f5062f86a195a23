//! # Tax Calculator API
//!
//! - **POST `/v1/tax/pit`** — personal income tax
//! - **POST `/v1/tax/cit`** — company income tax
//! - **POST `/v1/tax/cgt`** — capital gains tax on one disposal
//! - **POST `/v1/tax/cgt/batch`** — capital gains tax on several disposals
//! - **POST `/v1/tax/vat`** — value added tax
//! - **POST `/v1/tax/levies`** — statutory levies
//!
//! Every response carries `ratesUsed`, identifying the effective
//! configuration the figures were computed from.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ngtax_calc::{
    CgtBatchResult, CgtResult, CitInput, CitResult, Disposal, LevyInput, LevyResult, PitInput,
    PitResult, VatInput, VatResult,
};
use ngtax_overrides::Assessment;
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

/// Largest batch accepted by `/v1/tax/cgt/batch`.
const MAX_BATCH_DISPOSALS: usize = 1_000;

/// Several disposals assessed together.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CgtBatchRequest {
    /// The disposals, in the order results are returned.
    pub disposals: Vec<Disposal>,
}

impl Validate for CgtBatchRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.disposals.is_empty() || self.disposals.len() > MAX_BATCH_DISPOSALS {
            return Err(AppError::Validation {
                field: Some("disposals".to_string()),
                message: format!("disposals must contain 1-{MAX_BATCH_DISPOSALS} entries"),
            });
        }
        Ok(())
    }
}

/// Calculator routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/tax/pit", post(pit))
        .route("/v1/tax/cit", post(cit))
        .route("/v1/tax/cgt", post(cgt))
        .route("/v1/tax/cgt/batch", post(cgt_batch))
        .route("/v1/tax/vat", post(vat))
        .route("/v1/tax/levies", post(levies))
}

/// POST /v1/tax/pit
async fn pit(
    State(state): State<AppState>,
    body: Result<Json<PitInput>, JsonRejection>,
) -> Result<Json<Assessment<PitResult>>, AppError> {
    let input = extract_json(body)?;
    Ok(Json(state.engine.pit(&input).await?))
}

/// POST /v1/tax/cit
async fn cit(
    State(state): State<AppState>,
    body: Result<Json<CitInput>, JsonRejection>,
) -> Result<Json<Assessment<CitResult>>, AppError> {
    let input = extract_json(body)?;
    Ok(Json(state.engine.cit(&input).await?))
}

/// POST /v1/tax/cgt
async fn cgt(
    State(state): State<AppState>,
    body: Result<Json<Disposal>, JsonRejection>,
) -> Result<Json<Assessment<CgtResult>>, AppError> {
    let disposal = extract_json(body)?;
    Ok(Json(state.engine.cgt(&disposal).await?))
}

/// POST /v1/tax/cgt/batch
async fn cgt_batch(
    State(state): State<AppState>,
    body: Result<Json<CgtBatchRequest>, JsonRejection>,
) -> Result<Json<Assessment<CgtBatchResult>>, AppError> {
    let req = extract_validated_json(body)?;
    Ok(Json(state.engine.cgt_batch(&req.disposals).await?))
}

/// POST /v1/tax/vat
async fn vat(
    State(state): State<AppState>,
    body: Result<Json<VatInput>, JsonRejection>,
) -> Result<Json<Assessment<VatResult>>, AppError> {
    let input = extract_json(body)?;
    Ok(Json(state.engine.vat(&input).await?))
}

/// POST /v1/tax/levies
async fn levies(
    State(state): State<AppState>,
    body: Result<Json<LevyInput>, JsonRejection>,
) -> Result<Json<Assessment<LevyResult>>, AppError> {
    let input = extract_json(body)?;
    Ok(Json(state.engine.levies(&input).await?))
}
