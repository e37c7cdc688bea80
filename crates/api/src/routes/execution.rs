//! Ad-hoc report execution and SQL preview routes.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;
use vantage_core::calculation::GroupLevel;
use vantage_core::report::{CalculationRef, DealTrancheMap, ExecutionRequest};

use crate::AppState;
use crate::error::ApiResult;

/// Creates the execution routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/execute", post(execute))
        .route("/preview", post(preview))
        .route("/preview/calculation", post(preview_calculation))
}

/// Request body for previewing one calculation.
#[derive(Debug, Deserialize)]
pub struct PreviewCalculationRequest {
    /// Calculation to preview.
    pub calculation: CalculationRef,
    /// Deal/tranche selection.
    pub deal_tranche_map: DealTrancheMap,
    /// Cycle code.
    pub cycle_code: i64,
    /// Report level.
    pub report_level: GroupLevel,
}

/// POST `/execute` - Run an ad-hoc report.
async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecutionRequest>,
) -> ApiResult<impl IntoResponse> {
    let result = state.resolver.resolve_and_execute(&request).await?;
    Ok(Json(result))
}

/// POST `/preview` - Compile an ad-hoc report without running it.
async fn preview(
    State(state): State<AppState>,
    Json(request): Json<ExecutionRequest>,
) -> ApiResult<impl IntoResponse> {
    let preview = state.resolver.resolve_and_preview(&request).await?;
    Ok(Json(preview))
}

/// POST `/preview/calculation` - Compile a single calculation.
async fn preview_calculation(
    State(state): State<AppState>,
    Json(payload): Json<PreviewCalculationRequest>,
) -> ApiResult<impl IntoResponse> {
    let preview = state
        .resolver
        .preview_single(
            payload.calculation,
            payload.deal_tranche_map,
            payload.cycle_code,
            payload.report_level,
        )
        .await?;
    Ok(Json(preview))
}
