//! Report template routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;
use vantage_core::calculation::GroupLevel;
use vantage_core::report::{CalculationRef, ColumnPreference, DealTrancheMap, ReportDefinition};
use vantage_db::repositories::{ReportTemplateRepository, UpdateReportInput};
use vantage_shared::types::ReportId;

use crate::AppState;
use crate::error::ApiResult;
use crate::extractors::ActingUser;

/// Creates the report template routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports).post(create_report))
        .route(
            "/reports/{id}",
            get(get_report).patch(update_report).delete(delete_report),
        )
        .route("/reports/{id}/execute", post(execute_report))
        .route("/reports/{id}/preview", post(preview_report))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing reports.
#[derive(Debug, Default, Deserialize)]
pub struct ListReportsQuery {
    /// Scope filter.
    pub scope: Option<GroupLevel>,
    /// Include soft-deleted reports.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Request body for updating a report; absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateReportRequest {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New scope.
    pub scope: Option<GroupLevel>,
    /// New deal selection.
    pub deal_tranche_map: Option<DealTrancheMap>,
    /// New calculation list.
    pub calculations: Option<Vec<CalculationRef>>,
    /// New column preferences.
    pub column_preferences: Option<Vec<ColumnPreference>>,
}

impl From<UpdateReportRequest> for UpdateReportInput {
    fn from(req: UpdateReportRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            scope: req.scope,
            deal_tranche_map: req.deal_tranche_map,
            calculations: req.calculations,
            column_preferences: req.column_preferences,
        }
    }
}

/// Request body for running a saved report.
#[derive(Debug, Deserialize)]
pub struct RunReportRequest {
    /// Cycle to report on.
    pub cycle_code: i64,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/reports` - List reports.
async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> ApiResult<impl IntoResponse> {
    let repo = ReportTemplateRepository::new((*state.config_db).clone());
    let reports = repo.list(query.scope, query.include_inactive).await?;
    Ok(Json(reports))
}

/// POST `/reports` - Save a report template.
async fn create_report(
    State(state): State<AppState>,
    user: ActingUser,
    Json(definition): Json<ReportDefinition>,
) -> ApiResult<impl IntoResponse> {
    let repo = ReportTemplateRepository::new((*state.config_db).clone());
    let report = repo.create(definition, user.as_str()).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET `/reports/{id}` - Get an active report.
async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let repo = ReportTemplateRepository::new((*state.config_db).clone());
    let report = repo.find_active(ReportId::from_uuid(id)).await?;
    Ok(Json(report))
}

/// PATCH `/reports/{id}` - Update a report.
async fn update_report(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let repo = ReportTemplateRepository::new((*state.config_db).clone());
    let report = repo
        .update(ReportId::from_uuid(id), payload.into())
        .await?;
    Ok(Json(report))
}

/// DELETE `/reports/{id}` - Soft-delete a report.
async fn delete_report(
    State(state): State<AppState>,
    _user: ActingUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let repo = ReportTemplateRepository::new((*state.config_db).clone());
    repo.soft_delete(ReportId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/reports/{id}/execute` - Run a saved report for a cycle.
async fn execute_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RunReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let repo = ReportTemplateRepository::new((*state.config_db).clone());
    let report = repo.find_active(ReportId::from_uuid(id)).await?;
    tracing::debug!(report_id = %report.id, cycle = payload.cycle_code, "Executing report");
    let result = state
        .resolver
        .execute_template(&report.definition, payload.cycle_code)
        .await?;
    Ok(Json(result))
}

/// POST `/reports/{id}/preview` - Show the SQL of a saved report.
async fn preview_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RunReportRequest>,
) -> ApiResult<impl IntoResponse> {
    let repo = ReportTemplateRepository::new((*state.config_db).clone());
    let report = repo.find_active(ReportId::from_uuid(id)).await?;
    let preview = state
        .resolver
        .preview_template(&report.definition, payload.cycle_code)
        .await?;
    Ok(Json(preview))
}
