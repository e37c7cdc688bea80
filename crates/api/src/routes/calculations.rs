//! Calculation routes: CRUD, approval and audit trail.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use vantage_core::audit::{AuditEntry, AuditWriter};
use vantage_core::calculation::{CalculationKind, CalculationSource, GroupLevel};
use vantage_db::entities::calculations;
use vantage_db::repositories::{
    AuditLogRepository, CalculationFilter, CalculationRepository, CreateCalculationInput,
    UpdateCalculationInput, source_of,
};
use vantage_shared::AppError;
use vantage_shared::types::CalculationId;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extractors::ActingUser;

/// Creates the calculation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/calculations",
            get(list_calculations).post(create_calculation),
        )
        .route(
            "/calculations/{id}",
            get(get_calculation)
                .patch(update_calculation)
                .delete(delete_calculation),
        )
        .route("/calculations/{id}/approve", post(approve_calculation))
        .route("/calculations/{id}/audit", get(get_audit_trail))
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Query parameters for listing calculations.
#[derive(Debug, Default, Deserialize)]
pub struct ListCalculationsQuery {
    /// Level filter.
    pub group_level: Option<GroupLevel>,
    /// Kind filter.
    pub calculation_type: Option<CalculationKind>,
    /// Include soft-deleted calculations.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Request body for creating a calculation.
///
/// The definition fields sit next to the name, tagged by `calculation_type`.
#[derive(Debug, Deserialize)]
pub struct CreateCalculationRequest {
    /// Name, also the default column header.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Grouping level.
    pub group_level: GroupLevel,
    /// Definition.
    #[serde(flatten)]
    pub source: CalculationSource,
}

/// Request body for updating a calculation.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCalculationRequest {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New level.
    pub group_level: Option<GroupLevel>,
    /// New definition.
    pub source: Option<CalculationSource>,
}

/// Calculation as returned by the API.
#[derive(Debug, Serialize)]
pub struct CalculationResponse {
    /// Calculation ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Grouping level.
    pub group_level: GroupLevel,
    /// Definition, tagged by `calculation_type`.
    #[serde(flatten)]
    pub source: CalculationSource,
    /// Whether the calculation may run.
    pub is_approved: bool,
    /// Author.
    pub created_by: String,
    /// Approver.
    pub approved_by: Option<String>,
    /// Approval time.
    pub approved_at: Option<DateTime<FixedOffset>>,
    /// False once soft-deleted.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<FixedOffset>,
    /// Last update time.
    pub updated_at: DateTime<FixedOffset>,
}

impl TryFrom<calculations::Model> for CalculationResponse {
    type Error = ApiError;

    fn try_from(model: calculations::Model) -> Result<Self, Self::Error> {
        let source = source_of(&model)?;
        Ok(Self {
            id: model.id,
            name: model.name,
            description: model.description,
            group_level: model.group_level.into(),
            source,
            is_approved: model.approved_at.is_some(),
            created_by: model.created_by,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Audit trail of one calculation.
#[derive(Debug, Serialize)]
pub struct AuditTrailResponse {
    /// Calculation ID.
    pub calculation_id: CalculationId,
    /// Entries, oldest first.
    pub entries: Vec<AuditEntry>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/calculations` - List calculations.
async fn list_calculations(
    State(state): State<AppState>,
    Query(query): Query<ListCalculationsQuery>,
) -> ApiResult<impl IntoResponse> {
    let repo = CalculationRepository::new((*state.config_db).clone());
    let models = repo
        .list(CalculationFilter {
            group_level: query.group_level,
            calculation_type: query.calculation_type,
            include_inactive: query.include_inactive,
        })
        .await?;
    let calculations = models
        .into_iter()
        .map(CalculationResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(calculations))
}

/// POST `/calculations` - Create a calculation.
async fn create_calculation(
    State(state): State<AppState>,
    user: ActingUser,
    Json(payload): Json<CreateCalculationRequest>,
) -> ApiResult<impl IntoResponse> {
    let repo = CalculationRepository::new((*state.config_db).clone());
    let model = repo
        .create(
            CreateCalculationInput {
                name: payload.name,
                description: payload.description,
                group_level: payload.group_level,
                source: payload.source,
            },
            user.as_str(),
            state.audit.as_ref(),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CalculationResponse::try_from(model)?),
    ))
}

/// GET `/calculations/{id}` - Get an active calculation.
async fn get_calculation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let repo = CalculationRepository::new((*state.config_db).clone());
    let model = repo.find_active(CalculationId::from_uuid(id)).await?;
    Ok(Json(CalculationResponse::try_from(model)?))
}

/// PATCH `/calculations/{id}` - Update a calculation.
async fn update_calculation(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCalculationRequest>,
) -> ApiResult<impl IntoResponse> {
    let repo = CalculationRepository::new((*state.config_db).clone());
    let model = repo
        .update(
            CalculationId::from_uuid(id),
            UpdateCalculationInput {
                name: payload.name,
                description: payload.description,
                group_level: payload.group_level,
                source: payload.source,
            },
            user.as_str(),
            state.audit.as_ref(),
        )
        .await?;
    Ok(Json(CalculationResponse::try_from(model)?))
}

/// DELETE `/calculations/{id}` - Soft-delete a calculation.
async fn delete_calculation(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let repo = CalculationRepository::new((*state.config_db).clone());
    repo.soft_delete(
        CalculationId::from_uuid(id),
        user.as_str(),
        state.audit.as_ref(),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/calculations/{id}/approve` - Approve a SQL calculation.
async fn approve_calculation(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let repo = CalculationRepository::new((*state.config_db).clone());
    let model = repo
        .approve(
            CalculationId::from_uuid(id),
            user.as_str(),
            state.audit.as_ref(),
        )
        .await?;
    Ok(Json(CalculationResponse::try_from(model)?))
}

/// GET `/calculations/{id}/audit` - Audit trail, including soft-deleted calculations.
async fn get_audit_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let calculation_id = CalculationId::from_uuid(id);
    let repo = CalculationRepository::new((*state.config_db).clone());
    if repo.find_by_id(calculation_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Calculation not found: {calculation_id}")).into());
    }

    // pending entries would otherwise be missing from the trail
    if let Err(e) = state.audit.flush().await {
        warn!(error = %e, "Failed to flush audit log before reading trail");
    }
    let entries = AuditLogRepository::new((*state.config_db).clone())
        .list_for_calculation(calculation_id)
        .await?;
    Ok(Json(AuditTrailResponse {
        calculation_id,
        entries,
    }))
}
