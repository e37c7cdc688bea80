//! Warehouse browsing routes for deal, tranche, cycle and field pickers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use vantage_core::warehouse::{ColumnDef, WarehouseTable};
use vantage_db::WarehouseRepository;
use vantage_shared::AppError;
use vantage_shared::types::{PageRequest, PageResponse};

use crate::AppState;
use crate::error::ApiResult;

/// Creates the warehouse routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/warehouse/deals", get(list_deals))
        .route("/warehouse/deals/{dl_nbr}/tranches", get(list_tranches))
        .route("/warehouse/cycles", get(list_cycles))
        .route("/warehouse/fields", get(list_fields))
}

/// Fields of one warehouse table.
#[derive(Debug, Serialize)]
pub struct TableFields {
    /// Logical table name, used in static field paths.
    pub table: &'static str,
    /// Physical table name.
    pub table_name: &'static str,
    /// Columns.
    pub columns: &'static [ColumnDef],
}

/// Available cycles.
#[derive(Debug, Serialize)]
pub struct CyclesResponse {
    /// Cycle codes, newest first.
    pub cycles: Vec<i64>,
}

/// GET `/warehouse/deals` - Page through deals.
async fn list_deals(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> ApiResult<impl IntoResponse> {
    let repo = WarehouseRepository::new((*state.warehouse_db).clone());
    let (deals, total) = repo.list_deals(&page).await?;
    let per_page = u32::try_from(page.limit()).unwrap_or(PageRequest::MAX_PER_PAGE);
    Ok(Json(PageResponse::new(
        deals,
        page.page.max(1),
        per_page,
        total,
    )))
}

/// GET `/warehouse/deals/{dl_nbr}/tranches` - Tranches of a deal.
async fn list_tranches(
    State(state): State<AppState>,
    Path(dl_nbr): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let repo = WarehouseRepository::new((*state.warehouse_db).clone());
    if repo.find_deal(dl_nbr).await?.is_none() {
        return Err(AppError::NotFound(format!("Deal not found: {dl_nbr}")).into());
    }
    Ok(Json(repo.list_tranches(dl_nbr).await?))
}

/// GET `/warehouse/cycles` - Cycles with balance data.
async fn list_cycles(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let repo = WarehouseRepository::new((*state.warehouse_db).clone());
    let cycles = repo.list_cycles().await?;
    Ok(Json(CyclesResponse { cycles }))
}

/// GET `/warehouse/fields` - Columns usable as static fields and aggregation sources.
async fn list_fields() -> Json<Vec<TableFields>> {
    Json(
        WarehouseTable::ALL
            .into_iter()
            .map(|table| TableFields {
                table: table.logical_name(),
                table_name: table.table_name(),
                columns: table.columns(),
            })
            .collect(),
    )
}
