//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod calculations;
pub mod execution;
pub mod health;
pub mod reports;
pub mod warehouse;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(calculations::routes())
        .merge(reports::routes())
        .merge(execution::routes())
        .merge(warehouse::routes())
}
