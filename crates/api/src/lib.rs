//! HTTP API layer with Axum routes and extractors.
//!
//! This crate provides:
//! - REST API routes for calculations, report templates, execution and
//!   warehouse browsing
//! - Request extractors
//! - Error responses

pub mod error;
pub mod extractors;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vantage_core::audit::BufferedAuditWriter;
use vantage_db::{AuditLogRepository, CalculationResolver};

/// Audit writer shared by every handler.
pub type AuditLog = BufferedAuditWriter<AuditLogRepository>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Configuration store pool (calculations, reports, audit log).
    pub config_db: Arc<DatabaseConnection>,
    /// Warehouse pool.
    pub warehouse_db: Arc<DatabaseConnection>,
    /// Report resolver.
    pub resolver: Arc<CalculationResolver>,
    /// Buffered calculation audit writer.
    pub audit: Arc<AuditLog>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
