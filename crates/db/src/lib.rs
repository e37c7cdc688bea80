//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the configuration store and the warehouse
//! - Repository abstractions for data access
//! - Database migrations
//! - The CTE query builder and the calculation resolver that runs it

pub mod entities;
pub mod migration;
pub mod query;
pub mod repositories;
pub mod resolver;

pub use query::{CompiledQuery, QueryBuilder, QueryError};
pub use repositories::{
    AuditLogRepository, CalculationRepository, ReportTemplateRepository, WarehouseRepository,
};
pub use resolver::{CalculationResolver, ResolverError};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use vantage_shared::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Opens a connection pool sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
