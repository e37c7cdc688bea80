//! Configuration store migration runner for Vantage.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! Reads `DATABASE_URL`. Only the configuration store (calculations, report
//! templates, audit log) is migrated; the warehouse is never touched.

use sea_orm_migration::prelude::*;
use vantage_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // the CLI sets up its own tracing
    cli::run_cli(Migrator).await;
}
