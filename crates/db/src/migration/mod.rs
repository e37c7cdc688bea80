//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and cover the configuration
//! store only; the warehouse schema is owned elsewhere; [`warehouse`] creates a
//! compatible copy for local development and tests.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_config_store;
pub mod warehouse;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260301_000001_config_store::Migration)]
    }
}
