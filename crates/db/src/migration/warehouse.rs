//! Warehouse tables for local development and tests.
//!
//! Production warehouses are provisioned outside this service. These tables
//! are derived from the warehouse entities so seeded data matches what the
//! engine reads.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};

use crate::entities::{deal, deal_cdi_var_rpt, tranche, tranchebal};

/// Creates `deal`, `tranche`, `tranchebal` and `deal_cdi_var_rpt` if missing.
///
/// # Errors
///
/// Returns an error if a `CREATE TABLE` statement fails.
pub async fn create_warehouse_tables<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    create(db, deal::Entity).await?;
    create(db, tranche::Entity).await?;
    create(db, tranchebal::Entity).await?;
    create(db, deal_cdi_var_rpt::Entity).await?;
    tracing::debug!("Warehouse tables ready");
    Ok(())
}

async fn create<C: ConnectionTrait, E: EntityTrait>(db: &C, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}
