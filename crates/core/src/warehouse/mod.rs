//! Warehouse schema model.
//!
//! Typed description of the three read-only warehouse entities (`deal`,
//! `tranche`, `tranchebal`), their columns and how they join.

pub mod error;
pub mod schema;

pub use error::SchemaError;
pub use schema::{
    CYCLE_CODE_COLUMN, ColumnDef, DEAL_NUMBER_COLUMN, FieldRef, FieldType, TRANCHE_ID_COLUMN,
    WarehouseTable,
};
