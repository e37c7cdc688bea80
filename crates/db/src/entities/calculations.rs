//! `SeaORM` Entity for the calculations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{CalculationLevel, CalculationType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "calculations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub group_level: CalculationLevel,
    pub calculation_type: CalculationType,
    pub source_table: Option<String>,
    pub source_column: Option<String>,
    pub aggregation_function: Option<String>,
    pub weight_column: Option<String>,
    pub sql_text: Option<String>,
    pub result_column_name: Option<String>,
    pub cdi_variable_name: Option<String>,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::calculation_audit_log::Entity")]
    CalculationAuditLog,
}

impl Related<super::calculation_audit_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CalculationAuditLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
