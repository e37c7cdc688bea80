//! `SeaORM` Entity for the warehouse tranche table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tranche")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub dl_nbr: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tr_id: String,
    pub tr_cusip_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deal::Entity",
        from = "Column::DlNbr",
        to = "super::deal::Column::DlNbr"
    )]
    Deal,
    #[sea_orm(has_many = "super::tranchebal::Entity")]
    Tranchebal,
}

impl Related<super::deal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deal.def()
    }
}

impl Related<super::tranchebal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tranchebal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
