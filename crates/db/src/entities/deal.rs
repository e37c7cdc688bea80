//! `SeaORM` Entity for the warehouse deal table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub dl_nbr: i64,
    pub issr_cde: Option<String>,
    pub cdi_file_nme: Option<String>,
    #[sea_orm(column_name = "CDB_cdi_file_nme")]
    pub cdb_cdi_file_nme: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tranche::Entity")]
    Tranche,
}

impl Related<super::tranche::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tranche.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
