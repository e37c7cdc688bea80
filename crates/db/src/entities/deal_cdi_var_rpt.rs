//! `SeaORM` Entity for the warehouse CDI variable report table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deal_cdi_var_rpt")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub dl_nbr: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cycle_cde: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub dl_cdi_var_nme: String,
    pub dl_cdi_var_value: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
