//! `SeaORM` Entity for the warehouse tranchebal table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tranchebal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub dl_nbr: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tr_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cycle_cde: i64,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub tr_end_bal_amt: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 8)))", nullable)]
    pub tr_pass_thru_rte: Option<Decimal>,
    pub tr_accrl_days: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub tr_int_accrl_amt: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub tr_int_dstrb_amt: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub tr_prin_dstrb_amt: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub tr_prin_rel_ls_amt: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub tr_cash_dstrb_amt: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tranche::Entity",
        from = "(Column::DlNbr, Column::TrId)",
        to = "(super::tranche::Column::DlNbr, super::tranche::Column::TrId)"
    )]
    Tranche,
}

impl Related<super::tranche::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tranche.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
