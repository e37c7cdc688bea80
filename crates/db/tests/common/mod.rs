//! Shared fixtures: in-memory SQLite configuration store and warehouse.

#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use vantage_core::audit::BufferedAuditWriter;
use vantage_core::calculation::{AggregationFunction, CalculationSource, GroupLevel};
use vantage_db::entities::{deal, deal_cdi_var_rpt, tranche, tranchebal};
use vantage_db::migration::{Migrator, MigratorTrait, warehouse::create_warehouse_tables};
use vantage_db::repositories::{AuditLogRepository, CreateCalculationInput};
use vantage_shared::AuditSettings;

pub const CYCLE: i64 = 202_404;
pub const PREVIOUS_CYCLE: i64 = 202_403;
pub const ANALYST: &str = "analyst@vantage.test";

pub type TestAuditWriter = BufferedAuditWriter<AuditLogRepository>;

pub async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(options)
        .await
        .expect("Failed to open in-memory database")
}

/// Migrated configuration store.
pub async fn config_store() -> DatabaseConnection {
    let db = memory_db().await;
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Audit writer that writes every entry immediately.
pub fn audit_writer(db: &DatabaseConnection) -> TestAuditWriter {
    BufferedAuditWriter::new(
        Arc::new(AuditLogRepository::new(db.clone())),
        AuditSettings {
            batch_size: 1,
            flush_interval_secs: 5,
        },
    )
}

/// Seeded warehouse.
///
/// Deals 1001 (tranches A, B, C), 1002 (A, B), 1003 (A, zero balance) and
/// 2001-2003 without tranches. Balances at [`CYCLE`], plus one row for 1001/A
/// at [`PREVIOUS_CYCLE`] that must never leak into current-cycle results.
pub async fn warehouse() -> DatabaseConnection {
    let db = memory_db().await;
    create_warehouse_tables(&db)
        .await
        .expect("Failed to create warehouse tables");

    let deals = [1001, 1002, 1003, 2001, 2002, 2003].map(|dl_nbr| deal::ActiveModel {
        dl_nbr: Set(dl_nbr),
        issr_cde: Set(Some(format!("ISS{dl_nbr}"))),
        cdi_file_nme: Set(Some(format!("CDI{dl_nbr}.txt"))),
        cdb_cdi_file_nme: Set(None),
    });
    deal::Entity::insert_many(deals)
        .exec_without_returning(&db)
        .await
        .expect("Failed to seed deals");

    let tranches = [
        (1001, "A"),
        (1001, "B"),
        (1001, "C"),
        (1002, "A"),
        (1002, "B"),
        (1003, "A"),
    ]
    .map(|(dl_nbr, tr_id)| tranche::ActiveModel {
        dl_nbr: Set(dl_nbr),
        tr_id: Set(tr_id.to_string()),
        tr_cusip_id: Set(Some(format!("{dl_nbr}{tr_id}CUSIP"))),
    });
    tranche::Entity::insert_many(tranches)
        .exec_without_returning(&db)
        .await
        .expect("Failed to seed tranches");

    let balances = [
        (1001, "A", CYCLE, dec!(1000.50), dec!(0.0625)),
        (1001, "B", CYCLE, dec!(2000.25), dec!(0.125)),
        (1001, "C", CYCLE, dec!(4000.00), dec!(0.25)),
        (1002, "A", CYCLE, dec!(500.25), dec!(0.0625)),
        (1002, "B", CYCLE, dec!(250.50), dec!(0.125)),
        (1003, "A", CYCLE, dec!(0), dec!(0.05)),
        (1001, "A", PREVIOUS_CYCLE, dec!(9999.50), dec!(0.5)),
    ]
    .map(|(dl_nbr, tr_id, cycle, balance, rate)| balance_row(dl_nbr, tr_id, cycle, balance, rate));
    tranchebal::Entity::insert_many(balances)
        .exec_without_returning(&db)
        .await
        .expect("Failed to seed balances");

    let variables = [
        (1001, CYCLE, "0.0425"),
        (1002, CYCLE, "0.0390"),
        (1001, PREVIOUS_CYCLE, "0.9999"),
    ]
    .map(|(dl_nbr, cycle_cde, value)| deal_cdi_var_rpt::ActiveModel {
        dl_nbr: Set(dl_nbr),
        cycle_cde: Set(cycle_cde),
        dl_cdi_var_nme: Set("#OC_PCT".to_string()),
        dl_cdi_var_value: Set(Some(value.to_string())),
    });
    deal_cdi_var_rpt::Entity::insert_many(variables)
        .exec_without_returning(&db)
        .await
        .expect("Failed to seed CDI variables");

    db
}

fn balance_row(
    dl_nbr: i64,
    tr_id: &str,
    cycle_cde: i64,
    balance: Decimal,
    rate: Decimal,
) -> tranchebal::ActiveModel {
    tranchebal::ActiveModel {
        dl_nbr: Set(dl_nbr),
        tr_id: Set(tr_id.to_string()),
        cycle_cde: Set(cycle_cde),
        tr_end_bal_amt: Set(Some(balance)),
        tr_pass_thru_rte: Set(Some(rate)),
        tr_accrl_days: Set(Some(30)),
        tr_int_accrl_amt: Set(None),
        tr_int_dstrb_amt: Set(None),
        tr_prin_dstrb_amt: Set(None),
        tr_prin_rel_ls_amt: Set(None),
        tr_cash_dstrb_amt: Set(None),
    }
}

pub fn total_balance_input(group_level: GroupLevel) -> CreateCalculationInput {
    CreateCalculationInput {
        name: "Total Balance".to_string(),
        description: Some("Sum of ending balances".to_string()),
        group_level,
        source: CalculationSource::Aggregated {
            source_table: "tranchebal".to_string(),
            source_column: "tr_end_bal_amt".to_string(),
            aggregation_function: AggregationFunction::Sum,
            weight_column: None,
        },
    }
}

pub fn weighted_rate_input(group_level: GroupLevel) -> CreateCalculationInput {
    CreateCalculationInput {
        name: "WA Rate".to_string(),
        description: None,
        group_level,
        source: CalculationSource::Aggregated {
            source_table: "tranchebal".to_string(),
            source_column: "tr_pass_thru_rte".to_string(),
            aggregation_function: AggregationFunction::WeightedAvg,
            weight_column: Some("tr_end_bal_amt".to_string()),
        },
    }
}
