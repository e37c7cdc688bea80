//! Demo data seeder for Vantage development.
//!
//! Creates the warehouse tables if they are missing, loads a small set of
//! deals, tranches, balances and CDI variables, then stores sample
//! calculations and a report template in the configuration store.
//!
//! Usage: cargo run --bin seeder
//!
//! Connection settings come from the same configuration as the server.
//! Running it twice is safe: seeded rows and existing names are skipped.

use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use vantage_core::audit::{AuditWriter, BufferedAuditWriter};
use vantage_core::calculation::{
    AggregationFunction, CalculationSource, GroupLevel, SystemCalculationVariant,
};
use vantage_core::report::{CalculationRef, CalculationRefKind, ReportDefinition};
use vantage_db::entities::{deal, deal_cdi_var_rpt, tranche, tranchebal};
use vantage_db::migration::{Migrator, MigratorTrait, warehouse::create_warehouse_tables};
use vantage_db::repositories::{
    AuditLogRepository, CalculationRepository, CalculationStoreError, CreateCalculationInput,
};
use vantage_db::{ReportTemplateRepository, connect_pool};
use vantage_shared::types::CalculationId;
use vantage_shared::{AppConfig, AuditSettings};

const SEED_USER: &str = "seeder@vantage.dev";
const CYCLES: [i64; 3] = [202_402, 202_403, 202_404];

/// Deal number, issuer, tranches as `(id, original balance, pass-through rate)`.
type DemoDeal = (i64, &'static str, &'static [(&'static str, Decimal, Decimal)]);

const DEMO_DEALS: &[DemoDeal] = &[
    (
        1001,
        "ACME",
        &[
            ("A1", dec!(250000000.00), dec!(0.0425)),
            ("A2", dec!(120000000.00), dec!(0.0475)),
            ("B", dec!(30000000.00), dec!(0.0610)),
        ],
    ),
    (
        1002,
        "ACME",
        &[
            ("A", dec!(180000000.00), dec!(0.0390)),
            ("M1", dec!(15000000.00), dec!(0.0550)),
        ],
    ),
    (
        2001,
        "GLOBEX",
        &[("A", dec!(90000000.00), dec!(0.0510))],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to warehouse...");
    let warehouse = connect_pool(&config.warehouse_database).await?;
    create_warehouse_tables(&warehouse).await?;

    if deal::Entity::find().count(&warehouse).await? > 0 {
        println!("  Warehouse already has deals, skipping...");
    } else {
        println!("Seeding warehouse...");
        seed_warehouse(&warehouse).await?;
    }

    println!("Connecting to configuration store...");
    let config_db = connect_pool(&config.config_database).await?;
    Migrator::up(&config_db, None).await?;

    println!("Seeding calculations...");
    let audit = BufferedAuditWriter::new(
        Arc::new(AuditLogRepository::new(config_db.clone())),
        AuditSettings::default(),
    );
    let ids = seed_calculations(&config_db, &audit).await?;
    audit.flush().await?;

    println!("Seeding report template...");
    seed_report(&config_db, &ids).await?;

    println!("Seeding complete!");
    Ok(())
}

async fn seed_warehouse(db: &DatabaseConnection) -> anyhow::Result<()> {
    deal::Entity::insert_many(DEMO_DEALS.iter().map(|(dl_nbr, issuer, _)| deal::ActiveModel {
        dl_nbr: Set(*dl_nbr),
        issr_cde: Set(Some((*issuer).to_string())),
        cdi_file_nme: Set(Some(format!("{issuer}_{dl_nbr}.cdi"))),
        cdb_cdi_file_nme: Set(None),
    }))
    .exec_without_returning(db)
    .await?;

    let tranches = DEMO_DEALS.iter().flat_map(|(dl_nbr, _, tranches)| {
        tranches.iter().map(move |(tr_id, _, _)| tranche::ActiveModel {
            dl_nbr: Set(*dl_nbr),
            tr_id: Set((*tr_id).to_string()),
            tr_cusip_id: Set(Some(format!("{dl_nbr}{tr_id}X"))),
        })
    });
    tranche::Entity::insert_many(tranches)
        .exec_without_returning(db)
        .await?;

    let mut balances = Vec::new();
    for (dl_nbr, _, tranches) in DEMO_DEALS {
        for (tr_id, original, rate) in *tranches {
            // two percent paydown per cycle
            let mut balance = *original;
            for cycle in CYCLES {
                let principal = (balance * dec!(0.02)).round_dp(2);
                let interest = (balance * *rate / dec!(12)).round_dp(2);
                balance -= principal;
                balances.push(tranchebal::ActiveModel {
                    dl_nbr: Set(*dl_nbr),
                    tr_id: Set((*tr_id).to_string()),
                    cycle_cde: Set(cycle),
                    tr_end_bal_amt: Set(Some(balance)),
                    tr_pass_thru_rte: Set(Some(*rate)),
                    tr_accrl_days: Set(Some(30)),
                    tr_int_accrl_amt: Set(Some(interest)),
                    tr_int_dstrb_amt: Set(Some(interest)),
                    tr_prin_dstrb_amt: Set(Some(principal)),
                    tr_prin_rel_ls_amt: Set(Some(Decimal::ZERO)),
                    tr_cash_dstrb_amt: Set(Some(interest + principal)),
                });
            }
        }
    }
    tranchebal::Entity::insert_many(balances)
        .exec_without_returning(db)
        .await?;

    let variables = DEMO_DEALS.iter().flat_map(|(dl_nbr, _, _)| {
        CYCLES.into_iter().enumerate().map(move |(i, cycle)| {
            deal_cdi_var_rpt::ActiveModel {
                dl_nbr: Set(*dl_nbr),
                cycle_cde: Set(cycle),
                dl_cdi_var_nme: Set("#OC_PCT".to_string()),
                dl_cdi_var_value: Set(Some(format!("0.{}", 1200 + i * 15))),
            }
        })
    });
    deal_cdi_var_rpt::Entity::insert_many(variables)
        .exec_without_returning(db)
        .await?;

    println!(
        "  Seeded {} deals over {} cycles",
        DEMO_DEALS.len(),
        CYCLES.len()
    );
    Ok(())
}

fn sample_calculations() -> Vec<CreateCalculationInput> {
    let aggregated = |name: &str, column: &str, function, weight: Option<&str>| {
        CreateCalculationInput {
            name: name.to_string(),
            description: None,
            group_level: GroupLevel::Deal,
            source: CalculationSource::Aggregated {
                source_table: "TrancheBalance".to_string(),
                source_column: column.to_string(),
                aggregation_function: function,
                weight_column: weight.map(ToString::to_string),
            },
        }
    };
    vec![
        aggregated(
            "Total Ending Balance",
            "tr_end_bal_amt",
            AggregationFunction::Sum,
            None,
        ),
        aggregated(
            "WA Pass-Through Rate",
            "tr_pass_thru_rte",
            AggregationFunction::WeightedAvg,
            Some("tr_end_bal_amt"),
        ),
        aggregated(
            "Total Principal Distribution",
            "tr_prin_dstrb_amt",
            AggregationFunction::Sum,
            None,
        ),
        CreateCalculationInput {
            name: "Tranche Count".to_string(),
            description: Some("Number of tranches on the deal".to_string()),
            group_level: GroupLevel::Deal,
            source: CalculationSource::System(SystemCalculationVariant::Sql {
                sql_text: "SELECT dl_nbr, COUNT(*) AS tranche_count FROM tranche GROUP BY dl_nbr"
                    .to_string(),
                result_column: "tranche_count".to_string(),
            }),
        },
        CreateCalculationInput {
            name: "OC Percent".to_string(),
            description: Some("Overcollateralization from the CDI file".to_string()),
            group_level: GroupLevel::Deal,
            source: CalculationSource::System(SystemCalculationVariant::CdiVariable {
                variable_name: "#OC_PCT".to_string(),
                result_column: "oc_pct".to_string(),
            }),
        },
    ]
}

/// Stores the sample calculations, approving SQL ones; returns the ids
/// created in this run together with their kind of reference.
async fn seed_calculations<W: AuditWriter>(
    db: &DatabaseConnection,
    audit: &W,
) -> anyhow::Result<Vec<(CalculationRefKind, CalculationId)>> {
    let repo = CalculationRepository::new(db.clone());
    let mut created = Vec::new();
    for input in sample_calculations() {
        let name = input.name.clone();
        let needs_approval = input.source.requires_approval();
        let model = match repo.create(input, SEED_USER, audit).await {
            Ok(model) => model,
            Err(CalculationStoreError::Duplicate { .. }) => {
                println!("  {name} already exists, skipping...");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let id = CalculationId::from_uuid(model.id);
        let kind = if needs_approval {
            repo.approve(id, SEED_USER, audit).await?;
            CalculationRefKind::SystemSql
        } else {
            CalculationRefKind::UserAggregation
        };
        println!("  Created {name}");
        created.push((kind, id));
    }
    Ok(created)
}

async fn seed_report(
    db: &DatabaseConnection,
    calculations: &[(CalculationRefKind, CalculationId)],
) -> anyhow::Result<()> {
    if calculations.is_empty() {
        println!("  No new calculations, skipping...");
        return Ok(());
    }

    let mut references = vec![CalculationRef::new(
        CalculationRefKind::StaticField,
        "Deal.issr_cde",
        "Issuer",
    )];
    references.extend(
        calculations
            .iter()
            .map(|(kind, id)| CalculationRef::new(*kind, id.to_string(), "")),
    );

    let definition = ReportDefinition {
        name: "Deal Summary".to_string(),
        description: Some("Balances, rates and credit support per deal".to_string()),
        scope: GroupLevel::Deal,
        deal_tranche_map: DEMO_DEALS
            .iter()
            .map(|(dl_nbr, _, _)| (*dl_nbr, Vec::new()))
            .collect(),
        calculations: references,
        column_preferences: Vec::new(),
    };
    let report = ReportTemplateRepository::new(db.clone())
        .create(definition, SEED_USER)
        .await?;
    println!("  Created report {}", report.id);
    Ok(())
}
