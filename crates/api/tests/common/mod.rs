//! Test application over in-memory SQLite databases.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use tower::ServiceExt;
use vantage_api::{AppState, create_router};
use vantage_core::audit::BufferedAuditWriter;
use vantage_db::entities::{deal, tranche, tranchebal};
use vantage_db::migration::{Migrator, MigratorTrait, warehouse::create_warehouse_tables};
use vantage_db::{AuditLogRepository, CalculationResolver};
use vantage_shared::{AuditSettings, QuerySettings};

pub const CYCLE: i64 = 202_404;
pub const USER: &str = "analyst@vantage.test";

async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(options)
        .await
        .expect("Failed to open in-memory database")
}

/// Deals 1001 (A, B) and 1002 (A) with balances at [`CYCLE`].
async fn warehouse() -> DatabaseConnection {
    let db = memory_db().await;
    create_warehouse_tables(&db)
        .await
        .expect("Failed to create warehouse tables");

    deal::Entity::insert_many([1001, 1002].map(|dl_nbr| deal::ActiveModel {
        dl_nbr: Set(dl_nbr),
        issr_cde: Set(Some(format!("ISS{dl_nbr}"))),
        cdi_file_nme: Set(None),
        cdb_cdi_file_nme: Set(None),
    }))
    .exec_without_returning(&db)
    .await
    .expect("Failed to seed deals");

    tranche::Entity::insert_many([(1001, "A"), (1001, "B"), (1002, "A")].map(
        |(dl_nbr, tr_id)| tranche::ActiveModel {
            dl_nbr: Set(dl_nbr),
            tr_id: Set(tr_id.to_string()),
            tr_cusip_id: Set(None),
        },
    ))
    .exec_without_returning(&db)
    .await
    .expect("Failed to seed tranches");

    tranchebal::Entity::insert_many(
        [
            (1001, "A", dec!(1000.50)),
            (1001, "B", dec!(2000.25)),
            (1002, "A", dec!(500.25)),
        ]
        .map(|(dl_nbr, tr_id, balance)| tranchebal::ActiveModel {
            dl_nbr: Set(dl_nbr),
            tr_id: Set(tr_id.to_string()),
            cycle_cde: Set(CYCLE),
            tr_end_bal_amt: Set(Some(balance)),
            tr_pass_thru_rte: Set(Some(dec!(0.125))),
            tr_accrl_days: Set(Some(30)),
            tr_int_accrl_amt: Set(None),
            tr_int_dstrb_amt: Set(None),
            tr_prin_dstrb_amt: Set(None),
            tr_prin_rel_ls_amt: Set(None),
            tr_cash_dstrb_amt: Set(None),
        }),
    )
    .exec_without_returning(&db)
    .await
    .expect("Failed to seed balances");

    db
}

/// Router over a migrated configuration store and a seeded warehouse.
pub async fn app() -> Router {
    let config_db = memory_db().await;
    Migrator::up(&config_db, None)
        .await
        .expect("Failed to run migrations");
    let warehouse_db = warehouse().await;

    let audit = BufferedAuditWriter::new(
        Arc::new(AuditLogRepository::new(config_db.clone())),
        AuditSettings {
            batch_size: 1,
            flush_interval_secs: 5,
        },
    );
    let resolver = CalculationResolver::new(
        config_db.clone(),
        warehouse_db.clone(),
        QuerySettings::default(),
    );

    create_router(AppState {
        config_db: Arc::new(config_db),
        warehouse_db: Arc::new(warehouse_db),
        resolver: Arc::new(resolver),
        audit: Arc::new(audit),
    })
}

/// Sends one request; `body` is sent as JSON when present.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Router should not fail");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response body is not JSON")
    };
    (status, json)
}
