//! End-to-end tests of the HTTP API over in-memory databases.

mod common;

use axum::http::StatusCode;
use common::{CYCLE, USER, send};
use serde_json::{Value, json};

fn total_balance() -> Value {
    json!({
        "name": "Total Balance",
        "group_level": "DEAL",
        "calculation_type": "AGGREGATED",
        "source_table": "tranchebal",
        "source_column": "tr_end_bal_amt",
        "aggregation_function": "SUM"
    })
}

fn flag_sql() -> Value {
    json!({
        "name": "Flag",
        "group_level": "DEAL",
        "calculation_type": "RAW_SQL",
        "variant": "sql",
        "sql_text": "SELECT dl_nbr, 1 AS flag FROM deal",
        "result_column": "flag"
    })
}

async fn create(app: &axum::Router, body: Value) -> String {
    let (status, created) = send(app, "POST", "/api/v1/calculations", Some(USER), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["id"].as_str().expect("id").to_string()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = common::app().await;

    let (status, body) = send(&app, "GET", "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/api/v1/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warehouse_database"], true);
}

#[tokio::test]
async fn test_mutation_without_user_header_is_rejected() {
    let app = common::app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/calculations",
        None,
        Some(total_balance()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_USER");
}

#[tokio::test]
async fn test_calculation_crud_round_trip() {
    let app = common::app().await;
    let id = create(&app, total_balance()).await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/calculations/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calculation_type"], "AGGREGATED");
    assert_eq!(body["aggregation_function"], "SUM");
    assert_eq!(body["group_level"], "DEAL");
    assert_eq!(body["is_approved"], true);
    assert_eq!(body["created_by"], USER);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/v1/calculations/{id}"),
        Some(USER),
        Some(json!({ "description": "Ending balance total" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Ending balance total");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/calculations/{id}"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/api/v1/calculations/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    // the trail outlives the calculation
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/calculations/{id}/audit"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions.len(), 3);
}

#[tokio::test]
async fn test_duplicate_name_is_conflict() {
    let app = common::app().await;
    create(&app, total_balance()).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/calculations",
        Some(USER),
        Some(total_balance()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_sql_calculation_requires_approval_before_execution() {
    let app = common::app().await;
    let id = create(&app, flag_sql()).await;
    let execute = json!({
        "calculations": [
            { "kind": "system_sql", "id_or_path": id, "display_name": "Flag" }
        ],
        "deal_tranche_map": { "1001": [] },
        "cycle_code": CYCLE,
        "report_level": "DEAL"
    });

    let (status, body) = send(&app, "POST", "/api/v1/execute", None, Some(execute.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/calculations/{id}/approve"),
        Some("reviewer@vantage.test"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved_by"], "reviewer@vantage.test");

    let (status, body) = send(&app, "POST", "/api/v1/execute", None, Some(execute)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["rows"][0]["deal_number"], 1001);
}

#[tokio::test]
async fn test_approving_aggregation_is_business_rule_violation() {
    let app = common::app().await;
    let id = create(&app, total_balance()).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/calculations/{id}/approve"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "BUSINESS_RULE_VIOLATION");
}

#[tokio::test]
async fn test_execute_and_preview_share_sql() {
    let app = common::app().await;
    let id = create(&app, total_balance()).await;
    let request = json!({
        "calculations": [
            { "kind": "user_aggregation", "id_or_path": id }
        ],
        "deal_tranche_map": { "1001": [], "1002": [] },
        "cycle_code": CYCLE,
        "report_level": "DEAL"
    });

    let (status, executed) = send(&app, "POST", "/api/v1/execute", None, Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK, "{executed}");
    assert_eq!(executed["rows"][0]["Total Balance"], "$3,000.75");
    assert_eq!(executed["rows"][1]["Total Balance"], "$500.25");

    let (status, preview) = send(&app, "POST", "/api/v1/preview", None, Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["sql"], executed["sql"]);
}

#[tokio::test]
async fn test_execute_without_calculations_is_validation_error() {
    let app = common::app().await;
    let request = json!({
        "calculations": [],
        "deal_tranche_map": { "1001": [] },
        "cycle_code": CYCLE,
        "report_level": "DEAL"
    });

    let (status, body) = send(&app, "POST", "/api/v1/execute", None, Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_preview_single_static_field() {
    let app = common::app().await;
    let request = json!({
        "calculation": { "kind": "static_field", "id_or_path": "deal.issr_cde" },
        "deal_tranche_map": { "1001": [] },
        "cycle_code": CYCLE,
        "report_level": "DEAL"
    });

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/preview/calculation",
        None,
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["sql"].as_str().unwrap().contains("issr_cde"));
}

#[tokio::test]
async fn test_saved_report_executes_for_cycle() {
    let app = common::app().await;
    let id = create(&app, total_balance()).await;
    let definition = json!({
        "name": "  Balances  ",
        "scope": "DEAL",
        "deal_tranche_map": { "1001": ["A"] },
        "calculations": [
            { "kind": "user_aggregation", "id_or_path": id, "display_name": "Balance" }
        ],
        "column_preferences": [
            { "column_id": "Balance", "display_name": "Ending Balance" }
        ]
    });

    let (status, saved) = send(&app, "POST", "/api/v1/reports", Some(USER), Some(definition)).await;
    assert_eq!(status, StatusCode::CREATED, "{saved}");
    assert_eq!(saved["name"], "Balances");
    let report_id = saved["id"].as_str().unwrap();

    let (status, result) = send(
        &app,
        "POST",
        &format!("/api/v1/reports/{report_id}/execute"),
        None,
        Some(json!({ "cycle_code": CYCLE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{result}");
    assert_eq!(result["rows"][0]["Balance"], "$1,000.50");
    let headers: Vec<&str> = result["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["header"].as_str().unwrap())
        .collect();
    assert!(headers.contains(&"Ending Balance"));

    let (status, list) = send(&app, "GET", "/api/v1/reports?scope=DEAL", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/reports/{report_id}"),
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/reports/{report_id}/preview"),
        None,
        Some(json!({ "cycle_code": CYCLE })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_warehouse_browsing() {
    let app = common::app().await;

    let (status, page) = send(&app, "GET", "/api/v1/warehouse/deals?page=1&per_page=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"][0]["dl_nbr"], 1001);
    assert_eq!(page["meta"]["total"], 2);
    assert_eq!(page["meta"]["total_pages"], 2);

    let (status, tranches) = send(&app, "GET", "/api/v1/warehouse/deals/1001/tranches", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tranches.as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "GET", "/api/v1/warehouse/deals/9999/tranches", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, cycles) = send(&app, "GET", "/api/v1/warehouse/cycles", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cycles["cycles"], json!([CYCLE]));

    let (status, fields) = send(&app, "GET", "/api/v1/warehouse/fields", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let tables: Vec<&str> = fields
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["table"].as_str().unwrap())
        .collect();
    assert_eq!(tables, ["Deal", "Tranche", "TrancheBalance"]);
}
