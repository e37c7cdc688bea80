//! Tests for report validation and result shaping.

use proptest::prelude::*;
use rstest::rstest;
use rust_decimal_macros::dec;

use super::*;
use crate::calculation::GroupLevel;

fn static_ref(path: &str, display_name: &str) -> CalculationRef {
    CalculationRef::new(CalculationRefKind::StaticField, path, display_name)
}

fn definition() -> ReportDefinition {
    ReportDefinition {
        name: "Monthly balances".to_string(),
        description: None,
        scope: GroupLevel::Deal,
        deal_tranche_map: DealTrancheMap::from([(1001, vec!["A".to_string()]), (1002, vec![])]),
        calculations: vec![static_ref("deal.issr_cde", "Issuer")],
        column_preferences: vec![],
    }
}

#[test]
fn test_empty_deal_map_is_rejected() {
    let err = DealTrancheFilter::new(DealTrancheMap::new(), 202_404, GroupLevel::Deal).unwrap_err();
    assert_eq!(err, ReportError::NoDealsSelected);
}

#[test]
fn test_filter_normalizes_tranche_ids() {
    let filter = DealTrancheFilter::new(
        DealTrancheMap::from([(1001, vec![" B".to_string(), "A".to_string(), "B".to_string()])]),
        202_404,
        GroupLevel::Tranche,
    )
    .unwrap();
    assert_eq!(filter.deals()[&1001], vec!["A", "B"]);
    assert!(filter.has_tranche_restrictions());
    assert_eq!(filter.cycle_code(), 202_404);
}

#[test]
fn test_filter_rejects_blank_tranche_id() {
    let err = DealTrancheFilter::new(
        DealTrancheMap::from([(7, vec![String::new()])]),
        202_404,
        GroupLevel::Deal,
    )
    .unwrap_err();
    assert_eq!(err, ReportError::EmptyTrancheId(7));
}

#[test]
fn test_request_without_calculations_fails_before_deals() {
    let request = ExecutionRequest {
        calculations: vec![],
        deal_tranche_map: DealTrancheMap::new(),
        cycle_code: 202_404,
        report_level: GroupLevel::Deal,
    };
    assert_eq!(request.filter().unwrap_err(), ReportError::NoCalculations);
}

#[test]
fn test_valid_definition() {
    assert!(ReportService::validate_definition(&definition()).is_ok());
}

#[rstest]
#[case::blank_name(|d: &mut ReportDefinition| d.name = "  ".to_string(), ReportError::EmptyName)]
#[case::no_calcs(|d: &mut ReportDefinition| d.calculations.clear(), ReportError::NoCalculations)]
#[case::no_deals(|d: &mut ReportDefinition| d.deal_tranche_map.clear(), ReportError::NoDealsSelected)]
#[case::duplicate(
    |d: &mut ReportDefinition| d.calculations.push(static_ref("deal.cdi_file_nme", "issuer")),
    ReportError::DuplicateColumn("issuer".to_string())
)]
#[case::reserved(
    |d: &mut ReportDefinition| d.calculations.push(static_ref("deal.dl_nbr", "Deal_Number")),
    ReportError::Calculation(crate::calculation::CalculationError::InvalidDisplayName {
        name: "Deal_Number".to_string(),
        reason: "is reserved for report key columns".to_string(),
    })
)]
fn test_invalid_definitions(
    #[case] mutate: fn(&mut ReportDefinition),
    #[case] expected: ReportError,
) {
    let mut definition = definition();
    mutate(&mut definition);
    assert_eq!(
        ReportService::validate_definition(&definition).unwrap_err(),
        expected
    );
}

#[test]
fn test_scope_rule() {
    assert!(ReportService::check_scope("x", GroupLevel::Tranche, GroupLevel::Deal).is_ok());
    assert!(ReportService::check_scope("x", GroupLevel::Tranche, GroupLevel::Tranche).is_ok());
    assert!(matches!(
        ReportService::check_scope("Bal", GroupLevel::Deal, GroupLevel::Tranche),
        Err(ReportError::ScopeMismatch { ref calculation, .. }) if calculation == "Bal"
    ));
}

#[test]
fn test_definition_json_shape() {
    let json = serde_json::json!({
        "name": "R",
        "scope": "TRANCHE",
        "deal_tranche_map": { "1001": ["A"], "1002": [] },
        "calculations": [
            { "kind": "user_aggregation", "id_or_path": "0193a2b4-0000-7000-8000-000000000000", "display_name": "Total" }
        ],
        "column_preferences": [
            { "column_id": "Total", "format_type": "currency", "display_order": 1 }
        ]
    });
    let definition: ReportDefinition = serde_json::from_value(json).unwrap();
    assert_eq!(definition.scope, GroupLevel::Tranche);
    assert_eq!(definition.deal_tranche_map[&1002], Vec::<String>::new());
    assert!(definition.column_preferences[0].is_visible);
    assert_eq!(
        definition.column_preferences[0].format_type,
        Some(FormatType::Currency)
    );

    let request = definition.request(202_404);
    assert_eq!(request.report_level, GroupLevel::Tranche);
    assert_eq!(request.cycle_code, 202_404);
}

fn shaped_fixture() -> (Vec<OutputColumn>, Vec<ResultRow>) {
    let columns = vec![
        OutputColumn::new("deal_number", FormatType::Text),
        OutputColumn::new("Total Balance", FormatType::Currency),
        OutputColumn::new("Rate", FormatType::Percentage),
        OutputColumn::new("Issuer", FormatType::Text),
    ];
    let rows = vec![ResultRow::from([
        ("deal_number".to_string(), CellValue::Integer(1001)),
        ("Total Balance".to_string(), CellValue::Decimal(dec!(2500000))),
        ("Rate".to_string(), CellValue::Decimal(dec!(0.0525))),
        ("Issuer".to_string(), CellValue::Null),
    ])];
    (columns, rows)
}

#[test]
fn test_default_shaping_formats_by_column() {
    let (columns, rows) = shaped_fixture();
    let shaped = ReportService::apply_column_preferences(&columns, rows, &[]);

    let fields: Vec<&str> = shaped.columns.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, ["deal_number", "Total Balance", "Rate", "Issuer"]);
    let row = &shaped.rows[0];
    assert_eq!(row["deal_number"], CellValue::Integer(1001));
    assert_eq!(row["Total Balance"], CellValue::from("$2,500,000.00"));
    assert_eq!(row["Rate"], CellValue::from("5.25%"));
    assert_eq!(row["Issuer"], CellValue::Null);
    assert!(shaped.warnings.is_empty());
}

#[test]
fn test_preferences_hide_reorder_rename() {
    let (columns, rows) = shaped_fixture();
    let preferences = vec![
        ColumnPreference {
            column_id: "Rate".to_string(),
            display_name: Some("Pass-through".to_string()),
            is_visible: true,
            display_order: Some(0),
            format_type: Some(FormatType::Number),
        },
        ColumnPreference {
            column_id: "Issuer".to_string(),
            display_name: None,
            is_visible: false,
            display_order: None,
            format_type: None,
        },
        ColumnPreference {
            column_id: "Gone".to_string(),
            display_name: None,
            is_visible: true,
            display_order: None,
            format_type: None,
        },
    ];

    let shaped = ReportService::apply_column_preferences(&columns, rows, &preferences);

    let headers: Vec<&str> = shaped.columns.iter().map(|c| c.header.as_str()).collect();
    assert_eq!(headers, ["Pass-through", "deal_number", "Total Balance"]);
    assert_eq!(shaped.columns[0].display_order, 0);
    assert_eq!(shaped.columns[2].display_order, 2);
    assert_eq!(shaped.rows[0]["Rate"], CellValue::from("0.0525"));
    assert!(!shaped.rows[0].contains_key("Issuer"));
    assert_eq!(shaped.warnings.len(), 1);
}

proptest! {
    /// Shaping never invents or drops rows, and every row carries exactly the
    /// visible columns.
    #[test]
    fn test_shaping_preserves_row_count(
        values in prop::collection::vec(proptest::option::of(-1_000_000i64..1_000_000), 0..20),
        hide_total in any::<bool>(),
    ) {
        let columns = vec![
            OutputColumn::new("deal_number", FormatType::Text),
            OutputColumn::new("Total", FormatType::Currency),
        ];
        let rows: Vec<ResultRow> = values
            .iter()
            .enumerate()
            .map(|(i, v)| ResultRow::from([
                ("deal_number".to_string(), CellValue::Integer(i64::try_from(i).unwrap())),
                ("Total".to_string(), CellValue::from(*v)),
            ]))
            .collect();
        let preferences = vec![ColumnPreference {
            column_id: "Total".to_string(),
            display_name: None,
            is_visible: !hide_total,
            display_order: None,
            format_type: None,
        }];

        let shaped = ReportService::apply_column_preferences(&columns, rows, &preferences);

        prop_assert_eq!(shaped.rows.len(), values.len());
        let expected_width = if hide_total { 1 } else { 2 };
        prop_assert_eq!(shaped.columns.len(), expected_width);
        for row in &shaped.rows {
            prop_assert_eq!(row.len(), expected_width);
        }
    }
}
