//! Tests for calculation construction and validation.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rstest::rstest;

use super::*;
use crate::warehouse::{SchemaError, WarehouseTable};

#[test]
fn test_raw_field_takes_the_table_level() {
    let calc = Calculation::raw_field("Issuer", "deal", "issr_cde").unwrap();
    assert_eq!(calc.group_level(), GroupLevel::Deal);
    assert_eq!(calc.kind(), CalculationKind::RawField);
    assert_eq!(calc.display_name(), "Issuer");
    assert_eq!(
        calc.required_tables(),
        BTreeSet::from([WarehouseTable::Deal])
    );

    let calc = Calculation::raw_field("Cusip", "tranche", "tr_cusip_id").unwrap();
    assert_eq!(calc.group_level(), GroupLevel::Tranche);
    assert_eq!(
        calc.required_tables(),
        BTreeSet::from([WarehouseTable::Deal, WarehouseTable::Tranche])
    );
}

#[test]
fn test_deal_level_raw_field_must_come_from_deal() {
    let err = Calculation::raw_field_at("Bal", GroupLevel::Deal, "tranchebal", "tr_end_bal_amt")
        .unwrap_err();
    assert!(matches!(err, CalculationError::GroupLevelMismatch { .. }));
}

#[test]
fn test_unknown_field_is_a_schema_error() {
    let err = Calculation::raw_field("Nope", "deal", "missing").unwrap_err();
    assert!(matches!(
        err,
        CalculationError::Schema(SchemaError::FieldNotFound { .. })
    ));
}

#[test]
fn test_weighted_average_requires_weight() {
    let err = Calculation::aggregated(
        "Rate",
        GroupLevel::Deal,
        "tranchebal",
        "tr_pass_thru_rte",
        AggregationFunction::WeightedAvg,
        None,
    )
    .unwrap_err();
    assert_eq!(err, CalculationError::MissingWeightColumn);

    let err = Calculation::aggregated(
        "Rate",
        GroupLevel::Deal,
        "tranchebal",
        "tr_pass_thru_rte",
        AggregationFunction::WeightedAvg,
        Some("  "),
    )
    .unwrap_err();
    assert_eq!(err, CalculationError::MissingWeightColumn);
}

#[test]
fn test_weight_only_allowed_for_weighted_average() {
    let err = Calculation::aggregated(
        "Total",
        GroupLevel::Deal,
        "tranchebal",
        "tr_end_bal_amt",
        AggregationFunction::Sum,
        Some("tr_end_bal_amt"),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CalculationError::UnexpectedWeightColumn(AggregationFunction::Sum)
    );
}

#[test]
fn test_weighted_average_sources() {
    let calc = Calculation::aggregated(
        "Rate",
        GroupLevel::Deal,
        "tranchebal",
        "tr_pass_thru_rte",
        AggregationFunction::WeightedAvg,
        Some("tr_end_bal_amt"),
    )
    .unwrap();

    let labels: Vec<String> = calc.source_fields().iter().map(|f| f.label()).collect();
    assert_eq!(
        labels,
        vec!["tranchebal_tr_pass_thru_rte", "tranchebal_tr_end_bal_amt"]
    );
    assert_eq!(
        calc.required_tables(),
        BTreeSet::from(WarehouseTable::ALL)
    );
}

#[rstest]
#[case(AggregationFunction::Sum, false)]
#[case(AggregationFunction::Avg, false)]
#[case(AggregationFunction::Count, true)]
#[case(AggregationFunction::Min, true)]
#[case(AggregationFunction::Max, true)]
fn test_text_fields_only_take_non_numeric_functions(
    #[case] function: AggregationFunction,
    #[case] allowed: bool,
) {
    let result = Calculation::aggregated(
        "Cusips",
        GroupLevel::Deal,
        "tranche",
        "tr_cusip_id",
        function,
        None,
    );
    assert_eq!(result.is_ok(), allowed);
    if !allowed {
        assert!(matches!(
            result,
            Err(CalculationError::NonNumericField { .. })
        ));
    }
}

#[test]
fn test_raw_sql_text_is_kept_verbatim() {
    let sql = "  SELECT dl_nbr, COUNT(*) AS n\n  FROM tranche GROUP BY dl_nbr  ";
    let calc = Calculation::raw_sql("Tranche Count", GroupLevel::Deal, sql, "n").unwrap();
    match calc.definition() {
        CalculationDefinition::RawSql {
            sql_text,
            result_column,
        } => {
            assert_eq!(sql_text, sql);
            assert_eq!(result_column, "n");
        }
        other => panic!("unexpected definition: {other:?}"),
    }
    assert_eq!(
        calc.required_tables(),
        BTreeSet::from([WarehouseTable::Deal])
    );
}

#[rstest]
#[case("", CalculationError::EmptySql)]
#[case("   ", CalculationError::EmptySql)]
#[case("DELETE FROM deal", CalculationError::SqlNotSelect)]
#[case("SELECT dl_nbr, 1 AS x FROM deal;", CalculationError::TrailingSemicolon)]
fn test_raw_sql_text_rejections(#[case] sql: &str, #[case] expected: CalculationError) {
    let err = Calculation::raw_sql("Calc", GroupLevel::Deal, sql, "x").unwrap_err();
    assert_eq!(err, expected);
}

#[rstest]
#[case("1abc")]
#[case("has space")]
#[case("semi;colon")]
#[case("dl_nbr")]
#[case("TR_ID")]
#[case("")]
fn test_invalid_result_columns(#[case] column: &str) {
    let err = Calculation::raw_sql("Calc", GroupLevel::Deal, "SELECT 1", column).unwrap_err();
    assert!(matches!(err, CalculationError::InvalidResultColumn(_)));
}

#[rstest]
#[case("deal_number")]
#[case("Tranche_Id")]
#[case("cycle_code")]
#[case("calc_deal_number")]
#[case("line\nbreak")]
fn test_reserved_or_unprintable_display_names(#[case] name: &str) {
    assert!(matches!(
        validate_display_name(name),
        Err(CalculationError::InvalidDisplayName { .. })
    ));
}

#[test]
fn test_display_name_length_limit() {
    assert!(validate_display_name(&"a".repeat(MAX_DISPLAY_NAME_LEN)).is_ok());
    assert!(validate_display_name(&"a".repeat(MAX_DISPLAY_NAME_LEN + 1)).is_err());
}

#[test]
fn test_with_display_name_overrides_header() {
    let calc = Calculation::raw_field("deal.dl_nbr", "deal", "dl_nbr")
        .unwrap()
        .with_display_name("Deal Number")
        .unwrap();
    assert_eq!(calc.name(), "deal.dl_nbr");
    assert_eq!(calc.display_name(), "Deal Number");
}

#[test]
fn test_blank_name_is_rejected() {
    let err = Calculation::raw_field("  ", "deal", "dl_nbr").unwrap_err();
    assert_eq!(err, CalculationError::EmptyName);
}

#[test]
fn test_cdi_variable_expands_to_sql() {
    let variant = SystemCalculationVariant::CdiVariable {
        variable_name: "#RPT_RRI_M1".to_string(),
        result_column: "rri_m1".to_string(),
    };
    let calc = Calculation::system("RRI M1", GroupLevel::Deal, &variant, 202_404).unwrap();
    match calc.definition() {
        CalculationDefinition::RawSql {
            sql_text,
            result_column,
        } => {
            assert_eq!(
                sql_text,
                "SELECT dl_nbr, dl_cdi_var_value AS rri_m1 FROM deal_cdi_var_rpt \
                 WHERE dl_cdi_var_nme = '#RPT_RRI_M1' AND cycle_cde = 202404"
            );
            assert_eq!(result_column, "rri_m1");
        }
        other => panic!("unexpected definition: {other:?}"),
    }
}

#[test]
fn test_cdi_variable_is_deal_level_only() {
    let variant = SystemCalculationVariant::CdiVariable {
        variable_name: "RRI".to_string(),
        result_column: "rri".to_string(),
    };
    assert_eq!(
        Calculation::system("RRI", GroupLevel::Tranche, &variant, 202_404).unwrap_err(),
        CalculationError::CdiVariableTrancheLevel
    );
    assert_eq!(
        validate_system_variant(GroupLevel::Tranche, &variant).unwrap_err(),
        CalculationError::CdiVariableTrancheLevel
    );
}

#[test]
fn test_cdi_variable_name_characters() {
    let variant = SystemCalculationVariant::CdiVariable {
        variable_name: "x' OR '1'='1".to_string(),
        result_column: "x".to_string(),
    };
    assert!(matches!(
        validate_system_variant(GroupLevel::Deal, &variant),
        Err(CalculationError::InvalidCdiVariable(_))
    ));
}

#[test]
fn test_system_variant_serde_tag() {
    let variant: SystemCalculationVariant = serde_json::from_value(serde_json::json!({
        "variant": "sql",
        "sql_text": "SELECT dl_nbr, 1 AS one FROM deal",
        "result_column": "one"
    }))
    .unwrap();
    assert_eq!(variant.as_str(), "sql");
    assert_eq!(variant.result_column(), "one");
}

#[rstest]
#[case("deal", Some(GroupLevel::Deal))]
#[case("TRANCHE", Some(GroupLevel::Tranche))]
#[case("cycle", None)]
fn test_group_level_parse(#[case] input: &str, #[case] expected: Option<GroupLevel>) {
    assert_eq!(GroupLevel::parse(input), expected);
}

#[test]
fn test_group_level_fits_report() {
    assert!(GroupLevel::Deal.fits_report(GroupLevel::Deal));
    assert!(GroupLevel::Tranche.fits_report(GroupLevel::Deal));
    assert!(GroupLevel::Tranche.fits_report(GroupLevel::Tranche));
    assert!(!GroupLevel::Deal.fits_report(GroupLevel::Tranche));
}

#[test]
fn test_function_names_round_trip_storage_form() {
    for function in [
        AggregationFunction::Sum,
        AggregationFunction::Avg,
        AggregationFunction::Count,
        AggregationFunction::Min,
        AggregationFunction::Max,
        AggregationFunction::WeightedAvg,
    ] {
        assert_eq!(AggregationFunction::parse(function.as_str()), Some(function));
    }
    assert_eq!(
        AggregationFunction::parse("weighted_avg"),
        Some(AggregationFunction::WeightedAvg)
    );
}

proptest! {
    /// Identifiers accepted as result columns always start with a letter and
    /// never contain characters that could close a quoted name.
    #[test]
    fn test_identifier_shape(value in "[A-Za-z][A-Za-z0-9_]{0,20}") {
        prop_assert!(is_identifier(&value));
    }

    #[test]
    fn test_non_identifier_characters_rejected(
        prefix in "[a-z]{1,5}",
        bad in "[ \"';().-]",
        suffix in "[a-z]{0,5}",
    ) {
        let value = format!("{prefix}{bad}{suffix}");
        prop_assert!(!is_identifier(&value));
    }

    /// Any SELECT text without a trailing terminator passes the structural check
    /// and survives construction unchanged.
    #[test]
    fn test_select_text_survives_construction(body in "[a-z0-9_ ,()*]{0,40}") {
        let sql = format!("SELECT dl_nbr, {body} AS v FROM deal");
        let calc = Calculation::raw_sql("Calc", GroupLevel::Deal, sql.clone(), "v").unwrap();
        match calc.definition() {
            CalculationDefinition::RawSql { sql_text, .. } => prop_assert_eq!(sql_text, &sql),
            _ => prop_assert!(false),
        }
    }
}

#[test]
fn test_source_serde_shape() {
    let source: CalculationSource = serde_json::from_value(serde_json::json!({
        "calculation_type": "AGGREGATED",
        "source_table": "TrancheBalance",
        "source_column": "tr_pass_thru_rte",
        "aggregation_function": "WEIGHTED_AVG",
        "weight_column": "tr_end_bal_amt",
    }))
    .unwrap();
    assert_eq!(source.kind(), CalculationKind::Aggregated);
    assert!(!source.requires_approval());

    let source: CalculationSource = serde_json::from_value(serde_json::json!({
        "calculation_type": "RAW_SQL",
        "variant": "cdi_variable",
        "variable_name": "#OC_TRIGGER",
        "result_column": "oc_trigger",
    }))
    .unwrap();
    assert_eq!(source.kind(), CalculationKind::RawSql);
    assert!(source.requires_approval());
}

#[test]
fn test_source_validation_matches_constructors() {
    let missing_weight = CalculationSource::Aggregated {
        source_table: "tranchebal".to_string(),
        source_column: "tr_pass_thru_rte".to_string(),
        aggregation_function: AggregationFunction::WeightedAvg,
        weight_column: None,
    };
    assert_eq!(
        missing_weight.validate("WA Rate", GroupLevel::Deal),
        Err(CalculationError::MissingWeightColumn)
    );

    let cdi = CalculationSource::System(SystemCalculationVariant::CdiVariable {
        variable_name: "#OC_TRIGGER".to_string(),
        result_column: "oc".to_string(),
    });
    assert!(cdi.validate("OC Trigger", GroupLevel::Deal).is_ok());
    assert_eq!(
        cdi.validate("OC Trigger", GroupLevel::Tranche),
        Err(CalculationError::CdiVariableTrancheLevel)
    );

    let sql = CalculationSource::System(SystemCalculationVariant::Sql {
        sql_text: "SELECT dl_nbr, 1 AS one FROM deal;".to_string(),
        result_column: "one".to_string(),
    });
    assert_eq!(
        sql.validate("One", GroupLevel::Deal),
        Err(CalculationError::TrailingSemicolon)
    );
}

#[test]
fn test_source_binds_cycle_for_cdi_variables() {
    let cdi = CalculationSource::System(SystemCalculationVariant::CdiVariable {
        variable_name: "#OC_TRIGGER".to_string(),
        result_column: "oc".to_string(),
    });
    let calc = cdi
        .to_calculation("OC Trigger", GroupLevel::Deal, 202_404)
        .unwrap();
    match calc.definition() {
        CalculationDefinition::RawSql { sql_text, .. } => {
            assert!(sql_text.ends_with("cycle_cde = 202404"));
        }
        other => panic!("unexpected definition {other:?}"),
    }
}
