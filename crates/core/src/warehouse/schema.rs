//! Static description of the warehouse tables the engine reads from.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::SchemaError;

/// Deal key column, present on every warehouse table.
pub const DEAL_NUMBER_COLUMN: &str = "dl_nbr";
/// Tranche key column, present on `tranche` and `tranchebal`.
pub const TRANCHE_ID_COLUMN: &str = "tr_id";
/// Reporting cycle column on `tranchebal`.
pub const CYCLE_CODE_COLUMN: &str = "cycle_cde";

/// Semantic type of a warehouse column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Plain number (counts, days, identifiers).
    Number,
    /// Free text.
    String,
    /// Monetary amount.
    Currency,
    /// Rate stored as a fraction.
    Percentage,
    /// Calendar date.
    Date,
}

impl FieldType {
    /// Whether values of this type can be summed or averaged.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Currency | Self::Percentage)
    }
}

/// A column of a warehouse table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Physical column name.
    pub name: &'static str,
    /// Semantic type.
    pub field_type: FieldType,
    /// Short description shown in field pickers.
    pub description: &'static str,
}

const fn col(name: &'static str, field_type: FieldType, description: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        field_type,
        description,
    }
}

const DEAL_COLUMNS: &[ColumnDef] = &[
    col(DEAL_NUMBER_COLUMN, FieldType::Number, "Deal number"),
    col("issr_cde", FieldType::String, "Issuer code"),
    col("cdi_file_nme", FieldType::String, "CDI file name"),
    col("CDB_cdi_file_nme", FieldType::String, "CDB CDI file name"),
];

const TRANCHE_COLUMNS: &[ColumnDef] = &[
    col(DEAL_NUMBER_COLUMN, FieldType::Number, "Deal number"),
    col(TRANCHE_ID_COLUMN, FieldType::String, "Tranche identifier"),
    col("tr_cusip_id", FieldType::String, "Tranche CUSIP"),
];

const TRANCHE_BALANCE_COLUMNS: &[ColumnDef] = &[
    col(DEAL_NUMBER_COLUMN, FieldType::Number, "Deal number"),
    col(TRANCHE_ID_COLUMN, FieldType::String, "Tranche identifier"),
    col(CYCLE_CODE_COLUMN, FieldType::Number, "Reporting cycle"),
    col("tr_end_bal_amt", FieldType::Currency, "Ending balance"),
    col("tr_pass_thru_rte", FieldType::Percentage, "Pass-through rate"),
    col("tr_accrl_days", FieldType::Number, "Accrual days"),
    col("tr_int_accrl_amt", FieldType::Currency, "Interest accrual"),
    col("tr_int_dstrb_amt", FieldType::Currency, "Interest distribution"),
    col("tr_prin_dstrb_amt", FieldType::Currency, "Principal distribution"),
    col("tr_prin_rel_ls_amt", FieldType::Currency, "Principal realized loss"),
    col("tr_cash_dstrb_amt", FieldType::Currency, "Cash distribution"),
];

/// The three warehouse entities.
///
/// Ordering follows the join chain: `Deal` < `Tranche` < `TrancheBalance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WarehouseTable {
    /// `deal`, keyed by `dl_nbr`.
    Deal,
    /// `tranche`, keyed by `(dl_nbr, tr_id)`.
    Tranche,
    /// `tranchebal`, keyed by `(dl_nbr, tr_id, cycle_cde)`.
    TrancheBalance,
}

impl WarehouseTable {
    /// All tables in join order.
    pub const ALL: [Self; 3] = [Self::Deal, Self::Tranche, Self::TrancheBalance];

    /// Physical table name.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Tranche => "tranche",
            Self::TrancheBalance => "tranchebal",
        }
    }

    /// Logical entity name.
    #[must_use]
    pub const fn logical_name(self) -> &'static str {
        match self {
            Self::Deal => "Deal",
            Self::Tranche => "Tranche",
            Self::TrancheBalance => "TrancheBalance",
        }
    }

    /// Parses either the logical or the physical name, ignoring case.
    pub fn parse(name: &str) -> Result<Self, SchemaError> {
        let trimmed = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| {
                t.table_name().eq_ignore_ascii_case(trimmed)
                    || t.logical_name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| SchemaError::TableNotFound(trimmed.to_string()))
    }

    /// Tables that must be joined, starting from `deal`, to reach this one.
    #[must_use]
    pub const fn join_path(self) -> &'static [Self] {
        match self {
            Self::Deal => &[Self::Deal],
            Self::Tranche => &[Self::Deal, Self::Tranche],
            Self::TrancheBalance => &[Self::Deal, Self::Tranche, Self::TrancheBalance],
        }
    }

    /// Columns declared for this table.
    #[must_use]
    pub const fn columns(self) -> &'static [ColumnDef] {
        match self {
            Self::Deal => DEAL_COLUMNS,
            Self::Tranche => TRANCHE_COLUMNS,
            Self::TrancheBalance => TRANCHE_BALANCE_COLUMNS,
        }
    }

    /// Looks up a column by name, ignoring case.
    pub fn column(self, name: &str) -> Result<&'static ColumnDef, SchemaError> {
        let trimmed = name.trim();
        self.columns()
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SchemaError::FieldNotFound {
                table: self.table_name().to_string(),
                column: trimmed.to_string(),
            })
    }

    /// Whether rows of this table are per tranche.
    #[must_use]
    pub const fn is_tranche_scoped(self) -> bool {
        !matches!(self, Self::Deal)
    }
}

impl fmt::Display for WarehouseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A resolved `table.column` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    /// Owning table.
    pub table: WarehouseTable,
    /// Canonical column name.
    pub column: &'static str,
}

impl FieldRef {
    /// Resolves a table and column name against the schema.
    pub fn resolve(table: &str, column: &str) -> Result<Self, SchemaError> {
        let table = WarehouseTable::parse(table)?;
        let column = table.column(column)?;
        Ok(Self {
            table,
            column: column.name,
        })
    }

    /// Parses a dotted `table.column` path.
    pub fn parse_path(path: &str) -> Result<Self, SchemaError> {
        let (table, column) = path
            .trim()
            .split_once('.')
            .ok_or_else(|| SchemaError::InvalidFieldPath(path.to_string()))?;
        Self::resolve(table, column)
    }

    /// Column label inside the base CTE: `{table}_{column}`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}_{}", self.table.table_name(), self.column)
    }

    /// Semantic type of the column.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.table
            .columns()
            .iter()
            .find(|c| c.name == self.column)
            .map_or(FieldType::String, |c| c.field_type)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table.table_name(), self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("deal", WarehouseTable::Deal)]
    #[case("Deal", WarehouseTable::Deal)]
    #[case("TRANCHE", WarehouseTable::Tranche)]
    #[case("tranchebal", WarehouseTable::TrancheBalance)]
    #[case("TrancheBalance", WarehouseTable::TrancheBalance)]
    fn test_parse_table_names(#[case] input: &str, #[case] expected: WarehouseTable) {
        assert_eq!(WarehouseTable::parse(input).unwrap(), expected);
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        let err = WarehouseTable::parse("loans").unwrap_err();
        assert!(matches!(err, SchemaError::TableNotFound(ref t) if t == "loans"));
    }

    #[test]
    fn test_join_paths_start_at_deal() {
        for table in WarehouseTable::ALL {
            let path = table.join_path();
            assert_eq!(path[0], WarehouseTable::Deal);
            assert_eq!(*path.last().unwrap(), table);
        }
        assert_eq!(WarehouseTable::TrancheBalance.join_path().len(), 3);
    }

    #[test]
    fn test_column_lookup() {
        let column = WarehouseTable::TrancheBalance
            .column("tr_end_bal_amt")
            .unwrap();
        assert_eq!(column.field_type, FieldType::Currency);

        let column = WarehouseTable::Deal.column("cdb_cdi_file_nme").unwrap();
        assert_eq!(column.name, "CDB_cdi_file_nme");

        let err = WarehouseTable::Deal.column("tr_end_bal_amt").unwrap_err();
        assert!(matches!(err, SchemaError::FieldNotFound { .. }));
    }

    #[test]
    fn test_field_path_parsing() {
        let field = FieldRef::parse_path("tranchebal.tr_pass_thru_rte").unwrap();
        assert_eq!(field.table, WarehouseTable::TrancheBalance);
        assert_eq!(field.label(), "tranchebal_tr_pass_thru_rte");
        assert_eq!(field.field_type(), FieldType::Percentage);
        assert_eq!(field.to_string(), "tranchebal.tr_pass_thru_rte");

        assert!(matches!(
            FieldRef::parse_path("dl_nbr"),
            Err(SchemaError::InvalidFieldPath(_))
        ));
        assert!(matches!(
            FieldRef::parse_path("deal.nope"),
            Err(SchemaError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_every_table_carries_the_deal_key() {
        for table in WarehouseTable::ALL {
            assert!(table.column(DEAL_NUMBER_COLUMN).is_ok());
        }
        assert!(WarehouseTable::Deal.column(TRANCHE_ID_COLUMN).is_err());
    }
}
