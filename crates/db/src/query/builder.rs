//! CTE query builder.
//!
//! Compiles a list of calculations plus a deal/tranche/cycle filter into one
//! `WITH` statement:
//!
//! - `base`: warehouse rows joined from `deal`, filtered, with one labeled
//!   column per source field
//! - `agg_{n}`: one grouped CTE per aggregated calculation
//! - `sql_{n}`: one CTE per SQL calculation, wrapping its text as a subquery
//! - a final `SELECT DISTINCT` from `base` left-joining every calculation CTE
//!
//! `build` and `preview` share one construction routine, so the SQL shown by
//! a preview is the SQL an execution runs.

use std::collections::{BTreeMap, BTreeSet};

use sea_orm::sea_query::{
    Alias, CommonTableExpression, Cond, Expr, Func, MysqlQueryBuilder, Order,
    PostgresQueryBuilder, Query, QueryStatementWriter, SelectStatement, SimpleExpr,
    SqliteQueryBuilder, WithClause, WithQuery,
};
use sea_orm::{DbBackend, Statement};
use vantage_core::calculation::{
    AggregationFunction, Calculation, CalculationDefinition, CalculationKind, GroupLevel,
};
use vantage_core::report::{
    CalculationDebug, DealTrancheFilter, FormatType, OutputColumn, PreviewResult, ReportError,
    ReportService,
};
use vantage_core::warehouse::{
    CYCLE_CODE_COLUMN, DEAL_NUMBER_COLUMN, FieldRef, TRANCHE_ID_COLUMN, WarehouseTable,
};

use super::error::QueryError;
use super::raw::RawSql;

/// Name of the base CTE.
pub const BASE_CTE: &str = "base";
/// Alias of a wrapped SQL calculation.
pub const RAW_SQL_ALIAS: &str = "raw_calc";
/// Deal key in generated SQL.
pub const DEAL_NUMBER: &str = "deal_number";
/// Tranche key in generated SQL.
pub const TRANCHE_ID: &str = "tranche_id";
/// Cycle column in generated SQL.
pub const CYCLE_CODE: &str = "cycle_code";

const CALC_DEAL_NUMBER: &str = "calc_deal_number";
const CALC_TRANCHE_ID: &str = "calc_tranche_id";

fn name(value: &str) -> Alias {
    Alias::new(value)
}

fn col(table: &str, column: &str) -> Expr {
    Expr::col((name(table), name(column)))
}

fn render<S: QueryStatementWriter>(statement: &S, backend: DbBackend) -> String {
    match backend {
        DbBackend::Postgres => statement.to_string(PostgresQueryBuilder),
        DbBackend::MySql => statement.to_string(MysqlQueryBuilder),
        DbBackend::Sqlite => statement.to_string(SqliteQueryBuilder),
    }
}

/// A compiled report query.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    query: WithQuery,
    backend: DbBackend,
    columns: Vec<OutputColumn>,
    debug: BTreeMap<String, CalculationDebug>,
    warnings: Vec<String>,
}

impl CompiledQuery {
    /// The statement AST.
    #[must_use]
    pub const fn query(&self) -> &WithQuery {
        &self.query
    }

    /// Backend the SQL is rendered for.
    #[must_use]
    pub const fn backend(&self) -> DbBackend {
        self.backend
    }

    /// Rendered SQL text, values inlined.
    #[must_use]
    pub fn sql(&self) -> String {
        render(&self.query, self.backend)
    }

    /// Executable statement carrying exactly [`Self::sql`].
    #[must_use]
    pub fn statement(&self) -> Statement {
        Statement::from_string(self.backend, self.sql())
    }

    /// Output columns in query order.
    #[must_use]
    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    /// Output column names in query order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Warnings raised while compiling (placeholder columns).
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Per-calculation SQL fragments keyed by display name.
    #[must_use]
    pub const fn debug(&self) -> &BTreeMap<String, CalculationDebug> {
        &self.debug
    }

    /// Converts into preview metadata.
    #[must_use]
    pub fn into_preview(self) -> PreviewResult {
        PreviewResult {
            sql: self.sql(),
            columns: self.column_names(),
            per_calculation_debug: self.debug,
            warnings: self.warnings,
        }
    }
}

/// Compiles calculations into a single CTE statement.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    backend: DbBackend,
    placeholders: BTreeMap<String, String>,
}

struct BasePlan {
    tables: BTreeSet<WarehouseTable>,
    has_tranche: bool,
    has_cycle: bool,
    fields: Vec<FieldRef>,
}

impl BasePlan {
    fn new(calculations: &[Calculation], filter: &DealTrancheFilter) -> Self {
        let mut tables = BTreeSet::from([WarehouseTable::Deal]);
        let mut fields: Vec<FieldRef> = Vec::new();
        for calc in calculations {
            tables.extend(calc.required_tables());
            for field in calc.source_fields() {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        // tranche subsets and tranche-level rows both need the tranche key
        if filter.report_level().is_tranche() || filter.has_tranche_restrictions() {
            tables.insert(WarehouseTable::Tranche);
        }
        Self {
            has_tranche: tables.contains(&WarehouseTable::Tranche),
            has_cycle: tables.contains(&WarehouseTable::TrancheBalance),
            tables,
            fields,
        }
    }

    fn labels(&self) -> Vec<String> {
        self.fields.iter().map(FieldRef::label).collect()
    }

    fn label_of(&self, calculation: &Calculation, field: &FieldRef) -> Result<String, QueryError> {
        if self.fields.contains(field) {
            return Ok(field.label());
        }
        let known = self.labels();
        tracing::error!(
            calculation = calculation.name(),
            column = %field.label(),
            known = ?known,
            "Base CTE is missing a calculation column"
        );
        Err(QueryError::MissingBaseColumn {
            calculation: calculation.name().to_string(),
            column: field.label(),
            known,
        })
    }
}

impl QueryBuilder {
    /// Creates a builder rendering for `backend`.
    #[must_use]
    pub const fn new(backend: DbBackend) -> Self {
        Self {
            backend,
            placeholders: BTreeMap::new(),
        }
    }

    /// Replaces the SQL calculation shown as `display_name` with a NULL column.
    #[must_use]
    pub fn with_placeholder(
        mut self,
        display_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        self.placeholders.insert(display_name.into(), reason.into());
        self
    }

    /// Backend the builder renders for.
    #[must_use]
    pub const fn backend(&self) -> DbBackend {
        self.backend
    }

    /// Compiles calculations into an executable query.
    pub fn build(
        &self,
        calculations: &[Calculation],
        filter: &DealTrancheFilter,
    ) -> Result<CompiledQuery, QueryError> {
        self.construct(calculations, filter)
    }

    /// Compiles calculations and returns the SQL and metadata instead.
    pub fn preview(
        &self,
        calculations: &[Calculation],
        filter: &DealTrancheFilter,
    ) -> Result<PreviewResult, QueryError> {
        Ok(self.construct(calculations, filter)?.into_preview())
    }

    /// Compile check for a SQL calculation.
    ///
    /// Selects the key and result columns from the wrapped text under a
    /// condition that matches nothing, so running it only proves the text
    /// compiles and returns the columns the wrapper reads. `None` for other
    /// kinds.
    #[must_use]
    pub fn probe(&self, calculation: &Calculation) -> Option<Statement> {
        let CalculationDefinition::RawSql {
            sql_text,
            result_column,
        } = calculation.definition()
        else {
            return None;
        };
        let mut select = Query::select();
        select.column((name(RAW_SQL_ALIAS), name(DEAL_NUMBER_COLUMN)));
        if calculation.group_level().is_tranche() {
            select.column((name(RAW_SQL_ALIAS), name(TRANCHE_ID_COLUMN)));
        }
        select
            .column((name(RAW_SQL_ALIAS), name(result_column)))
            .from_as(RawSql::new(sql_text.as_str()), name(RAW_SQL_ALIAS))
            .and_where(Expr::cust("1 = 0"));
        Some(Statement::from_string(
            self.backend,
            render(&select, self.backend),
        ))
    }

    fn construct(
        &self,
        calculations: &[Calculation],
        filter: &DealTrancheFilter,
    ) -> Result<CompiledQuery, QueryError> {
        if calculations.is_empty() {
            return Err(ReportError::NoCalculations.into());
        }
        let report_level = filter.report_level();
        // warehouse fields project from the base rows at any scope
        for calc in calculations
            .iter()
            .filter(|c| c.kind() != CalculationKind::RawField)
        {
            ReportService::check_scope(calc.display_name(), calc.group_level(), report_level)?;
        }
        ReportService::check_unique_columns(calculations.iter().map(Calculation::display_name))?;

        let plan = BasePlan::new(calculations, filter);

        let mut with = WithClause::new();
        with.cte(cte(BASE_CTE, base_select(&plan, filter)));

        let mut columns = vec![OutputColumn::new(DEAL_NUMBER, FormatType::Text)];
        let mut select = Query::select();
        select.distinct().column((name(BASE_CTE), name(DEAL_NUMBER)));
        if report_level.is_tranche() {
            select.column((name(BASE_CTE), name(TRANCHE_ID)));
            columns.push(OutputColumn::new(TRANCHE_ID, FormatType::Text));
        }
        if plan.has_cycle {
            select.column((name(BASE_CTE), name(CYCLE_CODE)));
            columns.push(OutputColumn::new(CYCLE_CODE, FormatType::Text));
        }

        let mut joins: Vec<(String, bool)> = Vec::new();
        let mut debug = BTreeMap::new();
        let mut warnings = Vec::new();

        for calc in calculations {
            let display = calc.display_name();
            let (cte_name, fragment) = match calc.definition() {
                CalculationDefinition::RawField { field } => {
                    let label = plan.label_of(calc, field)?;
                    select.expr_as(col(BASE_CTE, &label), name(display));
                    let fragment = Query::select()
                        .expr_as(col(BASE_CTE, &label), name(display))
                        .from(name(BASE_CTE))
                        .to_owned();
                    (None, render(&fragment, self.backend))
                }
                CalculationDefinition::Aggregated {
                    field,
                    function,
                    weight,
                } => {
                    let value = plan.label_of(calc, field)?;
                    let weight = weight
                        .as_ref()
                        .map(|w| plan.label_of(calc, w))
                        .transpose()?;
                    let cte_name = format!("agg_{}", joins.len() + 1);
                    let body = aggregation_select(calc, *function, &value, weight.as_deref());
                    let fragment = render(&body, self.backend);
                    with.cte(cte(&cte_name, body));
                    (Some(cte_name), fragment)
                }
                CalculationDefinition::RawSql {
                    sql_text,
                    result_column,
                } => {
                    if let Some(reason) = self.placeholders.get(display) {
                        warnings.push(format!("Calculation '{display}' returned NULL: {reason}"));
                        select.expr_as(Expr::cust("NULL"), name(display));
                        (None, "NULL".to_string())
                    } else {
                        let cte_name = format!("sql_{}", joins.len() + 1);
                        let body = raw_sql_select(calc, sql_text, result_column, filter);
                        let fragment = render(&body, self.backend);
                        with.cte(cte(&cte_name, body));
                        (Some(cte_name), fragment)
                    }
                }
            };

            if let Some(cte_name) = cte_name {
                select.expr_as(col(&cte_name, display), name(display));
                let on_tranche = calc.group_level().is_tranche() && report_level.is_tranche();
                joins.push((cte_name, on_tranche));
            }
            columns.push(OutputColumn::new(display, default_format(calc)));
            debug.insert(
                display.to_string(),
                CalculationDebug {
                    sql_fragment: fragment,
                    calculation_type: calc.kind(),
                    group_level: calc.group_level(),
                },
            );
        }

        select.from(name(BASE_CTE));
        for (cte_name, on_tranche) in &joins {
            let mut on = Cond::all().add(
                col(cte_name, CALC_DEAL_NUMBER).equals((name(BASE_CTE), name(DEAL_NUMBER))),
            );
            if *on_tranche {
                on = on.add(
                    col(cte_name, CALC_TRANCHE_ID).equals((name(BASE_CTE), name(TRANCHE_ID))),
                );
            }
            select.left_join(name(cte_name), on);
        }
        select.order_by(name(DEAL_NUMBER), Order::Asc);
        if report_level.is_tranche() {
            select.order_by(name(TRANCHE_ID), Order::Asc);
        }

        let compiled = CompiledQuery {
            query: select.with(with),
            backend: self.backend,
            columns,
            debug,
            warnings,
        };
        tracing::debug!(
            calculations = calculations.len(),
            deals = filter.deals().len(),
            cycle = filter.cycle_code(),
            level = %report_level,
            "Compiled report query"
        );
        Ok(compiled)
    }
}

fn cte(table: &str, select: SelectStatement) -> CommonTableExpression {
    CommonTableExpression::new()
        .query(select)
        .table_name(name(table))
        .to_owned()
}

fn default_format(calc: &Calculation) -> FormatType {
    match calc.definition() {
        CalculationDefinition::RawField { field } => FormatType::for_field(field.field_type()),
        CalculationDefinition::Aggregated {
            function: AggregationFunction::Count,
            ..
        } => FormatType::Number,
        CalculationDefinition::Aggregated { field, .. } => {
            FormatType::for_field(field.field_type())
        }
        CalculationDefinition::RawSql { .. } => FormatType::Text,
    }
}

/// `base`: every required table joined on natural keys, filtered.
fn base_select(plan: &BasePlan, filter: &DealTrancheFilter) -> SelectStatement {
    let deal = WarehouseTable::Deal.table_name();
    let tranche = WarehouseTable::Tranche.table_name();
    let balance = WarehouseTable::TrancheBalance.table_name();

    let mut select = Query::select();
    select.expr_as(col(deal, DEAL_NUMBER_COLUMN), name(DEAL_NUMBER));
    if plan.has_tranche {
        select.expr_as(col(tranche, TRANCHE_ID_COLUMN), name(TRANCHE_ID));
    }
    if plan.has_cycle {
        select.expr_as(col(balance, CYCLE_CODE_COLUMN), name(CYCLE_CODE));
    }
    for field in &plan.fields {
        select.expr_as(
            col(field.table.table_name(), field.column),
            name(&field.label()),
        );
    }

    select.from(name(deal));
    if plan.tables.contains(&WarehouseTable::Tranche) {
        select.inner_join(
            name(tranche),
            col(tranche, DEAL_NUMBER_COLUMN).equals((name(deal), name(DEAL_NUMBER_COLUMN))),
        );
    }
    if plan.tables.contains(&WarehouseTable::TrancheBalance) {
        select.inner_join(
            name(balance),
            Cond::all()
                .add(
                    col(balance, DEAL_NUMBER_COLUMN)
                        .equals((name(tranche), name(DEAL_NUMBER_COLUMN))),
                )
                .add(
                    col(balance, TRANCHE_ID_COLUMN)
                        .equals((name(tranche), name(TRANCHE_ID_COLUMN))),
                ),
        );
    }

    let mut condition = Cond::all();
    if plan.has_cycle {
        condition = condition.add(col(balance, CYCLE_CODE_COLUMN).eq(filter.cycle_code()));
    }
    let tranche_key = plan.has_tranche.then_some((tranche, TRANCHE_ID_COLUMN));
    condition = condition.add(deal_tranche_condition(
        filter,
        (deal, DEAL_NUMBER_COLUMN),
        tranche_key,
    ));
    select.cond_where(condition);
    select
}

/// OR of per-deal conditions: `deal = D AND tranche IN (...)` for restricted
/// deals, `deal = D` for deals selecting every tranche.
fn deal_tranche_condition(
    filter: &DealTrancheFilter,
    deal_key: (&str, &str),
    tranche_key: Option<(&str, &str)>,
) -> Cond {
    let mut any = Cond::any();
    for (deal, tranches) in filter.deals() {
        let deal_match = col(deal_key.0, deal_key.1).eq(*deal);
        any = match tranche_key {
            Some((table, column)) if !tranches.is_empty() => any.add(
                Cond::all()
                    .add(deal_match)
                    .add(col(table, column).is_in(tranches.iter().map(String::as_str))),
            ),
            _ => any.add(deal_match),
        };
    }
    any
}

/// `agg_{n}`: the aggregation grouped by the calculation's level.
fn aggregation_select(
    calc: &Calculation,
    function: AggregationFunction,
    value: &str,
    weight: Option<&str>,
) -> SelectStatement {
    let value_col = || col(BASE_CTE, value);
    let expr: SimpleExpr = match (function, weight) {
        (AggregationFunction::Sum, _) => Func::sum(value_col()).into(),
        (AggregationFunction::Avg, _) => Func::avg(value_col()).into(),
        (AggregationFunction::Count, _) => Func::count(value_col()).into(),
        (AggregationFunction::Min, _) => Func::min(value_col()).into(),
        (AggregationFunction::Max, _) => Func::max(value_col()).into(),
        (AggregationFunction::WeightedAvg, Some(weight)) => {
            let weighted = Func::sum(value_col().mul(col(BASE_CTE, weight)));
            let total = Func::sum(col(BASE_CTE, weight));
            Expr::expr(weighted).div(Func::cust(name("NULLIF")).arg(total).arg(0))
        }
        // construction guarantees a weight; an unweighted average is the degenerate case
        (AggregationFunction::WeightedAvg, None) => Func::avg(value_col()).into(),
    };

    let mut select = Query::select();
    select.expr_as(col(BASE_CTE, DEAL_NUMBER), name(CALC_DEAL_NUMBER));
    if calc.group_level().is_tranche() {
        select.expr_as(col(BASE_CTE, TRANCHE_ID), name(CALC_TRANCHE_ID));
    }
    select
        .expr_as(expr, name(calc.display_name()))
        .from(name(BASE_CTE))
        .group_by_col((name(BASE_CTE), name(DEAL_NUMBER)));
    if calc.group_level().is_tranche() {
        select.group_by_col((name(BASE_CTE), name(TRANCHE_ID)));
    }
    select
}

/// `sql_{n}`: the SQL text wrapped as `raw_calc`, filtered from outside.
fn raw_sql_select(
    calc: &Calculation,
    sql_text: &str,
    result_column: &str,
    filter: &DealTrancheFilter,
) -> SelectStatement {
    let tranche_level = calc.group_level() == GroupLevel::Tranche;

    let mut select = Query::select();
    select.expr_as(
        col(RAW_SQL_ALIAS, DEAL_NUMBER_COLUMN),
        name(CALC_DEAL_NUMBER),
    );
    if tranche_level {
        select.expr_as(col(RAW_SQL_ALIAS, TRANCHE_ID_COLUMN), name(CALC_TRANCHE_ID));
    }
    select
        .expr_as(col(RAW_SQL_ALIAS, result_column), name(calc.display_name()))
        .from_as(RawSql::new(sql_text), name(RAW_SQL_ALIAS));

    let condition = if tranche_level {
        deal_tranche_condition(
            filter,
            (RAW_SQL_ALIAS, DEAL_NUMBER_COLUMN),
            Some((RAW_SQL_ALIAS, TRANCHE_ID_COLUMN)),
        )
    } else {
        Cond::all().add(col(RAW_SQL_ALIAS, DEAL_NUMBER_COLUMN).is_in(filter.deal_numbers()))
    };
    select.cond_where(condition);
    select
}

