//! Calculation resolver.
//!
//! Turns calculation references into builder-ready calculations, compiles
//! them into one statement, runs it on the warehouse and shapes the rows.
//! Preview and execution share every step up to running the statement.

mod decode;
mod error;

use std::time::Duration;

use sea_orm::{ConnectionTrait, DatabaseConnection, QueryResult, Statement};
use vantage_core::calculation::{Calculation, CalculationError, GroupLevel};
use vantage_core::report::{
    CalculationRef, CalculationRefKind, ColumnPreference, DealTrancheFilter, DealTrancheMap,
    ExecutionRequest, ExecutionResult, PreviewResult, ReportDefinition, ReportError,
    ReportService,
};
use vantage_core::warehouse::FieldRef;
use vantage_shared::QuerySettings;
use vantage_shared::types::CalculationId;

use crate::query::{CompiledQuery, QueryBuilder};
use crate::repositories::{CalculationRepository, CalculationStoreError, source_of};

pub use decode::decode_row;
pub use error::ResolverError;

/// Resolves, compiles and executes report requests.
///
/// Holds no per-request state; one instance serves every request.
#[derive(Debug, Clone)]
pub struct CalculationResolver {
    calculations: CalculationRepository,
    warehouse: DatabaseConnection,
    settings: QuerySettings,
}

impl CalculationResolver {
    /// Creates a resolver reading calculations from `config_db` and running
    /// reports on `warehouse_db`.
    #[must_use]
    pub const fn new(
        config_db: DatabaseConnection,
        warehouse_db: DatabaseConnection,
        settings: QuerySettings,
    ) -> Self {
        Self {
            calculations: CalculationRepository::new(config_db),
            warehouse: warehouse_db,
            settings,
        }
    }

    /// Resolves every reference of a request and builds its filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the request shape is invalid, a reference does not
    /// resolve to an active calculation, or a SQL calculation is unapproved.
    pub async fn resolve(
        &self,
        request: &ExecutionRequest,
    ) -> Result<(Vec<Calculation>, DealTrancheFilter), ResolverError> {
        let filter = request.filter()?;
        let mut calculations = Vec::with_capacity(request.calculations.len());
        for reference in &request.calculations {
            calculations.push(
                self.resolve_reference(reference, filter.cycle_code())
                    .await?,
            );
        }
        Ok((calculations, filter))
    }

    /// Executes an ad-hoc request.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or compilation fails, or the warehouse
    /// rejects or times out on the statement.
    pub async fn resolve_and_execute(
        &self,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, ResolverError> {
        self.execute_with_preferences(request, &[]).await
    }

    /// Compiles an ad-hoc request without running it.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or compilation fails.
    pub async fn resolve_and_preview(
        &self,
        request: &ExecutionRequest,
    ) -> Result<PreviewResult, ResolverError> {
        let compiled = self.compile(request).await?;
        Ok(compiled.into_preview())
    }

    /// Previews a single calculation against a deal selection.
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve_and_preview`].
    pub async fn preview_single(
        &self,
        reference: CalculationRef,
        deal_tranche_map: DealTrancheMap,
        cycle_code: i64,
        report_level: GroupLevel,
    ) -> Result<PreviewResult, ResolverError> {
        let request = ExecutionRequest {
            calculations: vec![reference],
            deal_tranche_map,
            cycle_code,
            report_level,
        };
        self.resolve_and_preview(&request).await
    }

    /// Executes a saved report for a cycle, applying its column preferences.
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve_and_execute`].
    pub async fn execute_template(
        &self,
        definition: &ReportDefinition,
        cycle_code: i64,
    ) -> Result<ExecutionResult, ResolverError> {
        self.execute_with_preferences(
            &definition.request(cycle_code),
            &definition.column_preferences,
        )
        .await
    }

    /// Compiles a saved report for a cycle without running it.
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve_and_preview`].
    pub async fn preview_template(
        &self,
        definition: &ReportDefinition,
        cycle_code: i64,
    ) -> Result<PreviewResult, ResolverError> {
        self.resolve_and_preview(&definition.request(cycle_code))
            .await
    }

    async fn execute_with_preferences(
        &self,
        request: &ExecutionRequest,
        preferences: &[ColumnPreference],
    ) -> Result<ExecutionResult, ResolverError> {
        let compiled = self.compile(request).await?;
        let sql = compiled.sql();
        let rows = match self.run(compiled.statement()).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, sql = %sql, "Report query failed");
                return Err(e);
            }
        };

        let rows = rows
            .iter()
            .map(|row| decode_row(row, compiled.columns()))
            .collect();
        let shaped = ReportService::apply_column_preferences(compiled.columns(), rows, preferences);
        let mut warnings = compiled.warnings().to_vec();
        warnings.extend(shaped.warnings);

        tracing::info!(
            rows = shaped.rows.len(),
            columns = shaped.columns.len(),
            warnings = warnings.len(),
            "Report executed"
        );
        Ok(ExecutionResult {
            rows: shaped.rows,
            columns: shaped.columns,
            warnings,
            sql,
        })
    }

    async fn compile(&self, request: &ExecutionRequest) -> Result<CompiledQuery, ResolverError> {
        let (calculations, filter) = self.resolve(request).await?;
        let builder = self.builder_for(&calculations).await?;
        Ok(builder.build(&calculations, &filter)?)
    }

    /// Builder for the warehouse backend, with a placeholder for every SQL
    /// calculation that does not compile.
    async fn builder_for(&self, calculations: &[Calculation]) -> Result<QueryBuilder, ResolverError> {
        let mut builder = QueryBuilder::new(self.warehouse.get_database_backend());
        if !self.settings.validate_raw_sql {
            return Ok(builder);
        }
        for calculation in calculations {
            let Some(probe) = builder.probe(calculation) else {
                continue;
            };
            match self.run(probe).await {
                Ok(_) => {}
                Err(ResolverError::Compile { message, .. }) => {
                    tracing::warn!(
                        calculation = calculation.name(),
                        error = %message,
                        "SQL calculation does not compile, using NULL placeholder"
                    );
                    builder = builder.with_placeholder(calculation.display_name(), message);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(builder)
    }

    async fn run(&self, statement: Statement) -> Result<Vec<QueryResult>, ResolverError> {
        let limit = self.settings.statement_timeout_secs;
        let sql = statement.sql.clone();
        tokio::time::timeout(
            Duration::from_secs(limit),
            self.warehouse.query_all(statement),
        )
        .await
        .map_err(|_| ResolverError::Timeout(limit))?
        .map_err(|e| ResolverError::from_warehouse(e, &sql))
    }

    async fn resolve_reference(
        &self,
        reference: &CalculationRef,
        cycle_code: i64,
    ) -> Result<Calculation, ResolverError> {
        let calculation = match reference.kind {
            CalculationRefKind::StaticField => {
                let path = reference.id_or_path.trim();
                let field = FieldRef::parse_path(path).map_err(CalculationError::from)?;
                Calculation::raw_field(path, field.table.table_name(), field.column)?
            }
            CalculationRefKind::UserAggregation | CalculationRefKind::SystemSql => {
                self.load(reference, cycle_code).await?
            }
        };
        tracing::debug!(
            reference = %reference,
            level = %calculation.group_level(),
            kind = %calculation.kind(),
            "Resolved calculation"
        );
        match reference.display_name() {
            Some(display_name) => Ok(calculation.with_display_name(display_name)?),
            None => Ok(calculation),
        }
    }

    async fn load(
        &self,
        reference: &CalculationRef,
        cycle_code: i64,
    ) -> Result<Calculation, ResolverError> {
        let id: CalculationId = reference
            .id_or_path
            .trim()
            .parse()
            .map_err(|_| ReportError::InvalidReference(reference.to_string()))?;
        let model = match self.calculations.find_active(id).await {
            Ok(model) => model,
            Err(CalculationStoreError::NotFound(_)) => {
                return Err(ResolverError::NotFound(reference.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let source = source_of(&model)?;
        let is_system = reference.kind == CalculationRefKind::SystemSql;
        if source.requires_approval() != is_system {
            return Err(ReportError::InvalidReference(reference.to_string()).into());
        }
        if source.requires_approval() && model.approved_at.is_none() {
            return Err(ResolverError::Unapproved(model.name));
        }
        Ok(source.to_calculation(&model.name, model.group_level.into(), cycle_code)?)
    }
}
