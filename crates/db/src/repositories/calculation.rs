//! Calculation repository: create, edit, approve and soft-delete stored
//! calculations.
//!
//! Every mutation loads the row, applies the change, and hands an audit entry
//! carrying the before/after diff to the caller's [`AuditWriter`].

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;
use vantage_core::audit::{AuditAction, AuditEntry, AuditWriter, diff_records};
use vantage_core::calculation::{
    AggregationFunction, CalculationError, CalculationKind, CalculationSource, GroupLevel,
    SystemCalculationVariant,
};
use vantage_shared::AppError;
use vantage_shared::types::CalculationId;

use crate::entities::{
    calculations,
    sea_orm_active_enums::{CalculationLevel, CalculationType},
};

/// Error types for calculation operations.
#[derive(Debug, thiserror::Error)]
pub enum CalculationStoreError {
    /// Calculation missing or soft-deleted.
    #[error("Calculation not found: {0}")]
    NotFound(CalculationId),

    /// Another active calculation has the same name and level.
    #[error("An active {group_level}-level calculation named '{name}' already exists")]
    Duplicate {
        /// Conflicting name.
        name: String,
        /// Conflicting level.
        group_level: GroupLevel,
    },

    /// Definition failed validation.
    #[error(transparent)]
    Invalid(#[from] CalculationError),

    /// Calculation is already approved.
    #[error("Calculation {0} is already approved")]
    AlreadyApproved(CalculationId),

    /// Only SQL calculations go through approval.
    #[error("Calculation {0} does not require approval")]
    ApprovalNotRequired(CalculationId),

    /// Stored row cannot be decoded into a definition.
    #[error("Calculation {id} is corrupt: {reason}")]
    Corrupt {
        /// Row id.
        id: Uuid,
        /// What is wrong with it.
        reason: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CalculationStoreError> for AppError {
    fn from(err: CalculationStoreError) -> Self {
        match err {
            e @ CalculationStoreError::NotFound(_) => Self::NotFound(e.to_string()),
            e @ CalculationStoreError::Duplicate { .. } => Self::Conflict(e.to_string()),
            CalculationStoreError::Invalid(e) => Self::Validation(e.to_string()),
            e @ (CalculationStoreError::AlreadyApproved(_)
            | CalculationStoreError::ApprovalNotRequired(_)) => Self::BusinessRule(e.to_string()),
            e @ CalculationStoreError::Corrupt { .. } => Self::Internal(e.to_string()),
            CalculationStoreError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating a calculation.
#[derive(Debug, Clone)]
pub struct CreateCalculationInput {
    /// Calculation name, also the default column header.
    pub name: String,
    /// Free text description.
    pub description: Option<String>,
    /// Grouping level.
    pub group_level: GroupLevel,
    /// What the calculation reads.
    pub source: CalculationSource,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateCalculationInput {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New level.
    pub group_level: Option<GroupLevel>,
    /// New definition.
    pub source: Option<CalculationSource>,
}

/// List filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculationFilter {
    /// Only this level.
    pub group_level: Option<GroupLevel>,
    /// Only this kind.
    pub calculation_type: Option<CalculationKind>,
    /// Include soft-deleted rows.
    pub include_inactive: bool,
}

/// Decodes the stored definition columns of a row.
pub fn source_of(model: &calculations::Model) -> Result<CalculationSource, CalculationStoreError> {
    let corrupt = |reason: &str| CalculationStoreError::Corrupt {
        id: model.id,
        reason: reason.to_string(),
    };
    let required = |value: &Option<String>, column: &str| {
        value
            .clone()
            .ok_or_else(|| corrupt(&format!("{column} is missing")))
    };

    match model.calculation_type {
        CalculationType::RawField => Ok(CalculationSource::RawField {
            source_table: required(&model.source_table, "source_table")?,
            source_column: required(&model.source_column, "source_column")?,
        }),
        CalculationType::Aggregated => {
            let function = required(&model.aggregation_function, "aggregation_function")?;
            Ok(CalculationSource::Aggregated {
                source_table: required(&model.source_table, "source_table")?,
                source_column: required(&model.source_column, "source_column")?,
                aggregation_function: AggregationFunction::parse(&function)
                    .ok_or_else(|| corrupt(&format!("unknown aggregation function {function}")))?,
                weight_column: model.weight_column.clone(),
            })
        }
        CalculationType::RawSql => {
            let result_column = required(&model.result_column_name, "result_column_name")?;
            let variant = match &model.cdi_variable_name {
                Some(variable_name) => SystemCalculationVariant::CdiVariable {
                    variable_name: variable_name.clone(),
                    result_column,
                },
                None => SystemCalculationVariant::Sql {
                    sql_text: required(&model.sql_text, "sql_text")?,
                    result_column,
                },
            };
            Ok(CalculationSource::System(variant))
        }
    }
}

fn set_source(active: &mut calculations::ActiveModel, source: &CalculationSource) {
    active.calculation_type = Set(source.kind().into());
    active.source_table = Set(None);
    active.source_column = Set(None);
    active.aggregation_function = Set(None);
    active.weight_column = Set(None);
    active.sql_text = Set(None);
    active.result_column_name = Set(None);
    active.cdi_variable_name = Set(None);

    match source {
        CalculationSource::RawField {
            source_table,
            source_column,
        } => {
            active.source_table = Set(Some(source_table.trim().to_string()));
            active.source_column = Set(Some(source_column.trim().to_string()));
        }
        CalculationSource::Aggregated {
            source_table,
            source_column,
            aggregation_function,
            weight_column,
        } => {
            active.source_table = Set(Some(source_table.trim().to_string()));
            active.source_column = Set(Some(source_column.trim().to_string()));
            active.aggregation_function = Set(Some(aggregation_function.as_str().to_string()));
            active.weight_column = Set(weight_column
                .as_deref()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(String::from));
        }
        CalculationSource::System(SystemCalculationVariant::Sql {
            sql_text,
            result_column,
        }) => {
            active.sql_text = Set(Some(sql_text.clone()));
            active.result_column_name = Set(Some(result_column.clone()));
        }
        CalculationSource::System(SystemCalculationVariant::CdiVariable {
            variable_name,
            result_column,
        }) => {
            active.cdi_variable_name = Set(Some(variable_name.clone()));
            active.result_column_name = Set(Some(result_column.clone()));
        }
    }
}

async fn record<W: AuditWriter>(audit: &W, entry: AuditEntry) {
    let calculation_id = entry.calculation_id;
    let action = entry.action;
    if let Err(e) = audit.record(entry).await {
        // The mutation is committed; the entry stays queued for the next flush.
        tracing::warn!(
            calculation_id = %calculation_id,
            action = %action,
            error = %e,
            "Failed to flush audit entries"
        );
    }
}

/// Calculation repository.
#[derive(Debug, Clone)]
pub struct CalculationRepository {
    db: DatabaseConnection,
}

impl CalculationRepository {
    /// Creates a new calculation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a calculation.
    ///
    /// SQL calculations start unapproved; field and aggregation calculations
    /// are approved by their author on creation.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid, the name is taken at
    /// that level, or the insert fails.
    pub async fn create<W: AuditWriter>(
        &self,
        input: CreateCalculationInput,
        actor: &str,
        audit: &W,
    ) -> Result<calculations::Model, CalculationStoreError> {
        let name = input.name.trim().to_string();
        input.source.validate(&name, input.group_level)?;
        self.ensure_unique(&name, input.group_level, None).await?;

        let now = chrono::Utc::now().into();
        let auto_approved = !input.source.requires_approval();
        let mut active = calculations::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name),
            description: Set(input.description),
            group_level: Set(input.group_level.into()),
            created_by: Set(actor.to_string()),
            approved_by: Set(auto_approved.then(|| actor.to_string())),
            approved_at: Set(auto_approved.then_some(now)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        set_source(&mut active, &input.source);

        let model = active.insert(&self.db).await?;
        tracing::info!(
            calculation_id = %model.id,
            name = %model.name,
            kind = ?model.calculation_type,
            actor,
            "Calculation created"
        );

        let changes = diff_records(None, Some(&model));
        record(
            audit,
            AuditEntry::new(id_of(&model), AuditAction::Create, actor, changes),
        )
        .await;
        Ok(model)
    }

    /// Finds a calculation by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(
        &self,
        id: CalculationId,
    ) -> Result<Option<calculations::Model>, CalculationStoreError> {
        Ok(calculations::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?)
    }

    /// Finds an active calculation.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing and soft-deleted calculations.
    pub async fn find_active(
        &self,
        id: CalculationId,
    ) -> Result<calculations::Model, CalculationStoreError> {
        self.find_by_id(id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(CalculationStoreError::NotFound(id))
    }

    /// Lists calculations ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: CalculationFilter,
    ) -> Result<Vec<calculations::Model>, CalculationStoreError> {
        let mut query = calculations::Entity::find();
        if !filter.include_inactive {
            query = query.filter(calculations::Column::IsActive.eq(true));
        }
        if let Some(level) = filter.group_level {
            query = query
                .filter(calculations::Column::GroupLevel.eq(CalculationLevel::from(level)));
        }
        if let Some(kind) = filter.calculation_type {
            query = query
                .filter(calculations::Column::CalculationType.eq(CalculationType::from(kind)));
        }
        Ok(query
            .order_by_asc(calculations::Column::Name)
            .order_by_asc(calculations::Column::GroupLevel)
            .all(&self.db)
            .await?)
    }

    /// Applies a partial update.
    ///
    /// Changing the definition of a SQL calculation clears its approval.
    ///
    /// # Errors
    ///
    /// Returns an error if the calculation is not active, the result is
    /// invalid or duplicated, or the update fails.
    pub async fn update<W: AuditWriter>(
        &self,
        id: CalculationId,
        input: UpdateCalculationInput,
        actor: &str,
        audit: &W,
    ) -> Result<calculations::Model, CalculationStoreError> {
        let before = self.find_active(id).await?;
        let current_source = source_of(&before)?;

        let name = input
            .name
            .as_deref()
            .map_or_else(|| before.name.clone(), |n| n.trim().to_string());
        let group_level = input
            .group_level
            .unwrap_or_else(|| before.group_level.into());
        let source = input.source.unwrap_or_else(|| current_source.clone());
        source.validate(&name, group_level)?;

        if name != before.name || CalculationLevel::from(group_level) != before.group_level {
            self.ensure_unique(&name, group_level, Some(before.id)).await?;
        }

        let now = chrono::Utc::now().into();
        let mut active: calculations::ActiveModel = before.clone().into();
        active.name = Set(name);
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        active.group_level = Set(group_level.into());
        set_source(&mut active, &source);

        if source != current_source {
            if source.requires_approval() {
                active.approved_by = Set(None);
                active.approved_at = Set(None);
            } else if before.approved_at.is_none() {
                active.approved_by = Set(Some(actor.to_string()));
                active.approved_at = Set(Some(now));
            }
        }
        active.updated_at = Set(now);

        let after = active.update(&self.db).await?;
        let changes = diff_records(Some(&before), Some(&after));
        if !changes.is_empty() {
            tracing::info!(
                calculation_id = %after.id,
                fields = changes.len(),
                actor,
                "Calculation updated"
            );
            record(audit, AuditEntry::new(id, AuditAction::Update, actor, changes)).await;
        }
        Ok(after)
    }

    /// Approves a SQL calculation.
    ///
    /// # Errors
    ///
    /// Returns an error if the calculation is not active, needs no approval,
    /// is already approved, or the update fails.
    pub async fn approve<W: AuditWriter>(
        &self,
        id: CalculationId,
        actor: &str,
        audit: &W,
    ) -> Result<calculations::Model, CalculationStoreError> {
        let before = self.find_active(id).await?;
        if !source_of(&before)?.requires_approval() {
            return Err(CalculationStoreError::ApprovalNotRequired(id));
        }
        if before.approved_at.is_some() {
            return Err(CalculationStoreError::AlreadyApproved(id));
        }

        let now = chrono::Utc::now().into();
        let mut active: calculations::ActiveModel = before.clone().into();
        active.approved_by = Set(Some(actor.to_string()));
        active.approved_at = Set(Some(now));
        active.updated_at = Set(now);
        let after = active.update(&self.db).await?;

        tracing::info!(calculation_id = %after.id, actor, "Calculation approved");
        let changes = diff_records(Some(&before), Some(&after));
        record(audit, AuditEntry::new(id, AuditAction::Approve, actor, changes)).await;
        Ok(after)
    }

    /// Soft-deletes a calculation.
    ///
    /// # Errors
    ///
    /// Returns an error if the calculation is not active or the update fails.
    pub async fn soft_delete<W: AuditWriter>(
        &self,
        id: CalculationId,
        actor: &str,
        audit: &W,
    ) -> Result<(), CalculationStoreError> {
        let before = self.find_active(id).await?;

        let mut active: calculations::ActiveModel = before.clone().into();
        active.is_active = Set(false);
        active.updated_at = Set(chrono::Utc::now().into());
        let after = active.update(&self.db).await?;

        tracing::info!(calculation_id = %after.id, actor, "Calculation deleted");
        let changes = diff_records(Some(&before), Some(&after));
        record(audit, AuditEntry::new(id, AuditAction::Delete, actor, changes)).await;
        Ok(())
    }

    async fn ensure_unique(
        &self,
        name: &str,
        group_level: GroupLevel,
        except: Option<Uuid>,
    ) -> Result<(), CalculationStoreError> {
        let mut query = calculations::Entity::find()
            .filter(calculations::Column::Name.eq(name))
            .filter(calculations::Column::GroupLevel.eq(CalculationLevel::from(group_level)))
            .filter(calculations::Column::IsActive.eq(true));
        if let Some(id) = except {
            query = query.filter(calculations::Column::Id.ne(id));
        }

        if query.one(&self.db).await?.is_some() {
            return Err(CalculationStoreError::Duplicate {
                name: name.to_string(),
                group_level,
            });
        }
        Ok(())
    }
}

const fn id_of(model: &calculations::Model) -> CalculationId {
    CalculationId::from_uuid(model.id)
}
