//! Report template repository.

use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Serialize;
use uuid::Uuid;
use vantage_core::calculation::GroupLevel;
use vantage_core::report::{
    CalculationRef, CalculationRefKind, ColumnPreference, DealTrancheMap, ReportDefinition,
    ReportError, ReportService,
};
use vantage_shared::AppError;
use vantage_shared::types::ReportId;

use crate::entities::{calculations, report_templates, sea_orm_active_enums::CalculationLevel};

/// Error types for report template operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportStoreError {
    /// Template missing or soft-deleted.
    #[error("Report not found: {0}")]
    NotFound(ReportId),

    /// Definition failed validation.
    #[error(transparent)]
    Invalid(#[from] ReportError),

    /// Stored JSON does not match the definition shape.
    #[error("Report {id} is corrupt: {reason}")]
    Corrupt {
        /// Row id.
        id: Uuid,
        /// Decoding failure.
        reason: String,
    },

    /// Definition could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ReportStoreError> for AppError {
    fn from(err: ReportStoreError) -> Self {
        match err {
            e @ ReportStoreError::NotFound(_) => Self::NotFound(e.to_string()),
            ReportStoreError::Invalid(e) => Self::Validation(e.to_string()),
            e @ (ReportStoreError::Corrupt { .. } | ReportStoreError::Serialization(_)) => {
                Self::Internal(e.to_string())
            }
            ReportStoreError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// A stored report template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedReport {
    /// Template id.
    pub id: ReportId,
    /// Report definition.
    #[serde(flatten)]
    pub definition: ReportDefinition,
    /// Author.
    pub created_by: String,
    /// False once soft-deleted.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<FixedOffset>,
    /// Last update time.
    pub updated_at: DateTime<FixedOffset>,
}

impl SavedReport {
    fn from_model(model: report_templates::Model) -> Result<Self, ReportStoreError> {
        let corrupt = |e: serde_json::Error| ReportStoreError::Corrupt {
            id: model.id,
            reason: e.to_string(),
        };
        let definition = ReportDefinition {
            name: model.name.clone(),
            description: model.description.clone(),
            scope: model.scope.into(),
            deal_tranche_map: serde_json::from_value(model.deal_tranche_map.clone())
                .map_err(corrupt)?,
            calculations: serde_json::from_value(model.calculations.clone()).map_err(corrupt)?,
            column_preferences: serde_json::from_value(model.column_preferences.clone())
                .map_err(corrupt)?,
        };
        Ok(Self {
            id: ReportId::from_uuid(model.id),
            definition,
            created_by: model.created_by,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateReportInput {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New scope.
    pub scope: Option<GroupLevel>,
    /// New deal selection.
    pub deal_tranche_map: Option<DealTrancheMap>,
    /// New calculation list.
    pub calculations: Option<Vec<CalculationRef>>,
    /// New column preferences.
    pub column_preferences: Option<Vec<ColumnPreference>>,
}

impl UpdateReportInput {
    fn apply(self, definition: &mut ReportDefinition) {
        if let Some(name) = self.name {
            definition.name = name;
        }
        if let Some(description) = self.description {
            definition.description = Some(description);
        }
        if let Some(scope) = self.scope {
            definition.scope = scope;
        }
        if let Some(map) = self.deal_tranche_map {
            definition.deal_tranche_map = map;
        }
        if let Some(calculations) = self.calculations {
            definition.calculations = calculations;
        }
        if let Some(preferences) = self.column_preferences {
            definition.column_preferences = preferences;
        }
    }
}

/// Report template repository.
#[derive(Debug, Clone)]
pub struct ReportTemplateRepository {
    db: DatabaseConnection,
}

impl ReportTemplateRepository {
    /// Creates a new report template repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Validates and stores a new template.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid, a stored calculation
    /// is finer than the report scope, or the insert fails.
    pub async fn create(
        &self,
        mut definition: ReportDefinition,
        actor: &str,
    ) -> Result<SavedReport, ReportStoreError> {
        definition.name = definition.name.trim().to_string();
        ReportService::validate_definition(&definition)?;
        self.check_calculation_levels(&definition).await?;

        let now = chrono::Utc::now().into();
        let model = report_templates::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(definition.name.clone()),
            description: Set(definition.description.clone()),
            scope: Set(definition.scope.into()),
            deal_tranche_map: Set(serde_json::to_value(&definition.deal_tranche_map)?),
            calculations: Set(serde_json::to_value(&definition.calculations)?),
            column_preferences: Set(serde_json::to_value(&definition.column_preferences)?),
            created_by: Set(actor.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(report_id = %model.id, name = %model.name, actor, "Report created");
        SavedReport::from_model(model)
    }

    /// Finds an active template.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing and soft-deleted templates.
    pub async fn find_active(&self, id: ReportId) -> Result<SavedReport, ReportStoreError> {
        let model = self.find_active_model(id).await?;
        SavedReport::from_model(model)
    }

    /// Lists templates ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored template is corrupt.
    pub async fn list(
        &self,
        scope: Option<GroupLevel>,
        include_inactive: bool,
    ) -> Result<Vec<SavedReport>, ReportStoreError> {
        let mut query = report_templates::Entity::find();
        if !include_inactive {
            query = query.filter(report_templates::Column::IsActive.eq(true));
        }
        if let Some(scope) = scope {
            query = query
                .filter(report_templates::Column::Scope.eq(CalculationLevel::from(scope)));
        }
        query
            .order_by_asc(report_templates::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(SavedReport::from_model)
            .collect()
    }

    /// Applies a partial update and re-validates the whole definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not active, the patched definition
    /// is invalid, or the update fails.
    pub async fn update(
        &self,
        id: ReportId,
        input: UpdateReportInput,
    ) -> Result<SavedReport, ReportStoreError> {
        let model = self.find_active_model(id).await?;
        let mut definition = SavedReport::from_model(model.clone())?.definition;
        input.apply(&mut definition);
        definition.name = definition.name.trim().to_string();
        ReportService::validate_definition(&definition)?;
        self.check_calculation_levels(&definition).await?;

        let mut active: report_templates::ActiveModel = model.into();
        active.name = Set(definition.name.clone());
        active.description = Set(definition.description.clone());
        active.scope = Set(definition.scope.into());
        active.deal_tranche_map = Set(serde_json::to_value(&definition.deal_tranche_map)?);
        active.calculations = Set(serde_json::to_value(&definition.calculations)?);
        active.column_preferences = Set(serde_json::to_value(&definition.column_preferences)?);
        active.updated_at = Set(chrono::Utc::now().into());

        let model = active.update(&self.db).await?;
        tracing::info!(report_id = %model.id, "Report updated");
        SavedReport::from_model(model)
    }

    /// Soft-deletes a template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is not active or the update fails.
    pub async fn soft_delete(&self, id: ReportId) -> Result<(), ReportStoreError> {
        let model = self.find_active_model(id).await?;
        let mut active: report_templates::ActiveModel = model.into();
        active.is_active = Set(false);
        active.updated_at = Set(chrono::Utc::now().into());
        active.update(&self.db).await?;

        tracing::info!(report_id = %id, "Report deleted");
        Ok(())
    }

    /// Checks referenced calculations' stored levels against the scope.
    ///
    /// References that do not name an active calculation are left to
    /// execution, which reports them as not found.
    async fn check_calculation_levels(
        &self,
        definition: &ReportDefinition,
    ) -> Result<(), ReportStoreError> {
        let ids: Vec<Uuid> = definition
            .calculations
            .iter()
            .filter(|c| c.kind != CalculationRefKind::StaticField)
            .filter_map(|c| c.id_or_path.trim().parse().ok())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        let stored = calculations::Entity::find()
            .filter(calculations::Column::Id.is_in(ids))
            .filter(calculations::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;
        for calculation in stored {
            ReportService::check_scope(
                &calculation.name,
                calculation.group_level.into(),
                definition.scope,
            )?;
        }
        Ok(())
    }

    async fn find_active_model(
        &self,
        id: ReportId,
    ) -> Result<report_templates::Model, ReportStoreError> {
        report_templates::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .filter(|r| r.is_active)
            .ok_or(ReportStoreError::NotFound(id))
    }
}
