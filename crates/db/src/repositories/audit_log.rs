//! Calculation audit log: the [`AuditSink`] behind the buffered writer, and
//! the trail read back per calculation.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use vantage_core::audit::{AuditAction, AuditEntry, AuditError, AuditSink};
use vantage_shared::AppError;
use vantage_shared::types::{AuditEntryId, CalculationId};

use crate::entities::calculation_audit_log;

/// Error types for audit log reads.
#[derive(Debug, thiserror::Error)]
pub enum AuditLogError {
    /// Stored entry cannot be decoded.
    #[error("Audit entry {id} is corrupt: {reason}")]
    Corrupt {
        /// Entry id.
        id: AuditEntryId,
        /// Decoding failure.
        reason: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<AuditLogError> for AppError {
    fn from(err: AuditLogError) -> Self {
        match err {
            e @ AuditLogError::Corrupt { .. } => Self::Internal(e.to_string()),
            AuditLogError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Audit log repository.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    db: DatabaseConnection,
}

impl AuditLogRepository {
    /// Creates a new audit log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Audit trail of one calculation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or an entry is corrupt.
    pub async fn list_for_calculation(
        &self,
        calculation_id: CalculationId,
    ) -> Result<Vec<AuditEntry>, AuditLogError> {
        calculation_audit_log::Entity::find()
            .filter(calculation_audit_log::Column::CalculationId.eq(calculation_id.into_inner()))
            .order_by_asc(calculation_audit_log::Column::RecordedAt)
            .order_by_asc(calculation_audit_log::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_entry)
            .collect()
    }
}

fn to_entry(model: calculation_audit_log::Model) -> Result<AuditEntry, AuditLogError> {
    let id = AuditEntryId::from_uuid(model.id);
    let action = AuditAction::parse(&model.action).ok_or_else(|| AuditLogError::Corrupt {
        id,
        reason: format!("unknown action {}", model.action),
    })?;
    let changes = serde_json::from_value(model.changes).map_err(|e| AuditLogError::Corrupt {
        id,
        reason: e.to_string(),
    })?;
    Ok(AuditEntry {
        id,
        calculation_id: CalculationId::from_uuid(model.calculation_id),
        action,
        actor: model.actor,
        changes,
        recorded_at: model.recorded_at.to_utc(),
    })
}

impl AuditSink for AuditLogRepository {
    async fn write_batch(&self, entries: Vec<AuditEntry>) -> Result<usize, AuditError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let count = entries.len();
        let mut models = Vec::with_capacity(count);
        for entry in entries {
            let changes = serde_json::to_value(&entry.changes)
                .map_err(|e| AuditError::Sink(e.to_string()))?;
            models.push(calculation_audit_log::ActiveModel {
                id: Set(entry.id.into_inner()),
                calculation_id: Set(entry.calculation_id.into_inner()),
                action: Set(entry.action.as_str().to_string()),
                actor: Set(entry.actor),
                changes: Set(changes),
                recorded_at: Set(entry.recorded_at.into()),
            });
        }

        calculation_audit_log::Entity::insert_many(models)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| AuditError::Sink(e.to_string()))?;
        tracing::debug!(count, "Audit entries written");
        Ok(count)
    }
}
