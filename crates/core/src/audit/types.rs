//! Audit trail types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vantage_shared::types::{AuditEntryId, CalculationId};

/// Mutation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Calculation created.
    Create,
    /// Calculation edited.
    Update,
    /// Calculation approved.
    Approve,
    /// Calculation soft-deleted.
    Delete,
}

impl AuditAction {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Approve => "approve",
            Self::Delete => "delete",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "approve" => Some(Self::Approve),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field name.
    pub field: String,
    /// Value before the mutation, absent for added fields.
    pub old_value: Option<Value>,
    /// Value after the mutation, absent for removed fields.
    pub new_value: Option<Value>,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry id.
    pub id: AuditEntryId,
    /// Calculation the entry belongs to.
    pub calculation_id: CalculationId,
    /// Mutation kind.
    pub action: AuditAction,
    /// Acting user as passed by the caller.
    pub actor: String,
    /// Changed fields.
    pub changes: Vec<FieldChange>,
    /// When the mutation happened.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Creates an entry stamped now.
    pub fn new(
        calculation_id: CalculationId,
        action: AuditAction,
        actor: impl Into<String>,
        changes: Vec<FieldChange>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            calculation_id,
            action,
            actor: actor.into(),
            changes,
            recorded_at: Utc::now(),
        }
    }
}
