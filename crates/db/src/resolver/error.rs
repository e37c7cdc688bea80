//! Resolver errors.

use sea_orm::DbErr;
use thiserror::Error;
use vantage_core::calculation::CalculationError;
use vantage_core::report::ReportError;
use vantage_shared::AppError;

use crate::query::QueryError;
use crate::repositories::CalculationStoreError;

/// Errors raised while resolving, compiling or executing a report request.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Request shape is invalid.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// A referenced calculation failed validation.
    #[error(transparent)]
    Calculation(#[from] CalculationError),

    /// Query construction failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Reference names a missing or soft-deleted calculation.
    #[error("Calculation not found: {0}")]
    NotFound(String),

    /// SQL calculation has not been approved yet.
    #[error("Calculation '{0}' must be approved before it can run")]
    Unapproved(String),

    /// Stored calculation could not be loaded.
    #[error(transparent)]
    Store(#[from] CalculationStoreError),

    /// Warehouse rejected the generated statement.
    #[error("Generated SQL failed to compile: {message}")]
    Compile {
        /// Driver message.
        message: String,
        /// Rejected statement.
        sql: String,
    },

    /// Warehouse statement failed at run time.
    #[error("Warehouse query failed: {0}")]
    Execution(DbErr),

    /// Warehouse statement exceeded the configured timeout.
    #[error("Warehouse query timed out after {0}s")]
    Timeout(u64),
}

impl ResolverError {
    /// Classifies a warehouse error for `sql`: statement errors are compile
    /// errors, everything else is an execution failure.
    #[must_use]
    pub fn from_warehouse(err: DbErr, sql: &str) -> Self {
        match err {
            DbErr::Query(e) => Self::Compile {
                message: e.to_string(),
                sql: sql.to_string(),
            },
            other => Self::Execution(other),
        }
    }
}

impl From<ResolverError> for AppError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::Report(e) => Self::Validation(e.to_string()),
            ResolverError::Calculation(e) => Self::Validation(e.to_string()),
            ResolverError::Query(QueryError::Report(e)) => Self::Validation(e.to_string()),
            ResolverError::Query(e @ QueryError::MissingBaseColumn { .. }) => {
                Self::Internal(e.to_string())
            }
            e @ ResolverError::NotFound(_) => Self::NotFound(e.to_string()),
            e @ ResolverError::Unapproved(_) => Self::BusinessRule(e.to_string()),
            ResolverError::Store(e) => e.into(),
            ResolverError::Compile { message, sql } => Self::Compile { message, sql },
            e @ (ResolverError::Execution(_) | ResolverError::Timeout(_)) => {
                Self::Database(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::RuntimeErr;

    #[test]
    fn test_warehouse_errors_are_classified() {
        let compile = ResolverError::from_warehouse(
            DbErr::Query(RuntimeErr::Internal("no such column: raw_calc.x".into())),
            "SELECT raw_calc.x",
        );
        assert!(matches!(
            compile,
            ResolverError::Compile { ref message, ref sql }
                if message.contains("no such column") && sql == "SELECT raw_calc.x"
        ));

        let execution = ResolverError::from_warehouse(
            DbErr::ConnectionAcquire(sea_orm::ConnAcquireErr::Timeout),
            "SELECT 1",
        );
        assert!(matches!(execution, ResolverError::Execution(_)));
    }

    #[test]
    fn test_app_error_mapping() {
        let err: AppError = ResolverError::Report(ReportError::NoDealsSelected).into();
        assert_eq!(err.status_code(), 400);

        let err: AppError = ResolverError::NotFound("system_sql:abc".into()).into();
        assert_eq!(err.status_code(), 404);
        assert!(err.to_string().contains("system_sql:abc"));

        let err: AppError = ResolverError::Unapproved("Flag".into()).into();
        assert_eq!(err.status_code(), 422);

        let err: AppError = ResolverError::Compile {
            message: "syntax error".into(),
            sql: "SELECT".into(),
        }
        .into();
        assert_eq!(err.error_code(), "SQL_COMPILE_ERROR");
        assert_eq!(err.sql(), Some("SELECT"));

        let err: AppError = ResolverError::Timeout(60).into();
        assert_eq!(err.status_code(), 500);

        let err: AppError = ResolverError::Query(QueryError::MissingBaseColumn {
            calculation: "x".into(),
            column: "tranchebal_x".into(),
            known: vec![],
        })
        .into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
