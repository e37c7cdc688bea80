//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::json;
use tracing::{debug, error};
use vantage_db::ResolverError;
use vantage_db::repositories::{AuditLogError, CalculationStoreError, ReportStoreError};
use vantage_shared::AppError;

/// Handler error rendered as `{ "error": <code>, "message": <text> }`.
///
/// Compile errors also carry the generated statement under `"sql"`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            debug!(error = %self.0, "Request rejected");
        }
        let mut body = json!({
            "error": self.0.error_code(),
            "message": self.0.public_message()
        });
        if let Some(sql) = self.0.sql() {
            body["sql"] = json!(sql);
        }
        (status, Json(body)).into_response()
    }
}

macro_rules! into_api_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ApiError {
                fn from(err: $source) -> Self {
                    Self(err.into())
                }
            }
        )*
    };
}

into_api_error!(
    AppError,
    ResolverError,
    CalculationStoreError,
    ReportStoreError,
    AuditLogError,
);

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use vantage_core::report::ReportError;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let response = ApiError::from(ResolverError::Report(ReportError::NoDealsSelected))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "Validation error: No deals selected");
    }

    #[tokio::test]
    async fn test_compile_error_includes_sql() {
        let response = ApiError::from(ResolverError::Compile {
            message: "no such column: x".into(),
            sql: "WITH base AS (SELECT 1) SELECT x FROM base".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body(response).await;
        assert_eq!(body["error"], "SQL_COMPILE_ERROR");
        assert_eq!(body["sql"], "WITH base AS (SELECT 1) SELECT x FROM base");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response = ApiError::from(DbErr::Custom("password=hunter2".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body(response).await;
        assert_eq!(body["error"], "DATABASE_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("hunter2"));
    }
}
