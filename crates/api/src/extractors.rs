//! Request extractors.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde_json::json;

/// Header naming the user a request acts for.
pub const USER_HEADER: &str = "x-user-id";

/// Longest accepted user identifier.
const MAX_USER_LEN: usize = 255;

/// Acting user taken from the `X-User-Id` header.
///
/// There is no authentication; the header is trusted and recorded as the
/// author of mutations and audit entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub String);

impl ActingUser {
    /// Returns the user identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty() && user.len() <= MAX_USER_LEN)
            .map(|user| Self(user.to_string()))
            .ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "MISSING_USER",
                        "message": "X-User-Id header is required"
                    })),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use rstest::rstest;

    async fn extract(header: Option<&str>) -> Result<ActingUser, StatusCode> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        ActingUser::from_request_parts(&mut parts, &())
            .await
            .map_err(|(status, _)| status)
    }

    #[rstest]
    #[case(Some("analyst"), Ok("analyst"))]
    #[case(Some("  analyst  "), Ok("analyst"))]
    #[case(Some("   "), Err(StatusCode::BAD_REQUEST))]
    #[case(None, Err(StatusCode::BAD_REQUEST))]
    #[tokio::test]
    async fn test_acting_user(
        #[case] header: Option<&str>,
        #[case] expected: Result<&str, StatusCode>,
    ) {
        let actual = extract(header).await;
        assert_eq!(actual.as_ref().map(ActingUser::as_str), expected.as_ref().map(|u| *u));
    }
}
